//! Leaf grammar rules shared by requests, responses, queries and predicates.

use super::scanner::{
    is_ascii_digit, is_ascii_letter, is_ascii_space, is_hex_letter, is_newline,
    is_template_control,
};
use super::{ParseError, ParseResult, Parser, Position};
use crate::ast::{Comment, KeyValue, Template};

pub(super) fn literal(p: &mut Parser, text: &str) -> ParseResult<()> {
    for expected in text.chars() {
        let position = p.position();
        match p.peek() {
            Some(c) if c == expected => {
                p.read()?;
            }
            Some(c) => {
                return Err(ParseError::syntax(
                    format!(
                        "'{text}' is expected, invalid '{}' instead of '{expected}'",
                        c.escape_debug()
                    ),
                    position,
                ))
            }
            None => {
                return Err(ParseError::syntax(
                    format!("'{text}' is expected, invalid eof instead of '{expected}'"),
                    position,
                ))
            }
        }
    }
    Ok(())
}

/// Zero or more spaces or tabs.
pub(super) fn spaces(p: &mut Parser) -> String {
    p.read_while(is_ascii_space)
}

pub(super) fn one_or_more_spaces(p: &mut Parser) -> ParseResult<String> {
    let position = p.position();
    let spaces = spaces(p);
    if spaces.is_empty() {
        return Err(ParseError::syntax("space or tab is expected", position));
    }
    Ok(spaces)
}

pub(super) fn newline(p: &mut Parser) -> ParseResult<()> {
    let begin = p.position();
    match p.read()? {
        '\n' => Ok(()),
        '\r' => match p.read() {
            Ok('\n') => Ok(()),
            _ => Err(ParseError::syntax("\\n is expected", begin)),
        },
        _ => Err(ParseError::syntax("\\n or \\r\\n is expected", begin)),
    }
}

pub(super) fn comment(p: &mut Parser) -> ParseResult<Comment> {
    let position = p.position();
    literal(p, "#")?;
    let text = p.read_while(|c| !is_newline(c));
    Ok(Comment {
        value: format!("#{text}"),
        position,
    })
}

/// Optional spaces and comment, then a newline or the end of input.
/// Returns the comment, if any.
pub(super) fn line_terminator(p: &mut Parser) -> ParseResult<Option<Comment>> {
    let begin = p.position();
    spaces(p);
    let comment = match p.peek() {
        Some('#') => Some(comment(p)?),
        _ => None,
    };
    match p.peek() {
        Some(c) if is_newline(c) => newline(p)?,
        Some(_) => return Err(ParseError::syntax("newline is expected", begin)),
        None => {}
    }
    Ok(comment)
}

/// Skips blank and comment lines, then leading spaces. Returns the comments.
pub(super) fn leading_lines(p: &mut Parser) -> Vec<Comment> {
    let comments = p.zero_or_more(line_terminator).into_iter().flatten().collect();
    spaces(p);
    comments
}

pub(super) fn unicode_char(p: &mut Parser) -> ParseResult<char> {
    let position = p.position();
    if p.read()? != '{' {
        return Err(ParseError::syntax("{ expected, invalid unicode literal", position));
    }
    let digits = p.read_while(|c| is_ascii_digit(c) || is_hex_letter(c));
    let position = p.position();
    if digits.is_empty() || digits.len() > 8 {
        return Err(ParseError::syntax("invalid unicode literal", position));
    }
    if p.read()? != '}' {
        return Err(ParseError::syntax("} expected, invalid unicode literal", position));
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| ParseError::syntax("invalid unicode literal", position))
}

pub(super) fn key_string(p: &mut Parser) -> ParseResult<String> {
    let begin = p.position();
    let mut key = String::new();
    while let Some(c) = p.peek() {
        if is_ascii_letter(c) || is_ascii_digit(c) || matches!(c, '_' | '-' | '.') {
            p.read()?;
            key.push(c);
        } else if c == '\\' {
            p.read()?;
            let position = p.position();
            let escaped = p
                .read()
                .map_err(|_| ParseError::syntax("invalid key-string", position))?;
            match escaped {
                '#' | ' ' | ':' | '\\' => key.push(escaped),
                'b' => key.push('\u{8}'),
                'n' => key.push('\n'),
                'r' => key.push('\r'),
                't' => key.push('\t'),
                'u' => key.push(unicode_char(p)?),
                other => {
                    return Err(ParseError::syntax(
                        format!("invalid escape char {other}"),
                        position,
                    ))
                }
            }
        } else {
            break;
        }
    }
    if p.position().offset == begin.offset {
        return Err(ParseError::syntax("invalid empty key-string", begin));
    }
    Ok(key)
}

/// Unquoted value running to a comment or the end of line. Trailing spaces
/// are not part of the value.
pub(super) fn value_string(p: &mut Parser) -> ParseResult<Template> {
    let begin = p.position();
    if let Some(c) = p.peek() {
        if is_ascii_space(c) {
            return Err(ParseError::syntax("invalid unquoted-string-value", begin));
        }
    }
    let mut value = String::new();
    let mut pending = String::new();
    let mut end = begin;
    loop {
        match p.peek() {
            None | Some('#') => break,
            Some(c) if is_newline(c) => break,
            Some(c) if is_ascii_space(c) => {
                p.read()?;
                pending.push(c);
            }
            Some('\\') => {
                p.read()?;
                value.push_str(&pending);
                pending.clear();
                let position = p.position();
                let escaped = p
                    .read()
                    .map_err(|_| ParseError::syntax("invalid unquoted-string-value", position))?;
                match escaped {
                    '\\' | '#' => value.push(escaped),
                    'b' => value.push('\u{8}'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    'u' => value.push(unicode_char(p)?),
                    other => {
                        return Err(ParseError::syntax(
                            format!("invalid escape char {other}"),
                            position,
                        ))
                    }
                }
                end = p.position();
            }
            Some(c) => {
                p.read()?;
                value.push_str(&pending);
                pending.clear();
                value.push(c);
                end = p.position();
            }
        }
    }
    p.reset(end);
    Ok(Template::new(value, begin))
}

pub(super) fn quoted_string(p: &mut Parser) -> ParseResult<Template> {
    let begin = p.position();
    match p.peek() {
        Some('"') => {
            p.read()?;
        }
        _ => {
            return Err(ParseError::syntax(
                "\" is expected at quoted-string beginning",
                begin,
            ))
        }
    }
    let mut value = String::new();
    loop {
        let position = p.position();
        let c = p
            .read()
            .map_err(|_| ParseError::syntax("\" is expected at quoted-string end", position))?;
        match c {
            '"' => break,
            '\\' => {
                let position = p.position();
                let escaped = p
                    .read()
                    .map_err(|_| ParseError::syntax("invalid quoted-string", position))?;
                match escaped {
                    '"' | '\\' => value.push(escaped),
                    'b' => value.push('\u{8}'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    'u' => value.push(unicode_char(p)?),
                    other => {
                        return Err(ParseError::syntax(
                            format!("invalid escape char {other}"),
                            position,
                        ))
                    }
                }
            }
            other => value.push(other),
        }
    }
    Ok(Template::new(value, begin))
}

pub(super) fn integer(p: &mut Parser) -> ParseResult<i64> {
    let begin = p.position();
    if matches!(p.peek(), Some('-') | Some('+')) {
        p.read()?;
    }
    let digits = p.read_while(is_ascii_digit);
    if digits.is_empty() {
        return Err(ParseError::syntax("[0-9] is expected", p.position()));
    }
    let text = p.scanner().slice(begin.offset, p.position().offset);
    text.parse::<i64>()
        .map_err(|_| ParseError::syntax("invalid integer", begin))
}

pub(super) fn float(p: &mut Parser) -> ParseResult<f64> {
    let begin = p.position();
    if matches!(p.peek(), Some('-') | Some('+')) {
        p.read()?;
    }
    if p.read_while(is_ascii_digit).is_empty() {
        return Err(ParseError::syntax("[0-9] is expected", p.position()));
    }
    if p.peek() != Some('.') {
        return Err(ParseError::syntax("'.' is expected", p.position()));
    }
    p.read()?;
    if p.read_while(is_ascii_digit).is_empty() {
        return Err(ParseError::syntax("[0-9] is expected", p.position()));
    }
    let text = p.scanner().slice(begin.offset, p.position().offset);
    text.parse::<f64>()
        .map_err(|_| ParseError::syntax("invalid float", begin))
}

/// Float or integer literal.
pub(super) fn number(p: &mut Parser) -> ParseResult<f64> {
    p.choice(&[float, integer_number])
}

fn integer_number(p: &mut Parser) -> ParseResult<f64> {
    integer(p).map(|n| n as f64)
}

pub(super) fn boolean(p: &mut Parser) -> ParseResult<bool> {
    let position = p.position();
    for (text, value) in [("true", true), ("false", false)] {
        if p.optional(|p| literal(p, text)).is_some() {
            return Ok(value);
        }
    }
    Err(ParseError::syntax("true or false is expected", position))
}

pub(super) fn null(p: &mut Parser) -> ParseResult<()> {
    literal(p, "null")
}

/// `{{name}}` placeholder used as a predicate value.
pub(super) fn expr(p: &mut Parser) -> ParseResult<(String, Position)> {
    let begin = p.position();
    literal(p, "{{")?;
    let position = p.position();
    let name = p.read_while(|c| is_ascii_letter(c) || is_ascii_digit(c) || c == '_' || c == '-');
    if name.is_empty() {
        return Err(ParseError::syntax(
            "[A-Za-z0-9_-] char is expected in variable-name",
            position,
        ));
    }
    literal(p, "}}")?;
    Ok((name, begin))
}

pub(super) fn key_value(p: &mut Parser) -> ParseResult<KeyValue> {
    let position = p.position();
    let key = key_string(p)?;
    spaces(p);
    literal(p, ":")?;
    spaces(p);
    let value = value_string(p)?;
    Ok(KeyValue {
        key,
        value,
        position,
    })
}

/// A whole `key: value` line, as used by headers, params and cookies.
pub(super) fn key_value_line(p: &mut Parser) -> ParseResult<KeyValue> {
    leading_lines(p);
    let key_value = key_value(p)?;
    line_terminator(p)?;
    Ok(key_value)
}

/// File name relative to the file root; parent references are rejected.
pub(super) fn path_string(p: &mut Parser) -> ParseResult<String> {
    let position = p.position();
    let name = p.read_while(|c| {
        is_ascii_letter(c) || is_ascii_digit(c) || matches!(c, '.' | '/' | '+' | '_' | '-')
    });
    if name.is_empty() {
        return Err(ParseError::syntax("a valid filename is expected", position));
    }
    if name.contains("..") {
        return Err(ParseError::syntax("relative filename is not valid", position));
    }
    Ok(name)
}

pub(super) fn section_header(p: &mut Parser, name: &str) -> ParseResult<()> {
    literal(p, &format!("[{name}]"))
}

/// URL characters from RFC 3986 plus template braces. The URL is not
/// validated beyond its character set.
pub(super) fn url(p: &mut Parser) -> ParseResult<Template> {
    let position = p.position();
    let url = p.read_while(|c| {
        let unreserved = is_ascii_letter(c) || is_ascii_digit(c) || "-._~".contains(c);
        let reserved = ":/?#[]@!$&'()*+,;=".contains(c);
        unreserved || reserved || c == '%' || is_template_control(c)
    });
    if url.is_empty() {
        return Err(ParseError::syntax("url is expected", position));
    }
    Ok(Template::new(url, position))
}
