use base64::Engine;

use super::primitives::{
    key_string, key_value_line, leading_lines, line_terminator, literal, one_or_more_spaces,
    path_string, section_header, spaces, url, value_string,
};
use super::response::{asserts_section, captures_section, response};
use super::scanner::{is_ascii_digit, is_ascii_letter, is_newline};
use super::xml::xml_extent;
use super::{ParseError, ParseResult, Parser};
use crate::ast::{
    Assert, Body, Bytes, Capture, Entry, FileParam, KeyValue, Method, MultipartParam, Request,
    Template,
};

const MULTILINE_MARKER: &str = "```";

enum RequestSection {
    QueryParams(Vec<KeyValue>),
    FormParams(Vec<KeyValue>),
    Multipart(Vec<MultipartParam>),
    Cookies(Vec<KeyValue>),
    Captures(Vec<Capture>),
    Asserts(Vec<Assert>),
}

pub(super) fn entry(p: &mut Parser) -> ParseResult<Entry> {
    let request = request(p)?;
    let response = p.optional(response);
    Ok(Entry { request, response })
}

pub(super) fn request(p: &mut Parser) -> ParseResult<Request> {
    let comments = leading_lines(p);
    let position = p.position();
    let method = method(p)?;
    one_or_more_spaces(p)?;
    let url = url(p)?;
    line_terminator(p)?;
    let headers = p.zero_or_more(key_value_line);
    let sections = p.zero_or_more(request_section);
    let body = p.optional(body);

    let mut request = Request {
        position,
        comments,
        method,
        url,
        headers,
        query_params: Vec::new(),
        form_params: Vec::new(),
        multipart: Vec::new(),
        cookies: Vec::new(),
        captures: Vec::new(),
        asserts: Vec::new(),
        body,
    };
    for section in sections {
        match section {
            RequestSection::QueryParams(params) => request.query_params.extend(params),
            RequestSection::FormParams(params) => request.form_params.extend(params),
            RequestSection::Multipart(params) => request.multipart.extend(params),
            RequestSection::Cookies(cookies) => request.cookies.extend(cookies),
            RequestSection::Captures(captures) => request.captures.extend(captures),
            RequestSection::Asserts(asserts) => request.asserts.extend(asserts),
        }
    }
    Ok(request)
}

fn method(p: &mut Parser) -> ParseResult<Method> {
    let position = p.position();
    for method in Method::ALL {
        if p.optional(|p| literal(p, method.as_str())).is_some() {
            return Ok(method);
        }
    }
    Err(ParseError::syntax("method is expected", position))
}

fn request_section(p: &mut Parser) -> ParseResult<RequestSection> {
    p.choice(&[
        query_params_section,
        form_params_section,
        cookies_section,
        multipart_section,
        request_captures_section,
        request_asserts_section,
    ])
}

/// Section header line: `[Name]` preceded by blank or comment lines.
fn section_start(p: &mut Parser, name: &str) -> ParseResult<()> {
    leading_lines(p);
    section_header(p, name)?;
    line_terminator(p)?;
    Ok(())
}

fn query_params_section(p: &mut Parser) -> ParseResult<RequestSection> {
    section_start(p, "QueryStringParams")?;
    Ok(RequestSection::QueryParams(p.zero_or_more(key_value_line)))
}

fn form_params_section(p: &mut Parser) -> ParseResult<RequestSection> {
    section_start(p, "FormParams")?;
    Ok(RequestSection::FormParams(p.zero_or_more(key_value_line)))
}

fn cookies_section(p: &mut Parser) -> ParseResult<RequestSection> {
    section_start(p, "Cookies")?;
    Ok(RequestSection::Cookies(p.zero_or_more(key_value_line)))
}

fn request_captures_section(p: &mut Parser) -> ParseResult<RequestSection> {
    captures_section(p).map(RequestSection::Captures)
}

fn request_asserts_section(p: &mut Parser) -> ParseResult<RequestSection> {
    asserts_section(p).map(RequestSection::Asserts)
}

fn multipart_section(p: &mut Parser) -> ParseResult<RequestSection> {
    section_start(p, "MultipartFormData")?;
    let mut params = Vec::new();
    while p.left() > 0 {
        // file params first, so that `a: file,a.txt;` is not read as text
        if let Some(file) = p.optional(file_param) {
            params.push(MultipartParam::File(file));
        } else if let Some(text) = p.optional(key_value_line) {
            params.push(MultipartParam::Text(text));
        } else {
            break;
        }
    }
    Ok(RequestSection::Multipart(params))
}

fn file_param(p: &mut Parser) -> ParseResult<FileParam> {
    leading_lines(p);
    let position = p.position();
    let key = key_string(p)?;
    spaces(p);
    literal(p, ":")?;
    spaces(p);
    literal(p, "file,")?;
    spaces(p);
    let filename = path_string(p)?;
    spaces(p);
    literal(p, ";")?;
    spaces(p);
    let content_type = p
        .optional(value_string)
        .map(|t| t.value)
        .filter(|v| !v.is_empty());
    line_terminator(p)?;
    Ok(FileParam {
        key,
        filename,
        content_type,
        position,
    })
}

pub(super) fn body(p: &mut Parser) -> ParseResult<Body> {
    leading_lines(p);
    let position = p.position();
    let bytes = bytes(p)?;
    line_terminator(p)?;
    Ok(Body { bytes, position })
}

fn bytes(p: &mut Parser) -> ParseResult<Bytes> {
    let position = p.position();
    p.choice(&[json, xml, raw_string, base64, file])
        .map_err(|e| match e {
            ParseError::Syntax { .. } if e.position() == position => {
                ParseError::syntax("a valid bytes is expected", position)
            }
            other => other,
        })
}

fn json(p: &mut Parser) -> ParseResult<Bytes> {
    let position = p.position();
    match p.peek() {
        Some(c) if !c.is_whitespace() => {}
        _ => return Err(ParseError::syntax("valid JSON body is expected", position)),
    }
    let remaining: String = p.scanner().remaining().iter().collect();
    let mut stream = serde_json::Deserializer::from_str(&remaining).into_iter::<serde_json::Value>();
    match stream.next() {
        Some(Ok(_)) => {}
        _ => return Err(ParseError::syntax("valid JSON body is expected", position)),
    }
    let text = &remaining[..stream.byte_offset()];
    p.read_n(text.chars().count())?;
    Ok(Bytes::Json(Template::new(text, position)))
}

fn xml(p: &mut Parser) -> ParseResult<Bytes> {
    let position = p.position();
    if p.peek() != Some('<') {
        return Err(ParseError::syntax("xml is expected", position));
    }
    let count = xml_extent(p.scanner().remaining())
        .ok_or_else(|| ParseError::syntax("valid xml body is expected", position))?;
    let text = p.read_n(count)?;
    Ok(Bytes::Xml(Template::new(text, position)))
}

fn at_multiline_marker(p: &Parser) -> bool {
    let marker: Vec<char> = MULTILINE_MARKER.chars().collect();
    p.scanner().remaining().starts_with(&marker)
}

fn raw_string(p: &mut Parser) -> ParseResult<Bytes> {
    literal(p, MULTILINE_MARKER)?;
    // an opening marker alone on its line is not part of the value
    p.optional(|p| {
        spaces(p);
        super::primitives::newline(p)
    });
    let position = p.position();
    let mut value = String::new();
    while !at_multiline_marker(p) {
        let c = p
            .read()
            .map_err(|e| ParseError::syntax("invalid multiline-string", e.position()))?;
        value.push(c);
    }
    literal(p, MULTILINE_MARKER)?;
    Ok(Bytes::Raw(Template::new(value, position)))
}

fn base64(p: &mut Parser) -> ParseResult<Bytes> {
    literal(p, "base64,")?;
    spaces(p);
    let position = p.position();
    let encoded = p.read_while(|c| {
        is_ascii_letter(c) || is_ascii_digit(c) || is_newline(c) || matches!(c, '+' | '/' | '=')
    });
    let compact: String = encoded.chars().filter(|c| !is_newline(*c)).collect();
    let value = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| ParseError::syntax("a valid base64-string is expected", position))?;
    spaces(p);
    literal(p, ";")?;
    Ok(Bytes::Base64(value))
}

fn file(p: &mut Parser) -> ParseResult<Bytes> {
    literal(p, "file,")?;
    spaces(p);
    let position = p.position();
    let filename = path_string(p)?;
    spaces(p);
    literal(p, ";")?;
    Ok(Bytes::File { filename, position })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Position;

    #[test]
    fn request_should_collect_sections() {
        let text = "POST http://localhost/upload?a=1\n\
                    Accept: */*\n\
                    [QueryStringParams]\n\
                    q: {{term}}\n\
                    [FormParams]\n\
                    user: bob\n\
                    [Cookies]\n\
                    session: abc\n\
                    [MultipartFormData]\n\
                    field: value\n\
                    upload: file,data/a.txt; text/plain\n\
                    raw: file,b.bin;\n";
        let mut p = Parser::new(text);
        let request = request(&mut p).unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.query_params[0].value.value, "{{term}}");
        assert_eq!(request.form_params[0].key, "user");
        assert_eq!(request.cookies[0].value.value, "abc");
        assert_eq!(request.multipart.len(), 3);
        match &request.multipart[1] {
            MultipartParam::File(file) => {
                assert_eq!(file.filename, "data/a.txt");
                assert_eq!(file.content_type.as_deref(), Some("text/plain"));
            }
            other => panic!("unexpected param {other:?}"),
        }
        match &request.multipart[2] {
            MultipartParam::File(file) => assert_eq!(file.content_type, None),
            other => panic!("unexpected param {other:?}"),
        }
        assert_eq!(p.left(), 0);
    }

    #[test]
    fn body_should_read_raw_multiline_string() {
        let mut p = Parser::new("```\nline 1\nline 2\n```\n");
        let body = body(&mut p).unwrap();
        assert_eq!(
            body.bytes,
            Bytes::Raw(Template::new("line 1\nline 2\n", Position::new(4, 2, 1)))
        );
    }

    #[test]
    fn body_should_fail_on_unterminated_raw_string() {
        let mut p = Parser::new("```\nnever closed\n");
        let error = body(&mut p).unwrap_err();
        assert_eq!(error.message(), "invalid multiline-string");
    }

    #[test]
    fn body_should_decode_base64() {
        let mut p = Parser::new("base64, SGVsbG8g\nV29ybGQ= ;\n");
        let body = body(&mut p).unwrap();
        assert_eq!(body.bytes, Bytes::Base64(b"Hello World".to_vec()));
    }

    #[test]
    fn body_should_read_json_extent() {
        let mut p = Parser::new("[1, {\"a\": \"é\"}]   # trailing\nHTTP/1.1 200");
        let body = body(&mut p).unwrap();
        match body.bytes {
            Bytes::Json(template) => assert_eq!(template.value, "[1, {\"a\": \"é\"}]"),
            other => panic!("unexpected bytes {other:?}"),
        }
        assert_eq!(p.peek(), Some('H'));
    }

    #[test]
    fn body_should_read_file_reference() {
        let mut p = Parser::new("file, data.bin;\n");
        let body = body(&mut p).unwrap();
        assert_eq!(
            body.bytes,
            Bytes::File {
                filename: "data.bin".to_string(),
                position: Position::new(6, 1, 7)
            }
        );
    }
}
