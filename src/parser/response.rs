use super::predicate::predicate;
use super::primitives::{
    key_string, key_value_line, leading_lines, line_terminator, literal, one_or_more_spaces,
    section_header, spaces,
};
use super::query::query;
use super::request::body;
use super::scanner::is_ascii_digit;
use super::{ParseError, ParseResult, Parser};
use crate::ast::{Assert, Capture, Response, Status, StatusValue, Version, VersionValue};

enum ResponseSection {
    Captures(Vec<Capture>),
    Asserts(Vec<Assert>),
}

pub(super) fn response(p: &mut Parser) -> ParseResult<Response> {
    leading_lines(p);
    let position = p.position();
    let version = version(p)?;
    one_or_more_spaces(p)?;
    let status = status(p)?;
    line_terminator(p)?;
    let headers = p.zero_or_more(key_value_line);
    let sections = p.zero_or_more(response_section);
    let body = p.optional(body);

    let mut captures = Vec::new();
    let mut asserts = Vec::new();
    for section in sections {
        match section {
            ResponseSection::Captures(c) => captures.extend(c),
            ResponseSection::Asserts(a) => asserts.extend(a),
        }
    }
    Ok(Response {
        position,
        version,
        status,
        headers,
        captures,
        asserts,
        body,
    })
}

fn version(p: &mut Parser) -> ParseResult<Version> {
    let position = p.position();
    for value in VersionValue::ALL {
        if p.optional(|p| literal(p, value.as_str())).is_some() {
            return Ok(Version { value, position });
        }
    }
    Err(ParseError::syntax("version is expected", position))
}

fn status(p: &mut Parser) -> ParseResult<Status> {
    let position = p.position();
    if p.peek() == Some('*') {
        p.read()?;
        return Ok(Status {
            value: StatusValue::Any,
            position,
        });
    }
    let digits = p.read_while(is_ascii_digit);
    let code = digits
        .parse::<u16>()
        .map_err(|_| ParseError::syntax("status code is expected", position))?;
    Ok(Status {
        value: StatusValue::Code(code),
        position,
    })
}

fn response_section(p: &mut Parser) -> ParseResult<ResponseSection> {
    p.choice(&[response_captures_section, response_asserts_section])
}

fn response_captures_section(p: &mut Parser) -> ParseResult<ResponseSection> {
    captures_section(p).map(ResponseSection::Captures)
}

fn response_asserts_section(p: &mut Parser) -> ParseResult<ResponseSection> {
    asserts_section(p).map(ResponseSection::Asserts)
}

pub(super) fn captures_section(p: &mut Parser) -> ParseResult<Vec<Capture>> {
    leading_lines(p);
    section_header(p, "Captures")?;
    line_terminator(p)?;
    Ok(p.zero_or_more(capture))
}

pub(super) fn asserts_section(p: &mut Parser) -> ParseResult<Vec<Assert>> {
    leading_lines(p);
    section_header(p, "Asserts")?;
    line_terminator(p)?;
    Ok(p.zero_or_more(assert))
}

fn capture(p: &mut Parser) -> ParseResult<Capture> {
    leading_lines(p);
    let position = p.position();
    let name = key_string(p)?;
    spaces(p);
    literal(p, ":")?;
    spaces(p);
    let query = query(p)?;
    line_terminator(p)?;
    Ok(Capture {
        name,
        query,
        position,
    })
}

fn assert(p: &mut Parser) -> ParseResult<Assert> {
    leading_lines(p);
    let position = p.position();
    let query = query(p)?;
    one_or_more_spaces(p)?;
    let predicate = predicate(p)?;
    line_terminator(p)?;
    Ok(Assert {
        query,
        predicate,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PredicateFunc, QueryKind, Subquery};

    #[test]
    fn response_should_read_status_headers_and_sections() {
        let text = "HTTP/1.0 404\n\
                    Content-Type: text/html\n\
                    [Captures]\n\
                    token: regex \"token=(\\\\w+)\"\n\
                    [Asserts]\n\
                    jsonpath \"$.items\" count equals 2\n\
                    header \"Vary\" not exists\n";
        let mut p = Parser::new(text);
        let response = response(&mut p).unwrap();
        assert_eq!(response.version.value, VersionValue::Http10);
        assert_eq!(response.status.value, StatusValue::Code(404));
        assert_eq!(response.headers[0].key, "Content-Type");
        assert_eq!(response.captures[0].name, "token");
        assert_eq!(response.asserts.len(), 2);
        assert_eq!(response.asserts[0].query.subquery, Some(Subquery::Count));
        assert_eq!(response.asserts[0].predicate.func, PredicateFunc::EqualNumber(2.0));
        assert!(response.asserts[1].predicate.not);
        assert_eq!(response.asserts[1].predicate.func, PredicateFunc::Exist);
        assert!(matches!(response.asserts[1].query.kind, QueryKind::Header(_)));
        assert_eq!(p.left(), 0);
    }

    #[test]
    fn status_should_reject_out_of_range_code() {
        let mut p = Parser::new("HTTP/1.1 99999\n");
        assert!(response(&mut p).is_err());
    }

    #[test]
    fn assert_should_not_read_count_equals_as_count_subquery() {
        let mut p = Parser::new("jsonpath \"$.a\" countEquals 3\n");
        let assert = assert(&mut p).unwrap();
        assert_eq!(assert.query.subquery, None);
        assert_eq!(assert.predicate.func, PredicateFunc::CountEqual(3));
    }
}
