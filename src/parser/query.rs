use super::primitives::{literal, one_or_more_spaces, quoted_string};
use super::scanner::{is_ascii_space, is_newline};
use super::{ParseError, ParseResult, Parser};
use crate::ast::{Query, QueryKind, Subquery};

pub(super) fn query(p: &mut Parser) -> ParseResult<Query> {
    let position = p.position();
    let kind = p.choice(&[
        status_query,
        header_query,
        cookie_query,
        body_query,
        xpath_query,
        jsonpath_query,
        regex_query,
        variable_query,
        duration_query,
    ])?;
    let subquery = p.optional(subquery);
    Ok(Query {
        kind,
        subquery,
        position,
    })
}

fn status_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "status")?;
    Ok(QueryKind::Status)
}

fn body_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "body")?;
    Ok(QueryKind::Body)
}

fn duration_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "duration")?;
    Ok(QueryKind::Duration)
}

fn header_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "header")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::Header(quoted_string(p)?))
}

fn cookie_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "cookie")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::Cookie(quoted_string(p)?))
}

fn xpath_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "xpath")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::XPath(quoted_string(p)?))
}

fn jsonpath_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "jsonpath")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::JsonPath(quoted_string(p)?))
}

fn regex_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "regex")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::Regex(quoted_string(p)?))
}

fn variable_query(p: &mut Parser) -> ParseResult<QueryKind> {
    literal(p, "variable")?;
    one_or_more_spaces(p)?;
    Ok(QueryKind::Variable(quoted_string(p)?))
}

fn subquery(p: &mut Parser) -> ParseResult<Subquery> {
    p.choice(&[regex_subquery, count_subquery])
}

fn regex_subquery(p: &mut Parser) -> ParseResult<Subquery> {
    one_or_more_spaces(p)?;
    literal(p, "regex")?;
    one_or_more_spaces(p)?;
    Ok(Subquery::Regex(quoted_string(p)?))
}

fn count_subquery(p: &mut Parser) -> ParseResult<Subquery> {
    one_or_more_spaces(p)?;
    literal(p, "count")?;
    // `countEquals` is a predicate, not a `count` subquery
    match p.peek() {
        None | Some('#') => {}
        Some(c) if is_ascii_space(c) || is_newline(c) => {}
        Some(_) => {
            return Err(ParseError::syntax(
                "space is expected after count",
                p.position(),
            ))
        }
    }
    Ok(Subquery::Count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Template;
    use crate::parser::Position;

    #[test]
    fn query_should_read_regex_subquery() {
        let mut p = Parser::new("header \"Location\" regex \"id=(\\\\d+)\"");
        let query = query(&mut p).unwrap();
        assert_eq!(
            query.kind,
            QueryKind::Header(Template::new("Location", Position::new(7, 1, 8)))
        );
        assert_eq!(
            query.subquery,
            Some(Subquery::Regex(Template::new(
                "id=(\\d+)",
                Position::new(24, 1, 25)
            )))
        );
    }

    #[test]
    fn query_should_read_count_at_end_of_line() {
        let mut p = Parser::new("jsonpath \"$.items\" count\n");
        let query = query(&mut p).unwrap();
        assert_eq!(query.subquery, Some(Subquery::Count));
        assert_eq!(p.peek(), Some('\n'));
    }

    #[test]
    fn query_should_fail_on_unknown_type() {
        let mut p = Parser::new("header");
        assert!(query(&mut p).is_err());
        let mut p = Parser::new("foo \"x\"");
        assert!(query(&mut p).is_err());
    }
}
