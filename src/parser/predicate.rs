use super::primitives::{
    boolean, expr, integer, literal, null, number, one_or_more_spaces, quoted_string, spaces,
};
use super::{ParseError, ParseResult, Parser};
use crate::ast::{Predicate, PredicateFunc};

pub(super) fn predicate(p: &mut Parser) -> ParseResult<Predicate> {
    let position = p.position();
    let not = p
        .optional(|p| {
            literal(p, "not")?;
            one_or_more_spaces(p)
        })
        .is_some();
    let func = predicate_func(p)?;
    Ok(Predicate {
        not,
        func,
        position,
    })
}

fn predicate_func(p: &mut Parser) -> ParseResult<PredicateFunc> {
    p.choice(&[
        equal_predicate,
        greater_or_equal_predicate,
        greater_predicate,
        less_or_equal_predicate,
        less_predicate,
        count_predicate,
        start_with_predicate,
        contain_predicate,
        include_predicate,
        match_predicate,
        exist_predicate,
    ])
}

/// Predicate keyword followed by optional spaces.
fn keyword(p: &mut Parser, name: &str) -> ParseResult<()> {
    literal(p, name)?;
    spaces(p);
    Ok(())
}

fn equal_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "equals")?;
    p.choice(&[
        equal_number,
        equal_bool,
        equal_string,
        equal_null,
        equal_expr,
    ])
}

fn equal_number(p: &mut Parser) -> ParseResult<PredicateFunc> {
    number(p).map(PredicateFunc::EqualNumber)
}

fn equal_bool(p: &mut Parser) -> ParseResult<PredicateFunc> {
    boolean(p).map(PredicateFunc::EqualBool)
}

fn equal_string(p: &mut Parser) -> ParseResult<PredicateFunc> {
    quoted_string(p).map(PredicateFunc::EqualString)
}

fn equal_null(p: &mut Parser) -> ParseResult<PredicateFunc> {
    null(p).map(|_| PredicateFunc::EqualNull)
}

fn equal_expr(p: &mut Parser) -> ParseResult<PredicateFunc> {
    let (name, position) = expr(p)?;
    Ok(PredicateFunc::EqualExpr { name, position })
}

fn greater_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "greaterThan")?;
    number(p).map(PredicateFunc::GreaterThan)
}

fn greater_or_equal_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "greaterThanOrEquals")?;
    number(p).map(PredicateFunc::GreaterThanOrEqual)
}

fn less_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "lessThan")?;
    number(p).map(PredicateFunc::LessThan)
}

fn less_or_equal_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "lessThanOrEquals")?;
    number(p).map(PredicateFunc::LessThanOrEqual)
}

fn count_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "countEquals")?;
    let position = p.position();
    let count = integer(p)?;
    usize::try_from(count)
        .map(PredicateFunc::CountEqual)
        .map_err(|_| ParseError::syntax("a positive count is expected", position))
}

fn start_with_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "startsWith")?;
    quoted_string(p).map(PredicateFunc::StartWith)
}

fn contain_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "contains")?;
    quoted_string(p).map(PredicateFunc::Contain)
}

fn include_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "includes")?;
    p.choice(&[include_bool, include_number, include_string, include_null])
}

fn include_bool(p: &mut Parser) -> ParseResult<PredicateFunc> {
    boolean(p).map(PredicateFunc::IncludeBool)
}

fn include_number(p: &mut Parser) -> ParseResult<PredicateFunc> {
    number(p).map(PredicateFunc::IncludeNumber)
}

fn include_string(p: &mut Parser) -> ParseResult<PredicateFunc> {
    quoted_string(p).map(PredicateFunc::IncludeString)
}

fn include_null(p: &mut Parser) -> ParseResult<PredicateFunc> {
    null(p).map(|_| PredicateFunc::IncludeNull)
}

fn match_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    keyword(p, "matches")?;
    quoted_string(p).map(PredicateFunc::Match)
}

fn exist_predicate(p: &mut Parser) -> ParseResult<PredicateFunc> {
    literal(p, "exists")?;
    Ok(PredicateFunc::Exist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseResult<Predicate> {
        predicate(&mut Parser::new(text))
    }

    #[test]
    fn predicate_should_read_each_equals_kind() {
        assert_eq!(parse("equals 1.5").unwrap().func, PredicateFunc::EqualNumber(1.5));
        assert_eq!(parse("equals true").unwrap().func, PredicateFunc::EqualBool(true));
        assert_eq!(parse("equals null").unwrap().func, PredicateFunc::EqualNull);
        match parse("equals \"a\"").unwrap().func {
            PredicateFunc::EqualString(t) => assert_eq!(t.value, "a"),
            other => panic!("unexpected predicate {other:?}"),
        }
        match parse("equals {{id}}").unwrap().func {
            PredicateFunc::EqualExpr { name, .. } => assert_eq!(name, "id"),
            other => panic!("unexpected predicate {other:?}"),
        }
    }

    #[test]
    fn predicate_should_read_negation() {
        let predicate = parse("not contains \"x\"").unwrap();
        assert!(predicate.not);
        assert!(matches!(predicate.func, PredicateFunc::Contain(_)));
    }

    #[test]
    fn predicate_should_distinguish_greater_variants() {
        assert_eq!(parse("greaterThan 2").unwrap().func, PredicateFunc::GreaterThan(2.0));
        assert_eq!(
            parse("greaterThanOrEquals 2").unwrap().func,
            PredicateFunc::GreaterThanOrEqual(2.0)
        );
        assert_eq!(parse("lessThan -1").unwrap().func, PredicateFunc::LessThan(-1.0));
    }

    #[test]
    fn predicate_should_reject_negative_count() {
        assert!(parse("countEquals -1").is_err());
        assert_eq!(parse("countEquals 0").unwrap().func, PredicateFunc::CountEqual(0));
    }

    #[test]
    fn predicate_should_fail_on_unknown_function() {
        assert!(parse("resembles \"x\"").is_err());
    }
}
