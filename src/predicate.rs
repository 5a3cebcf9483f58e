//! # Predicate Engine
//!
//! Compares a query result with the expected value of an assert.
//!
//! A predicate whose actual value has the wrong kind fails silently. Negated
//! predicates always succeed when nothing was found; negated equality and
//! negated `contains` also succeed on a kind mismatch.

use regex::Regex;
use serde_json::Value;

use crate::ast::{PredicateFunc, Template};
use crate::query::QueryResult;
use crate::template::{self, format_number, InvalidVariable, UNDEFINED_VARIABLE};
use crate::variables::{Variable, VariableStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateResult {
    pub succeeded: bool,
    pub actual: String,
    pub expected: String,
}

/// Outcome of the comparison before negation. `None` when the actual value
/// has a kind the predicate does not apply to.
type Matched = Option<bool>;

fn expected(not: bool, positive: String, negative: String) -> String {
    if not {
        negative
    } else {
        positive
    }
}

fn equal_string(actual: &QueryResult, value: &str) -> Matched {
    match actual {
        QueryResult::String(s) => Some(s == value),
        _ => None,
    }
}

fn equal_number(actual: &QueryResult, value: f64) -> Matched {
    match actual {
        QueryResult::Number(n) => Some(*n == value),
        _ => None,
    }
}

fn equal_bool(actual: &QueryResult, value: bool) -> Matched {
    match actual {
        QueryResult::Boolean(b) => Some(*b == value),
        _ => None,
    }
}

fn compare_number(actual: &QueryResult, test: impl Fn(f64) -> bool) -> Matched {
    match actual {
        QueryResult::Number(n) => Some(test(*n)),
        _ => None,
    }
}

fn test_string(actual: &QueryResult, test: impl Fn(&str) -> bool) -> Matched {
    match actual {
        QueryResult::String(s) => Some(test(s)),
        _ => None,
    }
}

fn includes(actual: &QueryResult, item: &QueryResult) -> Matched {
    match actual {
        QueryResult::List(items) => Some(items.contains(item)),
        _ => None,
    }
}

fn render(template: &Template, variables: &VariableStore) -> Result<String, InvalidVariable> {
    template::render(&template.value, variables, template.position)
}

/// Evaluates `func` (negated when `not` is set) against `actual`. Expected
/// strings are templates and fail with [`InvalidVariable`] when they cannot
/// be rendered.
pub fn evaluate(
    func: &PredicateFunc,
    not: bool,
    actual: &QueryResult,
    variables: &VariableStore,
) -> Result<PredicateResult, InvalidVariable> {
    // both polarities of the text, picked once `not` is known
    let (matched, positive, negative): (Matched, String, String) = match func {
        PredicateFunc::EqualString(value) => {
            let value = render(value, variables)?;
            (
                equal_string(actual, &value),
                format!("equals string <{value}>"),
                format!("doesn't equal string <{value}>"),
            )
        }
        PredicateFunc::EqualNumber(value) => {
            let text = format_number(*value);
            (
                equal_number(actual, *value),
                format!("equals number <{text}>"),
                format!("doesn't equal number <{text}>"),
            )
        }
        PredicateFunc::EqualBool(value) => (
            equal_bool(actual, *value),
            format!("equals boolean <{value}>"),
            format!("doesn't equal boolean <{value}>"),
        ),
        PredicateFunc::EqualNull => (
            match actual {
                QueryResult::Object(Value::Null) => Some(true),
                _ => None,
            },
            "equals <null>".to_string(),
            "doesn't equal <null>".to_string(),
        ),
        PredicateFunc::EqualExpr { name, position } => match variables.get(name) {
            None => {
                return Err(InvalidVariable {
                    name: name.clone(),
                    position: *position,
                    reason: UNDEFINED_VARIABLE.to_string(),
                })
            }
            Some(Variable::String(s)) => (
                equal_string(actual, s),
                format!("equals string <{s}>"),
                format!("doesn't equal string <{s}>"),
            ),
            Some(Variable::Number(n)) => {
                let text = format_number(*n);
                (
                    equal_number(actual, *n),
                    format!("equals number <{text}>"),
                    format!("doesn't equal number <{text}>"),
                )
            }
            Some(Variable::Bool(b)) => (
                equal_bool(actual, *b),
                format!("equals boolean <{b}>"),
                format!("doesn't equal boolean <{b}>"),
            ),
            Some(Variable::Opaque(value)) => (
                Some(actual == value),
                format!("equals {value}"),
                format!("doesn't equal {value}"),
            ),
        },
        PredicateFunc::GreaterThan(value) => {
            let text = format_number(*value);
            (
                compare_number(actual, |n| n > *value),
                format!("greater than number <{text}>"),
                format!("not greater than number <{text}>"),
            )
        }
        PredicateFunc::GreaterThanOrEqual(value) => {
            let text = format_number(*value);
            (
                compare_number(actual, |n| n >= *value),
                format!("greater than or equals number <{text}>"),
                format!("not greater than or equals number <{text}>"),
            )
        }
        PredicateFunc::LessThan(value) => {
            let text = format_number(*value);
            (
                compare_number(actual, |n| n < *value),
                format!("less than number <{text}>"),
                format!("not less than number <{text}>"),
            )
        }
        PredicateFunc::LessThanOrEqual(value) => {
            let text = format_number(*value);
            (
                compare_number(actual, |n| n <= *value),
                format!("less than or equals number <{text}>"),
                format!("not less than or equals number <{text}>"),
            )
        }
        PredicateFunc::StartWith(value) => {
            let value = render(value, variables)?;
            (
                test_string(actual, |s| s.starts_with(value.as_str())),
                format!("starts with string <{value}>"),
                format!("doesn't start with string <{value}>"),
            )
        }
        PredicateFunc::Contain(value) => {
            let value = render(value, variables)?;
            (
                test_string(actual, |s| s.contains(value.as_str())),
                format!("contains string <{value}>"),
                format!("doesn't contain string <{value}>"),
            )
        }
        PredicateFunc::IncludeString(value) => {
            let value = render(value, variables)?;
            (
                includes(actual, &QueryResult::String(value.clone())),
                format!("include string <{value}>"),
                format!("doesn't include string <{value}>"),
            )
        }
        PredicateFunc::IncludeNumber(value) => {
            let text = format_number(*value);
            (
                includes(actual, &QueryResult::Number(*value)),
                format!("include number <{text}>"),
                format!("doesn't include number <{text}>"),
            )
        }
        PredicateFunc::IncludeBool(value) => (
            includes(actual, &QueryResult::Boolean(*value)),
            format!("include boolean <{value}>"),
            format!("doesn't include boolean <{value}>"),
        ),
        PredicateFunc::IncludeNull => (
            includes(actual, &QueryResult::Object(Value::Null)),
            "includes <null>".to_string(),
            "doesn't include <null>".to_string(),
        ),
        PredicateFunc::Match(value) => {
            let pattern = render(value, variables)?;
            match Regex::new(&pattern) {
                Ok(regex) => (
                    test_string(actual, |s| regex.is_match(s)),
                    format!("matches string <{pattern}>"),
                    format!("doesn't match string <{pattern}>"),
                ),
                Err(_) => {
                    let invalid = format!("a valid regex, got <{pattern}>");
                    (None, invalid.clone(), invalid)
                }
            }
        }
        PredicateFunc::CountEqual(count) => (
            match actual {
                QueryResult::List(items) => Some(items.len() == *count),
                QueryResult::NodeSet(size) => Some(size == count),
                _ => None,
            },
            format!("count equals {count}"),
            format!("count doesn't equals {count}"),
        ),
        PredicateFunc::Exist => (
            Some(!matches!(actual, QueryResult::None | QueryResult::NodeSet(0))),
            "anything".to_string(),
            "nothing".to_string(),
        ),
    };

    let succeeded = match (not, matched) {
        (false, matched) => matched == Some(true),
        (true, _) if *actual == QueryResult::None => true,
        (true, Some(matched)) => !matched,
        (true, None) => negation_accepts_mismatch(func),
    };
    Ok(PredicateResult {
        succeeded,
        actual: actual.to_string(),
        expected: expected(not, positive, negative),
    })
}

fn negation_accepts_mismatch(func: &PredicateFunc) -> bool {
    matches!(
        func,
        PredicateFunc::EqualString(_)
            | PredicateFunc::EqualNumber(_)
            | PredicateFunc::EqualBool(_)
            | PredicateFunc::EqualNull
            | PredicateFunc::EqualExpr { .. }
            | PredicateFunc::Contain(_)
    )
}
