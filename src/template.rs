//! # Template Rendering
//!
//! Substitutes `{{name}}` (or `{{{name}}}`) placeholders with variables.
//! Rendering is a single left-to-right pass: text produced by a substitution
//! is never scanned again.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::parser::Position;
use crate::variables::{Variable, VariableStore};

pub const UNDEFINED_VARIABLE: &str = "undefined variable";
pub const INVALID_VARIABLE: &str = "invalid variable";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} {name}")]
pub struct InvalidVariable {
    pub name: String,
    pub position: Position,
    pub reason: String,
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{{2,3}([A-Za-z0-9_\- ]+)\}{2,3}").unwrap_or_else(|e| panic!("{e}"))
    })
}

/// Renders `text` against `variables`. `position` is reported on failure.
pub fn render(
    text: &str,
    variables: &VariableStore,
    position: Position,
) -> Result<String, InvalidVariable> {
    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;
    for captures in placeholder().captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        rendered.push_str(&text[last..whole.start()]);
        rendered.push_str(&lookup(name.as_str(), variables, position)?);
        last = whole.end();
    }
    rendered.push_str(&text[last..]);
    Ok(rendered)
}

fn lookup(name: &str, variables: &VariableStore, position: Position) -> Result<String, InvalidVariable> {
    let error = |reason: &str| InvalidVariable {
        name: name.to_string(),
        position,
        reason: reason.to_string(),
    };
    match variables.get(name) {
        None => Err(error(UNDEFINED_VARIABLE)),
        Some(Variable::String(s)) => Ok(s.clone()),
        Some(Variable::Number(n)) => Ok(format_number(*n)),
        Some(Variable::Bool(b)) => Ok(b.to_string()),
        Some(Variable::Opaque(_)) => Err(error(INVALID_VARIABLE)),
    }
}

/// Shortest decimal form: `42` for whole numbers, `4.5` otherwise.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}
