//! # Query Engine
//!
//! Extracts typed values from an HTTP exchange. Every query evaluates to a
//! [`QueryResult`]; [`QueryResult::None`] means nothing was found, which is
//! distinct from a [`QueryError`] (bad expression, undecodable body).

mod cookiepath;
mod jsonpath;
mod xpath;

use std::fmt;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::ast::{Query, QueryKind, Subquery, Template};
use crate::http::HttpResponse;
use crate::template::{self, format_number, InvalidVariable};
use crate::variables::VariableStore;

pub use jsonpath::JsonPath;
pub use xpath::XPath;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    None,
    String(String),
    Number(f64),
    Boolean(bool),
    List(Vec<QueryResult>),
    NodeSet(usize),
    /// A JSON object, or a JSON `null` that was actually found.
    Object(Value),
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::None => write!(f, "none"),
            QueryResult::String(s) => write!(f, "string <{s}>"),
            QueryResult::Number(n) => write!(f, "number <{}>", format_number(*n)),
            QueryResult::Boolean(b) => write!(f, "boolean <{b}>"),
            QueryResult::List(items) => write!(f, "list(size={})", items.len()),
            QueryResult::NodeSet(size) => write!(f, "nodeset(size={size})"),
            QueryResult::Object(value) => write!(f, "object <{value}>"),
        }
    }
}

impl QueryResult {
    /// Coerces a JSON value. Arrays become lists of coerced items.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(b) => QueryResult::Boolean(b),
            Value::Number(n) => n.as_f64().map_or(QueryResult::None, QueryResult::Number),
            Value::String(s) => QueryResult::String(s),
            Value::Array(items) => {
                QueryResult::List(items.into_iter().map(QueryResult::from_json).collect())
            }
            value @ (Value::Null | Value::Object(_)) => QueryResult::Object(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Variable(#[from] InvalidVariable),
}

/// Failure reported by a structured-data evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("invalid expression {0}")]
    InvalidExpression(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Evaluates JSONPath expressions. A path matching nothing yields an empty
/// list, not an error.
pub trait JsonPathEvaluator {
    fn evaluate(&self, expr: &str, document: &str) -> Result<Vec<Value>, EvalError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    Boolean(bool),
    Number(f64),
    String(String),
    NodeSet(usize),
}

/// Evaluates XPath expressions against a markup document.
pub trait XPathEvaluator {
    fn evaluate(&self, expr: &str, document: &str) -> Result<XPathValue, EvalError>;
}

/// Structured-data back-ends available to queries.
pub struct Evaluators {
    pub jsonpath: Box<dyn JsonPathEvaluator>,
    pub xpath: Box<dyn XPathEvaluator>,
}

impl Default for Evaluators {
    fn default() -> Self {
        Self {
            jsonpath: Box::new(JsonPath),
            xpath: Box::new(XPath),
        }
    }
}

/// Everything a query can read from.
pub struct Exchange<'a> {
    pub response: &'a HttpResponse,
    pub variables: &'a VariableStore,
    pub evaluators: &'a Evaluators,
}

impl Exchange<'_> {
    fn render(&self, template: &Template) -> Result<String, QueryError> {
        Ok(template::render(
            &template.value,
            self.variables,
            template.position,
        )?)
    }

    fn body_text(&self) -> Result<String, QueryError> {
        self.response
            .text()
            .map_err(|e| QueryError::Invalid(e.to_string()))
    }
}

fn compile(pattern: &str) -> Result<Regex, QueryError> {
    Regex::new(pattern).map_err(|_| QueryError::Invalid(format!("invalid regex \"{pattern}\"")))
}

/// Evaluates `query` and its subquery, if any.
pub fn eval(query: &Query, exchange: &Exchange) -> Result<QueryResult, QueryError> {
    let result = eval_kind(&query.kind, exchange)?;
    match &query.subquery {
        None => Ok(result),
        Some(subquery) => eval_subquery(subquery, result, exchange),
    }
}

fn eval_kind(kind: &QueryKind, exchange: &Exchange) -> Result<QueryResult, QueryError> {
    let response = exchange.response;
    match kind {
        QueryKind::Status => Ok(QueryResult::Number(f64::from(response.status))),
        QueryKind::Duration => Ok(QueryResult::Number(response.duration.as_millis() as f64)),
        QueryKind::Header(name) => {
            let name = exchange.render(name)?;
            let mut values: Vec<QueryResult> = response
                .header_values(&name)
                .into_iter()
                .map(|v| QueryResult::String(v.to_string()))
                .collect();
            Ok(match values.len() {
                0 => QueryResult::None,
                1 => values.remove(0),
                _ => QueryResult::List(values),
            })
        }
        QueryKind::Cookie(expr) => {
            let expr = exchange.render(expr)?;
            cookiepath::evaluate(&expr, &response.header_values("Set-Cookie"))
        }
        QueryKind::Body => Ok(QueryResult::String(exchange.body_text()?)),
        QueryKind::JsonPath(expr) => {
            let expr = exchange.render(expr)?;
            let body = exchange.body_text()?;
            let mut values = exchange
                .evaluators
                .jsonpath
                .evaluate(&expr, &body)
                .map_err(|e| QueryError::Invalid(e.to_string()))?;
            Ok(match values.len() {
                0 => QueryResult::None,
                1 => QueryResult::from_json(values.remove(0)),
                _ => QueryResult::List(values.into_iter().map(QueryResult::from_json).collect()),
            })
        }
        QueryKind::XPath(expr) => {
            let expr = exchange.render(expr)?;
            let body = exchange.body_text()?;
            if body.trim().is_empty() {
                return Err(QueryError::Invalid("xpath query on an empty body".to_string()));
            }
            let value = exchange
                .evaluators
                .xpath
                .evaluate(&expr, &body)
                .map_err(|e| QueryError::Invalid(e.to_string()))?;
            Ok(match value {
                XPathValue::Boolean(b) => QueryResult::Boolean(b),
                XPathValue::Number(n) => QueryResult::Number(n),
                XPathValue::String(s) => QueryResult::String(s),
                XPathValue::NodeSet(size) => QueryResult::NodeSet(size),
            })
        }
        QueryKind::Regex(expr) => {
            let pattern = exchange.render(expr)?;
            let regex = compile(&pattern)?;
            let body = exchange.body_text()?;
            Ok(regex
                .captures(&body)
                .and_then(|c| c.get(1))
                .map_or(QueryResult::None, |m| {
                    QueryResult::String(m.as_str().to_string())
                }))
        }
        QueryKind::Variable(name) => {
            let name = exchange.render(name)?;
            Ok(exchange
                .variables
                .get(&name)
                .map_or(QueryResult::None, |v| v.to_result()))
        }
    }
}

fn eval_subquery(
    subquery: &Subquery,
    result: QueryResult,
    exchange: &Exchange,
) -> Result<QueryResult, QueryError> {
    match subquery {
        Subquery::Count => match result {
            QueryResult::List(items) => Ok(QueryResult::Number(items.len() as f64)),
            QueryResult::NodeSet(size) => Ok(QueryResult::Number(size as f64)),
            QueryResult::None => Ok(QueryResult::Number(0.0)),
            other => Err(QueryError::Invalid(format!(
                "count subquery is incompatible with {other}"
            ))),
        },
        Subquery::Regex(expr) => {
            let QueryResult::String(text) = result else {
                return Err(QueryError::Invalid(
                    "regex subquery expects a string query result".to_string(),
                ));
            };
            let pattern = exchange.render(expr)?;
            compile(&pattern)?;
            let whole = compile(&format!("^(?:{pattern})$"))?;
            Ok(whole
                .captures(&text)
                .and_then(|c| c.get(1))
                .map_or(QueryResult::None, |m| {
                    QueryResult::String(m.as_str().to_string())
                }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Position;
    use crate::variables::Variable;
    use std::time::Duration;

    fn query(kind: QueryKind, subquery: Option<Subquery>) -> Query {
        Query {
            kind,
            subquery,
            position: Position::default(),
        }
    }

    fn t(value: &str) -> Template {
        Template::new(value, Position::default())
    }

    fn run(query: &Query, response: &HttpResponse, variables: &VariableStore) -> Result<QueryResult, QueryError> {
        let evaluators = Evaluators::default();
        let exchange = Exchange {
            response,
            variables,
            evaluators: &evaluators,
        };
        eval(query, &exchange)
    }

    fn json_response() -> HttpResponse {
        HttpResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_header("X-Id", "42")
            .with_header("Vary", "Accept")
            .with_header("Vary", "Origin")
            .with_body(r#"{"id": 7, "tags": ["a", "b"], "owner": {"name": "bob"}, "none": null}"#)
    }

    #[test]
    fn eval_should_read_status_headers_and_duration() {
        let mut response = json_response();
        response.duration = Duration::from_millis(15);
        let variables = VariableStore::new();
        assert_eq!(run(&query(QueryKind::Status, None), &response, &variables), Ok(QueryResult::Number(200.0)));
        assert_eq!(run(&query(QueryKind::Duration, None), &response, &variables), Ok(QueryResult::Number(15.0)));
        assert_eq!(
            run(&query(QueryKind::Header(t("x-id")), None), &response, &variables),
            Ok(QueryResult::String("42".to_string()))
        );
        assert_eq!(
            run(&query(QueryKind::Header(t("Vary")), Some(Subquery::Count)), &response, &variables),
            Ok(QueryResult::Number(2.0))
        );
        assert_eq!(
            run(&query(QueryKind::Header(t("X-Missing")), None), &response, &variables),
            Ok(QueryResult::None)
        );
    }

    #[test]
    fn eval_should_coerce_jsonpath_results() {
        let response = json_response();
        let variables = VariableStore::new();
        let jsonpath = |expr: &str| run(&query(QueryKind::JsonPath(t(expr)), None), &response, &variables);
        assert_eq!(jsonpath("$.id"), Ok(QueryResult::Number(7.0)));
        assert_eq!(
            jsonpath("$.tags"),
            Ok(QueryResult::List(vec![
                QueryResult::String("a".to_string()),
                QueryResult::String("b".to_string())
            ]))
        );
        assert_eq!(jsonpath("$.none"), Ok(QueryResult::Object(Value::Null)));
        assert_eq!(jsonpath("$.missing"), Ok(QueryResult::None));
        assert!(matches!(jsonpath("$.owner"), Ok(QueryResult::Object(_))));
    }

    #[test]
    fn eval_should_fail_jsonpath_on_non_json_body() {
        let response = HttpResponse::new(200).with_body("<html></html>");
        let result = run(&query(QueryKind::JsonPath(t("$.id")), None), &response, &VariableStore::new());
        assert!(matches!(result, Err(QueryError::Invalid(_))));
    }

    #[test]
    fn eval_should_coerce_xpath_results() {
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "text/html")
            .with_body("<html><body><h1>Welcome</h1><p>a</p><p>b</p></body></html>");
        let variables = VariableStore::new();
        let xpath = |expr: &str| run(&query(QueryKind::XPath(t(expr)), None), &response, &variables);
        assert_eq!(xpath("//p"), Ok(QueryResult::NodeSet(2)));
        assert_eq!(xpath("//h2"), Ok(QueryResult::NodeSet(0)));
        assert_eq!(xpath("normalize-space(//h1)"), Ok(QueryResult::String("Welcome".to_string())));
        assert_eq!(xpath("count(//p) > 1"), Ok(QueryResult::Boolean(true)));
        assert_eq!(
            run(&query(QueryKind::XPath(t("//p")), Some(Subquery::Count)), &response, &variables),
            Ok(QueryResult::Number(2.0))
        );
    }

    #[test]
    fn eval_should_fail_xpath_on_malformed_or_empty_body() {
        let variables = VariableStore::new();
        let xpath = query(QueryKind::XPath(t("//h1")), None);
        let broken = HttpResponse::new(200).with_body("<html><h1></html>");
        assert!(matches!(
            run(&xpath, &broken, &variables),
            Err(QueryError::Invalid(message)) if message.starts_with("invalid document")
        ));
        let empty = HttpResponse::new(200);
        assert!(matches!(run(&xpath, &empty, &variables), Err(QueryError::Invalid(_))));
    }

    #[test]
    fn eval_should_use_injected_xpath_evaluator() {
        struct CountingXPath;
        impl XPathEvaluator for CountingXPath {
            fn evaluate(&self, expr: &str, document: &str) -> Result<XPathValue, EvalError> {
                Ok(XPathValue::NodeSet(document.matches(expr).count()))
            }
        }
        let evaluators = Evaluators {
            xpath: Box::new(CountingXPath),
            ..Default::default()
        };
        let response = HttpResponse::new(200).with_body("<p></p><p></p>");
        let variables = VariableStore::new();
        let exchange = Exchange {
            response: &response,
            variables: &variables,
            evaluators: &evaluators,
        };
        let result = eval(&query(QueryKind::XPath(t("<p>")), None), &exchange);
        assert_eq!(result, Ok(QueryResult::NodeSet(2)));
    }

    #[test]
    fn eval_should_apply_regex_query_and_subquery() {
        let response = HttpResponse::new(200)
            .with_header("Location", "/orders/981")
            .with_body("token=abc123; path=/");
        let variables = VariableStore::new();
        assert_eq!(
            run(&query(QueryKind::Regex(t(r"token=(\w+)")), None), &response, &variables),
            Ok(QueryResult::String("abc123".to_string()))
        );
        assert_eq!(
            run(&query(QueryKind::Regex(t("nothing=(.*)")), None), &response, &variables),
            Ok(QueryResult::None)
        );
        assert_eq!(
            run(
                &query(QueryKind::Header(t("Location")), Some(Subquery::Regex(t(r"/orders/(\d+)")))),
                &response,
                &variables
            ),
            Ok(QueryResult::String("981".to_string()))
        );
        assert!(matches!(
            run(&query(QueryKind::Regex(t("(unclosed")), None), &response, &variables),
            Err(QueryError::Invalid(message)) if message == "invalid regex \"(unclosed\""
        ));
    }

    #[test]
    fn eval_should_read_variables_and_render_expressions() {
        let response = HttpResponse::new(200).with_header("X-Token", "t0k");
        let mut variables = VariableStore::from_strings([("header", "X-Token")]);
        variables.insert("n", Variable::Number(3.0));
        assert_eq!(
            run(&query(QueryKind::Variable(t("n")), None), &response, &variables),
            Ok(QueryResult::Number(3.0))
        );
        assert_eq!(
            run(&query(QueryKind::Variable(t("unknown")), None), &response, &variables),
            Ok(QueryResult::None)
        );
        assert_eq!(
            run(&query(QueryKind::Header(t("{{header}}")), None), &response, &variables),
            Ok(QueryResult::String("t0k".to_string()))
        );
        assert!(matches!(
            run(&query(QueryKind::Header(t("{{missing}}")), None), &response, &variables),
            Err(QueryError::Variable(_))
        ));
    }

    #[test]
    fn count_subquery_should_reject_scalars() {
        let response = json_response();
        let result = run(
            &query(QueryKind::Status, Some(Subquery::Count)),
            &response,
            &VariableStore::new(),
        );
        assert!(matches!(result, Err(QueryError::Invalid(_))));
    }

    #[test]
    fn display_should_describe_kind_and_value() {
        assert_eq!(QueryResult::Number(42.0).to_string(), "number <42>");
        assert_eq!(QueryResult::String("a".to_string()).to_string(), "string <a>");
        assert_eq!(QueryResult::List(vec![QueryResult::None]).to_string(), "list(size=1)");
        assert_eq!(QueryResult::NodeSet(0).to_string(), "nodeset(size=0)");
        assert_eq!(QueryResult::None.to_string(), "none");
    }
}
