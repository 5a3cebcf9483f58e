//! Response checks: the implicit ones from the expected response line,
//! headers and body, and the explicit `[Asserts]`.

use std::path::Path;

use crate::ast::{Assert, Body, KeyValue, Status, StatusValue, Version, VersionValue};
use crate::http::HttpResponse;
use crate::predicate;
use crate::query::{self, Exchange, QueryError};
use crate::template;

use super::request::body_bytes;
use super::{AssertResult, RunError};

const SHORTEN_AT: usize = 64;

fn shorten(text: &str) -> String {
    if text.chars().count() <= SHORTEN_AT {
        return text.to_string();
    }
    let head: String = text.chars().take(SHORTEN_AT).collect();
    format!("{head}...")
}

fn failure(subject: &str, actual: &str, expected: &str) -> String {
    format!("assert {subject} equals failed\n  actual:   {actual}\n  expected: {expected}")
}

pub(super) fn check_version(version: &Version, response: &HttpResponse) -> AssertResult {
    let actual = response.version.as_str();
    let (succeeded, message) = match version.value {
        VersionValue::Any => (true, "assert http version succeeded".to_string()),
        expected if expected.as_str() == actual => (
            true,
            format!("assert http version equals {actual} succeeded"),
        ),
        expected => (false, failure("http version", actual, expected.as_str())),
    };
    AssertResult {
        succeeded,
        message,
        position: version.position,
    }
}

pub(super) fn check_status(status: &Status, response: &HttpResponse) -> AssertResult {
    let (succeeded, message) = match status.value {
        StatusValue::Any => (true, "assert status code equals * succeeded".to_string()),
        StatusValue::Code(code) if code == response.status => (
            true,
            format!("assert status code equals {code} succeeded"),
        ),
        StatusValue::Code(code) => (
            false,
            failure("status code", &response.status.to_string(), &code.to_string()),
        ),
    };
    AssertResult {
        succeeded,
        message,
        position: status.position,
    }
}

/// The rendered header value must equal one of the received values.
pub(super) fn check_header(
    header: &KeyValue,
    exchange: &Exchange,
) -> Result<AssertResult, RunError> {
    let expected = template::render(
        &header.value.value,
        exchange.variables,
        header.value.position,
    )?;
    let received = exchange.response.header_values(&header.key);
    let (succeeded, message) = if received.iter().any(|v| *v == expected) {
        (true, format!("assert header {} succeeded", header.key))
    } else {
        (
            false,
            failure(&format!("header {}", header.key), &received.join(", "), &expected),
        )
    };
    Ok(AssertResult {
        succeeded,
        message,
        position: header.position,
    })
}

/// The received body, after content decoding, must equal the expected bytes.
pub(super) fn check_body(
    body: &Body,
    exchange: &Exchange,
    file_root: &Path,
) -> Result<AssertResult, RunError> {
    let expected = body_bytes(&body.bytes, exchange.variables, file_root)?;
    let actual = exchange
        .response
        .uncompressed_body()
        .map_err(|e| RunError::Runtime {
            message: e.to_string(),
            position: body.position,
        })?;
    let (succeeded, message) = if actual == expected {
        (true, "assert body equals succeeded".to_string())
    } else {
        (
            false,
            failure(
                "body",
                &shorten(&String::from_utf8_lossy(&actual)),
                &shorten(&String::from_utf8_lossy(&expected)),
            ),
        )
    };
    Ok(AssertResult {
        succeeded,
        message,
        position: body.position,
    })
}

pub(super) fn check_assert(assert: &Assert, exchange: &Exchange) -> Result<AssertResult, RunError> {
    let not = if assert.predicate.not { "not " } else { "" };
    let subject = format!(
        "assert {} {not}{}",
        assert.query.kind.name(),
        assert.predicate.func.name()
    );
    let actual = match query::eval(&assert.query, exchange) {
        Ok(actual) => actual,
        Err(QueryError::Variable(e)) => return Err(e.into()),
        Err(QueryError::Invalid(message)) => {
            return Ok(AssertResult {
                succeeded: false,
                message: format!("{subject} failed, {message}"),
                position: assert.position,
            })
        }
    };
    let result = predicate::evaluate(
        &assert.predicate.func,
        assert.predicate.not,
        &actual,
        exchange.variables,
    )?;
    let state = if result.succeeded { "succeeded" } else { "failed" };
    Ok(AssertResult {
        succeeded: result.succeeded,
        message: format!(
            "{subject} {state}\n  actual:   {}\n  expected: {}",
            result.actual, result.expected
        ),
        position: assert.position,
    })
}
