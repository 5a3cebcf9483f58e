use std::time::Duration;

use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};
use crate::parser::Position;
use crate::query::QueryResult;
use crate::template::InvalidVariable;

/// Failure that prevents an entry from being evaluated normally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidVariable(#[from] InvalidVariable),
    #[error("{message}")]
    Runtime { message: String, position: Position },
}

impl RunError {
    pub fn position(&self) -> Position {
        match self {
            RunError::InvalidVariable(e) => e.position,
            RunError::Runtime { position, .. } => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertResult {
    pub succeeded: bool,
    pub message: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub name: String,
    pub value: QueryResult,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryResult {
    pub request_spec: Option<HttpRequest>,
    pub http_response: Option<HttpResponse>,
    pub captures: Vec<CaptureResult>,
    pub asserts: Vec<AssertResult>,
    pub errors: Vec<RunError>,
}

impl EntryResult {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && self.asserts.iter().all(|a| a.succeeded)
    }

    pub fn failed_asserts(&self) -> impl Iterator<Item = &AssertResult> {
        self.asserts.iter().filter(|a| !a.succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunResult {
    pub duration: Duration,
    pub entries: Vec<EntryResult>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.entries.iter().all(EntryResult::succeeded)
    }

    /// Whether any entry stopped on an error rather than a failed assert.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| !e.errors.is_empty())
    }

    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.entries.iter().rev().find_map(|e| e.http_response.as_ref())
    }
}
