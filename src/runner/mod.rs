//! # Run Orchestrator
//!
//! Executes the entries of a script in order. For each entry the runner
//! applies the comment commands, renders the request, sends it, writes the
//! captures into the variable store and finally evaluates the checks.
//!
//! A request that can not be rendered or sent stops the run. Failed asserts
//! are recorded and the run goes on.

mod check;
mod command;
mod request;
mod result;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::ast::{Entry, Script};
use crate::http::HttpClient;
use crate::query::{self, Evaluators, Exchange, QueryError};
use crate::variables::VariableStore;

pub use command::Command;
pub use request::{body_bytes, render_request};
pub use result::{AssertResult, CaptureResult, EntryResult, RunError, RunResult};

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Stop after this 1-based entry.
    pub to_entry: Option<usize>,
    /// Directory that `file,` bodies and multipart files are read from.
    pub file_root: PathBuf,
    /// Checked before each entry; set it to stop the run early.
    pub cancel: Arc<AtomicBool>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            to_entry: None,
            file_root: PathBuf::from("."),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Runs one script. The runner owns the variable store and the transport for
/// the whole run.
pub struct Runner<C: HttpClient> {
    client: C,
    variables: VariableStore,
    evaluators: Evaluators,
    options: RunnerOptions,
}

impl<C: HttpClient> Runner<C> {
    pub fn new(client: C, variables: VariableStore, options: RunnerOptions) -> Self {
        Self {
            client,
            variables,
            evaluators: Evaluators::default(),
            options,
        }
    }

    pub fn with_evaluators(mut self, evaluators: Evaluators) -> Self {
        self.evaluators = evaluators;
        self
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn run(&mut self, script: &Script) -> RunResult {
        let start = Instant::now();
        let mut entries = Vec::new();

        for (index, entry) in script.entries.iter().enumerate() {
            let number = index + 1;
            if self.options.cancel.load(Ordering::SeqCst) {
                tracing::info!("Run cancelled before entry {number}");
                break;
            }
            tracing::info!("Executing entry {number}");

            let (result, stop) = self.run_entry(entry);
            entries.push(result);
            if stop {
                tracing::warn!("Stopping run after entry {number}");
                break;
            }
            if self.options.to_entry == Some(number) {
                tracing::debug!("Reached entry {number}, stopping");
                break;
            }
        }

        let result = RunResult {
            duration: start.elapsed(),
            entries,
        };
        tracing::info!(
            "Run {} in {} ms",
            if result.succeeded() { "succeeded" } else { "failed" },
            result.duration.as_millis()
        );
        result
    }

    /// Returns the entry result and whether the run must stop.
    fn run_entry(&mut self, entry: &Entry) -> (EntryResult, bool) {
        let mut result = EntryResult::default();

        for comment in &entry.request.comments {
            if let Some(command) = Command::parse(&comment.value) {
                tracing::debug!("Running command {command}");
                command.apply(&mut self.client);
            }
        }

        let request = match render_request(&entry.request, &self.variables, &self.options.file_root) {
            Ok(request) => request,
            Err(e) => {
                result.errors.push(e);
                return (result, true);
            }
        };
        tracing::debug!("{} {}", request.method, request.url);

        let response = match self.client.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                result.request_spec = Some(request);
                result.errors.push(RunError::Runtime {
                    message: e.to_string(),
                    position: entry.request.position,
                });
                return (result, true);
            }
        };
        result.request_spec = Some(request);

        // captures first, so that asserts of this entry see the new values
        for capture in entry.captures() {
            let value = {
                let exchange = Exchange {
                    response: &response,
                    variables: &self.variables,
                    evaluators: &self.evaluators,
                };
                query::eval(&capture.query, &exchange)
            };
            match value {
                Ok(value) => {
                    if !self.variables.insert_result(&capture.name, value.clone()) {
                        tracing::warn!("Capture {} found nothing, variable not set", capture.name);
                    }
                    result.captures.push(CaptureResult {
                        name: capture.name.clone(),
                        value,
                        position: capture.position,
                    });
                }
                Err(QueryError::Variable(e)) => result.errors.push(e.into()),
                Err(QueryError::Invalid(message)) => result.errors.push(RunError::Runtime {
                    message: format!("capture {} failed, {message}", capture.name),
                    position: capture.position,
                }),
            }
        }

        let exchange = Exchange {
            response: &response,
            variables: &self.variables,
            evaluators: &self.evaluators,
        };
        let mut checks = Vec::new();
        if let Some(expected) = &entry.response {
            checks.push(Ok(check::check_version(&expected.version, &response)));
            checks.push(Ok(check::check_status(&expected.status, &response)));
            for header in &expected.headers {
                checks.push(check::check_header(header, &exchange));
            }
            if let Some(body) = &expected.body {
                checks.push(check::check_body(body, &exchange, &self.options.file_root));
            }
        }
        for assert in entry.asserts() {
            checks.push(check::check_assert(assert, &exchange));
        }
        for check in checks {
            match check {
                Ok(assert) => {
                    if !assert.succeeded {
                        tracing::debug!("{}", assert.message);
                    }
                    result.asserts.push(assert);
                }
                Err(e) => result.errors.push(e),
            }
        }

        result.http_response = Some(response);
        (result, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Cookie, HttpError, HttpRequest, HttpResponse};
    use crate::parser::parse_script;
    use crate::variables::Variable;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent.
    #[derive(Default)]
    struct StubClient {
        responses: VecDeque<Result<HttpResponse, HttpError>>,
        requests: Vec<HttpRequest>,
        cookies: Vec<Cookie>,
        clears: usize,
    }

    impl StubClient {
        fn with(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: responses.into(),
                ..Default::default()
            }
        }
    }

    impl HttpClient for StubClient {
        fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
            self.requests.push(request.clone());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200)))
        }

        fn add_cookie(&mut self, cookie: Cookie) {
            self.cookies.push(cookie);
        }

        fn clear_cookie_storage(&mut self) {
            self.clears += 1;
            self.cookies.clear();
        }
    }

    fn run(text: &str, client: StubClient, options: RunnerOptions) -> (RunResult, Runner<StubClient>) {
        let script = parse_script(text).unwrap();
        let mut runner = Runner::new(client, VariableStore::new(), options);
        let result = runner.run(&script);
        (result, runner)
    }

    #[test]
    fn run_should_thread_captures_into_later_entries() {
        let client = StubClient::with(vec![
            Ok(HttpResponse::new(200).with_header("X-Id", "42")),
            Ok(HttpResponse::new(200).with_header("X-Echo", "42")),
        ]);
        let (result, runner) = run(
            "GET http://x\n[Captures]\nid: header \"X-Id\"\nGET http://y/{{id}}\nHTTP/1.1 200\n[Asserts]\nheader \"X-Echo\" equals \"{{id}}\"\n",
            client,
            RunnerOptions::default(),
        );
        assert!(result.succeeded());
        assert_eq!(result.entries.len(), 2);
        assert_eq!(runner.client().requests[1].url, "http://y/42");
        assert_eq!(runner.variables().get("id"), Some(&Variable::String("42".to_string())));
        assert_eq!(
            result.entries[1].asserts.last().map(|a| a.message.as_str()),
            Some("assert header equals succeeded\n  actual:   string <42>\n  expected: equals string <42>")
        );
    }

    #[test]
    fn run_should_capture_before_asserting() {
        let client = StubClient::with(vec![Ok(HttpResponse::new(200).with_header("X-Id", "new"))]);
        let script = parse_script(
            "GET http://x\nHTTP/1.1 200\n[Captures]\nid: header \"X-Id\"\n[Asserts]\nvariable \"id\" equals \"new\"\n",
        )
        .unwrap();
        let mut runner = Runner::new(
            client,
            VariableStore::from_strings([("id", "old")]),
            RunnerOptions::default(),
        );
        let result = runner.run(&script);
        assert!(result.succeeded());
    }

    #[test]
    fn run_should_continue_after_failed_assert() {
        let client = StubClient::with(vec![
            Ok(HttpResponse::new(500)),
            Ok(HttpResponse::new(200)),
        ]);
        let (result, _) = run(
            "GET http://x\nHTTP/1.1 200\nGET http://y\nHTTP/1.1 200\n",
            client,
            RunnerOptions::default(),
        );
        assert!(!result.succeeded());
        assert!(!result.has_errors());
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries[1].succeeded());
    }

    #[test]
    fn run_should_stop_on_render_failure() {
        let (result, runner) = run(
            "GET http://x/{{missing}}\nGET http://y\n",
            StubClient::default(),
            RunnerOptions::default(),
        );
        assert_eq!(result.entries.len(), 1);
        assert!(runner.client().requests.is_empty());
        assert!(matches!(
            &result.entries[0].errors[..],
            [RunError::InvalidVariable(e)] if e.name == "missing"
        ));
    }

    #[test]
    fn run_should_stop_on_transport_failure() {
        let client = StubClient::with(vec![Err(HttpError::Timeout("http://x".to_string()))]);
        let (result, runner) = run("GET http://x\nGET http://y\n", client, RunnerOptions::default());
        assert_eq!(result.entries.len(), 1);
        assert_eq!(runner.client().requests.len(), 1);
        assert!(result.entries[0].request_spec.is_some());
        assert_eq!(
            result.entries[0].errors[0],
            RunError::Runtime {
                message: "request to <http://x> timed out".to_string(),
                position: crate::parser::Position::new(0, 1, 1),
            }
        );
    }

    #[test]
    fn run_should_honor_to_entry_and_cancel() {
        let options = RunnerOptions {
            to_entry: Some(2),
            ..Default::default()
        };
        let (result, _) = run("GET http://a\nGET http://b\nGET http://c\n", StubClient::default(), options);
        assert_eq!(result.entries.len(), 2);

        let options = RunnerOptions::default();
        options.cancel.store(true, Ordering::SeqCst);
        let (result, _) = run("GET http://a\n", StubClient::default(), options);
        assert!(result.entries.is_empty());
        assert!(result.succeeded());
    }

    #[test]
    fn run_should_apply_cookie_commands_before_request() {
        let (_, runner) = run(
            "# @cookie_storage_clear\n# @cookie_storage_set:localhost FALSE / FALSE 0 id 42\nGET http://localhost\n",
            StubClient::default(),
            RunnerOptions::default(),
        );
        assert_eq!(runner.client().clears, 1);
        assert_eq!(runner.client().cookies.len(), 1);
        assert_eq!(runner.client().cookies[0].expires, None);
    }

    #[test]
    fn run_should_report_query_errors_as_failed_asserts() {
        let client = StubClient::with(vec![Ok(HttpResponse::new(200).with_body("not json"))]);
        let (result, _) = run(
            "GET http://x\nHTTP/1.1 200\n[Asserts]\njsonpath \"$.id\" not exists\n",
            client,
            RunnerOptions::default(),
        );
        let assert = result.entries[0].asserts.last().unwrap();
        assert!(!assert.succeeded);
        assert!(assert.message.starts_with("assert jsonpath not exists failed, "));
    }
}
