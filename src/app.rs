//! # Application Driver
//!
//! Runs every script named on the command line with a fresh transport and
//! the initial variables, prints failures, and maps the outcome to the
//! process exit status.

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cmd_args::CommandLineArgs;
use crate::http::{HttpResponse, ReqwestClient};
use crate::parser::parse_script;
use crate::report;
use crate::runner::{RunResult, Runner, RunnerOptions};
use crate::variables::VariableStore;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    OptionsError = 1,
    ParseError = 2,
    RuntimeError = 3,
    AssertError = 4,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn of(result: &RunResult) -> Self {
        if result.has_errors() {
            ExitStatus::RuntimeError
        } else if !result.succeeded() {
            ExitStatus::AssertError
        } else {
            ExitStatus::Success
        }
    }
}

/// Name used for a script read from standard input.
const STDIN_NAME: &str = "-";

pub struct App {
    args: CommandLineArgs,
    use_color: bool,
}

impl App {
    pub fn new(args: CommandLineArgs) -> Self {
        let use_color = args.use_color();
        Self { args, use_color }
    }

    /// Runs every script. The status of the last failing script wins.
    pub fn run(&self) -> Result<ExitStatus> {
        let files: Vec<String> = if self.args.files().is_empty() {
            vec![STDIN_NAME.to_string()]
        } else {
            self.args.files().to_vec()
        };

        let variables = match self.args.variables() {
            Ok(variables) => variables,
            Err(e) => {
                eprintln!("{} {e:#}", report::ansi::red_bold("error:", self.use_color));
                return Ok(ExitStatus::OptionsError);
            }
        };

        let start = Instant::now();
        let mut status = ExitStatus::Success;
        let mut failed = 0;
        let mut last_result = None;

        for file in &files {
            let (file_status, result) = self.run_file(file, &variables)?;
            if file_status != ExitStatus::Success {
                status = file_status;
                failed += 1;
            }
            if result.is_some() {
                last_result = result;
            }
        }

        if let (Some(path), Some(result)) = (self.args.json(), &last_result) {
            report::json::write(result, path)?;
            info!("JSON report written to {}", path.display());
        }
        if self.args.test() {
            eprintln!(
                "{}",
                report::test_summary(files.len(), failed, start.elapsed(), self.use_color)
            );
        }
        Ok(status)
    }

    fn read_script(file: &str) -> Result<String> {
        if file == STDIN_NAME {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from standard input")?;
            return Ok(text);
        }
        std::fs::read_to_string(file).with_context(|| format!("Failed to read script {file}"))
    }

    fn run_file(
        &self,
        file: &str,
        variables: &VariableStore,
    ) -> Result<(ExitStatus, Option<RunResult>)> {
        if self.args.test() {
            eprintln!("{}", report::test_running(file, self.use_color));
        }
        let source = match Self::read_script(file) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{} {e:#}", report::ansi::red_bold("error:", self.use_color));
                return Ok((ExitStatus::OptionsError, None));
            }
        };

        let script = match parse_script(&source) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("{}", report::parse_error(file, &source, &e, self.use_color));
                return Ok((ExitStatus::ParseError, None));
            }
        };
        debug!("Parsed {} entries from {file}", script.entries.len());

        let client = ReqwestClient::new(self.args.client_options())
            .context("Failed to create HTTP client")?;
        let options = RunnerOptions {
            to_entry: self.args.to_entry(),
            file_root: self.args.file_root(file),
            ..Default::default()
        };
        let mut runner = Runner::new(client, variables.clone(), options);
        let result = runner.run(&script);

        for failure in report::run_failures(file, &source, &result, self.use_color) {
            eprintln!("{failure}\n");
        }
        let status = ExitStatus::of(&result);
        if self.args.test() {
            eprintln!(
                "{}",
                report::test_finished(
                    file,
                    status == ExitStatus::Success,
                    result.duration,
                    self.use_color
                )
            );
        } else if !result.has_errors() {
            if let Some(response) = result.last_response() {
                self.write_output(response)?;
            }
        }
        Ok((status, Some(result)))
    }

    fn write_output(&self, response: &HttpResponse) -> Result<()> {
        let mut out = Vec::new();
        if self.args.include() {
            out.extend_from_slice(format!("{} {}\n", response.version, response.status).as_bytes());
            for (name, value) in &response.headers {
                out.extend_from_slice(format!("{name}: {value}\n").as_bytes());
            }
            out.push(b'\n');
        }
        if self.args.client_options().compressed {
            out.extend(response.uncompressed_body().context("Failed to decode response body")?);
        } else {
            out.extend_from_slice(&response.body);
        }
        match self.args.output() {
            Some(path) => write_file(path, &out),
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&out).context("Failed to write response body")?;
                stdout.flush().context("Failed to flush standard output")
            }
        }
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("Failed to write output to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use crate::parser::Position;
    use crate::runner::{AssertResult, EntryResult, RunError};

    #[test]
    fn exit_status_should_rank_errors_above_failed_asserts() {
        let mut result = RunResult::default();
        assert_eq!(ExitStatus::of(&result), ExitStatus::Success);

        result.entries.push(EntryResult {
            asserts: vec![AssertResult {
                succeeded: false,
                message: "assert status code equals failed".to_string(),
                position: Position::default(),
            }],
            ..Default::default()
        });
        assert_eq!(ExitStatus::of(&result), ExitStatus::AssertError);

        result.entries.push(EntryResult {
            errors: vec![RunError::Runtime {
                message: HttpError::Timeout("http://x".to_string()).to_string(),
                position: Position::default(),
            }],
            ..Default::default()
        });
        assert_eq!(ExitStatus::of(&result), ExitStatus::RuntimeError);
        assert_eq!(ExitStatus::RuntimeError.code(), 3);
    }

    #[test]
    fn run_should_report_parse_errors_with_status_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.hurl");
        std::fs::write(&path, "GET http://localhost\nHTTP/1.1 abc\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let app = App::new(CommandLineArgs::parse_from(["hurlite", "--no-color", path.as_str()]));
        assert_eq!(app.run().unwrap(), ExitStatus::ParseError);
    }

    #[test]
    fn run_should_reject_malformed_variable() {
        let app = App::new(CommandLineArgs::parse_from([
            "hurlite",
            "--no-color",
            "--variable",
            "novalue",
            "api.hurl",
        ]));
        assert_eq!(app.run().unwrap(), ExitStatus::OptionsError);
    }

    #[test]
    fn run_should_flag_missing_script() {
        let app = App::new(CommandLineArgs::parse_from([
            "hurlite",
            "--no-color",
            "/nonexistent/api.hurl",
        ]));
        assert_eq!(app.run().unwrap(), ExitStatus::OptionsError);
    }

    #[test]
    fn write_output_should_include_headers_and_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let output_arg = output.to_string_lossy().to_string();
        let app = App::new(CommandLineArgs::parse_from([
            "hurlite",
            "-i",
            "-o",
            output_arg.as_str(),
        ]));
        let response = HttpResponse::new(200)
            .with_header("Content-Type", "text/plain")
            .with_body("hello");
        app.write_output(&response).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "HTTP/1.1 200\nContent-Type: text/plain\n\nhello"
        );
    }
}
