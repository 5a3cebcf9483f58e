//! # Reporting
//!
//! Human-facing output of a run: errors located in the script source with a
//! caret under the faulty character, the `--test` progress lines, and the
//! JSON report in [`json`].

pub mod ansi;
pub mod json;

use std::fmt::Write;
use std::time::Duration;

use crate::parser::{is_combining, ParseError, Position};
use crate::runner::RunResult;

/// Line of `source` at 1-based `line`, without its line terminator.
fn source_line(source: &str, line: usize) -> &str {
    source
        .split('\n')
        .nth(line.saturating_sub(1))
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or("")
}

/// Spaces up to `column`, keeping tabs so the caret aligns with the source
/// line. Combining marks take no room on screen and are skipped.
fn caret_prefix(line: &str, column: usize) -> String {
    line.chars()
        .take(column.saturating_sub(1))
        .filter(|c| !is_combining(*c))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect()
}

/// Formats one error the way compilers do:
///
/// ```text
/// api.hurl:3:8: error: undefined variable host
///   3 | GET {{host}}/users
///     |     ^
/// ```
pub fn error_at(
    filename: &str,
    source: &str,
    position: Position,
    message: &str,
    use_color: bool,
) -> String {
    let gutter = position.line.to_string();
    let blank = " ".repeat(gutter.len());
    let line = source_line(source, position.line);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} {}",
        ansi::bold(
            &format!("{filename}:{}:{}", position.line, position.column),
            use_color
        ),
        ansi::red_bold("error:", use_color),
        message
    );
    let _ = writeln!(out, "{} {line}", ansi::blue_bold(&format!("{gutter} |"), use_color));
    let _ = write!(
        out,
        "{} {}{}",
        ansi::blue_bold(&format!("{blank} |"), use_color),
        caret_prefix(line, position.column),
        ansi::red_bold("^", use_color)
    );
    out
}

pub fn parse_error(filename: &str, source: &str, error: &ParseError, use_color: bool) -> String {
    error_at(filename, source, error.position(), &error.message(), use_color)
}

/// Every error and failed assert of a run, in execution order.
pub fn run_failures(filename: &str, source: &str, result: &RunResult, use_color: bool) -> Vec<String> {
    let mut failures = Vec::new();
    for entry in &result.entries {
        for error in &entry.errors {
            failures.push(error_at(
                filename,
                source,
                error.position(),
                &error.to_string(),
                use_color,
            ));
        }
        for assert in entry.failed_asserts() {
            failures.push(error_at(
                filename,
                source,
                assert.position,
                &assert.message,
                use_color,
            ));
        }
    }
    failures
}

/// Progress line printed before a file runs in `--test` mode.
pub fn test_running(filename: &str, use_color: bool) -> String {
    format!("{}: {}", ansi::bold(filename, use_color), ansi::cyan("RUNNING", use_color))
}

pub fn test_finished(filename: &str, succeeded: bool, duration: Duration, use_color: bool) -> String {
    let state = if succeeded {
        ansi::green_bold("SUCCESS", use_color)
    } else {
        ansi::red_bold("FAILED", use_color)
    };
    format!(
        "{}: {state} {}",
        ansi::bold(filename, use_color),
        ansi::dim(&format!("in {} ms", duration.as_millis()), use_color)
    )
}

/// Summary printed after every file ran in `--test` mode.
pub fn test_summary(total: usize, failed: usize, duration: Duration, use_color: bool) -> String {
    let succeeded = total - failed;
    let percent = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        }
    };
    format!(
        "{}\nExecuted files:  {total}\nSucceeded files: {succeeded} ({:.1}%)\nFailed files:    {} ({:.1}%)\nDuration:        {} ms",
        ansi::yellow("--------------------------------------------------------------------------------", use_color),
        percent(succeeded),
        failed,
        percent(failed),
        duration.as_millis()
    )
}
