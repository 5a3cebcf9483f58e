//! # hurlite - Plain-Text HTTP Scripts
//!
//! Runs scripts of HTTP requests, each optionally followed by an expected
//! response, captures and assertions. Values captured from one response are
//! available as `{{name}}` templates in every later request.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  Script  ┌──────────┐  HttpRequest  ┌───────────┐
//! │  parser  │─────────►│  runner  │──────────────►│   http    │
//! │          │          │          │◄──────────────│ (reqwest) │
//! └──────────┘          └──────────┘  HttpResponse └───────────┘
//!                        │   ▲    │
//!              template ─┘   │    └─► query ─► predicate
//!                            │
//!                        variables            RunResult ─► report
//! ```
//!
//! The parser turns text into the [`ast`]; the [`runner`] renders each
//! request against the [`variables`], sends it through an
//! [`http::HttpClient`], then evaluates captures and asserts with the
//! [`query`] and [`predicate`] engines.

pub mod app;
pub mod ast;
pub mod cmd_args;
pub mod config;
pub mod http;
pub mod parser;
pub mod predicate;
pub mod query;
pub mod report;
pub mod runner;
pub mod template;
pub mod variables;

pub use app::{App, ExitStatus};
pub use parser::parse_script;
pub use runner::{RunResult, Runner, RunnerOptions};
pub use variables::VariableStore;
