//! # Script Parser
//!
//! Recursive-descent parser with explicit backtracking. Each grammar rule is a
//! plain function over [`Parser`]; a rule that fails inside [`Parser::optional`]
//! (or any combinator built on it) restores the scanner and leaves its error
//! behind as a candidate. When the whole script cannot be parsed, the deepest
//! candidate is reported.

mod error;
mod predicate;
mod primitives;
mod query;
mod request;
mod response;
mod scanner;
mod xml;

pub use error::{deepest_error, ParseError};
pub use scanner::{is_combining, Position, Scanner};

use crate::ast::Script;

pub type ParseResult<T> = Result<T, ParseError>;

/// A grammar rule usable as a [`Parser::choice`] alternative.
pub type Rule<T> = fn(&mut Parser) -> ParseResult<T>;

pub struct Parser {
    scanner: Scanner,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(text: &str) -> Self {
        Self {
            scanner: Scanner::new(text),
            errors: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.scanner.position()
    }

    pub fn left(&self) -> usize {
        self.scanner.left()
    }

    pub fn peek(&self) -> Option<char> {
        self.scanner.peek()
    }

    pub fn read(&mut self) -> ParseResult<char> {
        self.scanner.read()
    }

    pub fn read_n(&mut self, count: usize) -> ParseResult<String> {
        self.scanner.read_n(count)
    }

    pub fn read_while<F>(&mut self, predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        self.scanner.read_while(predicate)
    }

    pub(crate) fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub(crate) fn reset(&mut self, position: Position) {
        self.scanner.reset(position);
    }

    /// Candidate errors collected from failed alternatives so far.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Keeps only the candidates that can still be the deepest one.
    fn record(&mut self, error: ParseError) {
        let offset = error.position().offset;
        match self.errors.first().map(|e| e.position().offset) {
            Some(deepest) if offset < deepest => {}
            Some(deepest) if offset > deepest => {
                self.errors.clear();
                self.errors.push(error);
            }
            _ => self.errors.push(error),
        }
    }

    /// Runs `rule`; on failure, rewinds and records the error.
    pub fn optional<T, F>(&mut self, rule: F) -> Option<T>
    where
        F: FnOnce(&mut Parser) -> ParseResult<T>,
    {
        let start = self.position();
        match rule(self) {
            Ok(value) => Some(value),
            Err(error) => {
                self.record(error);
                self.reset(start);
                None
            }
        }
    }

    pub fn zero_or_more<T, F>(&mut self, mut rule: F) -> Vec<T>
    where
        F: FnMut(&mut Parser) -> ParseResult<T>,
    {
        let mut nodes = Vec::new();
        while self.left() > 0 {
            let start = self.position().offset;
            match self.optional(&mut rule) {
                Some(node) => nodes.push(node),
                None => break,
            }
            // a rule matching nothing would loop forever
            if self.position().offset == start {
                break;
            }
        }
        nodes
    }

    pub fn one_or_more<T, F>(&mut self, mut rule: F) -> ParseResult<Vec<T>>
    where
        F: FnMut(&mut Parser) -> ParseResult<T>,
    {
        let first = rule(self)?;
        let mut nodes = vec![first];
        nodes.extend(self.zero_or_more(rule));
        Ok(nodes)
    }

    /// Tries each alternative in turn and returns the first match.
    pub fn choice<T>(&mut self, rules: &[Rule<T>]) -> ParseResult<T> {
        let start = self.position();
        let mut failures = Vec::new();
        for rule in rules {
            match rule(self) {
                Ok(node) => return Ok(node),
                Err(error) => {
                    failures.push(error.clone());
                    self.record(error);
                    self.reset(start);
                }
            }
        }
        match deepest_error(&failures) {
            Some(error) => Err(error.clone()),
            None => Err(ParseError::syntax("no valid choices", start)),
        }
    }

    /// Picks the error reported for a script that failed to parse.
    fn final_error(&self, terminal: ParseError) -> ParseError {
        let mut candidates = self.errors.clone();
        candidates.push(terminal);
        if let Some(error) = deepest_error(&candidates) {
            return error.clone();
        }
        let position = candidates
            .iter()
            .map(|e| e.position())
            .max_by_key(|p| p.offset)
            .unwrap_or_default();
        let rest = self.scanner.slice(position.offset, position.offset + 1);
        match rest.chars().next() {
            Some(c) => ParseError::syntax(format!("unexpected char '{}'", c.escape_debug()), position),
            None => ParseError::syntax("unexpected end of file", position),
        }
    }
}

/// Parses a whole script. Fails with a single, positioned error.
pub fn parse_script(text: &str) -> ParseResult<Script> {
    let mut parser = Parser::new(text);
    let entries = parser.zero_or_more(request::entry);
    parser.zero_or_more(primitives::line_terminator);
    if let Some(c) = parser.peek() {
        let terminal = ParseError::syntax(
            format!("unexpected char '{}'", c.escape_debug()),
            parser.position(),
        );
        let error = parser.final_error(terminal);
        tracing::debug!("parse failed at {}: {}", error.position(), error);
        return Err(error);
    }
    tracing::debug!("parsed {} entries", entries.len());
    Ok(Script { entries })
}
