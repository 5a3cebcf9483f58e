//! # Scanner
//!
//! Code-point cursor over script text. Every read advances a [`Position`]
//! (offset, line and column, all counted in code points). Running past the end
//! of input sets a sticky [`ParseError::Eof`] that stays in place until the
//! cursor is reset to a checkpoint.

use super::error::ParseError;

/// Location of a code point in the script text.
///
/// `offset` is 0-based, `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    buffer: Vec<char>,
    position: Position,
    error: Option<ParseError>,
}

impl Scanner {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: text.chars().collect(),
            position: Position::default(),
            error: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Sticky end-of-input error, if one has been raised since the last reset.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Position to hand back to [`Scanner::reset`] when an alternative fails.
    pub fn checkpoint(&self) -> Position {
        self.position
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Moves the cursor back to a previously saved position and clears the
    /// sticky error.
    pub fn reset(&mut self, position: Position) {
        self.position = position;
        self.error = None;
    }

    pub fn left(&self) -> usize {
        self.buffer.len().saturating_sub(self.position.offset)
    }

    pub fn peek(&self) -> Option<char> {
        self.buffer.get(self.position.offset).copied()
    }

    /// Remaining input from the cursor, without consuming it.
    pub fn remaining(&self) -> &[char] {
        &self.buffer[self.position.offset.min(self.buffer.len())..]
    }

    /// Input between two offsets.
    pub fn slice(&self, from: usize, to: usize) -> String {
        let to = to.min(self.buffer.len());
        let from = from.min(to);
        self.buffer[from..to].iter().collect()
    }

    pub fn read(&mut self) -> Result<char, ParseError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        match self.peek() {
            Some(c) => {
                self.advance(c);
                Ok(c)
            }
            None => {
                let error = ParseError::Eof {
                    position: self.position,
                };
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Reads exactly `count` code points. Fails with end of input, leaving the
    /// cursor at the end, when fewer are left.
    pub fn read_n(&mut self, count: usize) -> Result<String, ParseError> {
        let mut text = String::with_capacity(count);
        for _ in 0..count {
            text.push(self.read()?);
        }
        Ok(text)
    }

    /// Reads code points while `predicate` holds. The result may be empty.
    pub fn read_while<F>(&mut self, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance(c);
            text.push(c);
        }
        text
    }

    fn advance(&mut self, c: char) {
        self.position.offset += 1;
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
    }
}

pub fn is_ascii_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

pub fn is_ascii_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub fn is_ascii_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub fn is_hex_letter(c: char) -> bool {
    matches!(c, 'a'..='f' | 'A'..='F')
}

pub fn is_template_control(c: char) -> bool {
    c == '{' || c == '}'
}

/// Combining diacritical marks, which render on top of the preceding
/// character rather than occupying a column of their own.
pub fn is_combining(c: char) -> bool {
    matches!(
        c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F
    )
}
