use thiserror::Error;

use super::scanner::Position;

/// Error raised while parsing a script.
///
/// Two errors are equal when they have the same variant, message and position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message}")]
    Syntax { message: String, position: Position },
    #[error("end of file")]
    Eof { position: Position },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        ParseError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::Syntax { position, .. } | ParseError::Eof { position } => *position,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Selects the single deepest error among candidates.
///
/// Returns `None` when more than one error sits at the highest offset,
/// identical ones included.
pub fn deepest_error(errors: &[ParseError]) -> Option<&ParseError> {
    let max = errors.iter().map(|e| e.position().offset).max()?;
    let mut deepest = errors.iter().filter(|e| e.position().offset == max);
    match (deepest.next(), deepest.next()) {
        (Some(single), None) => Some(single),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_at(offset: usize, message: &str) -> ParseError {
        ParseError::syntax(message, Position::new(offset, 1, offset + 1))
    }

    #[test]
    fn deepest_error_should_be_ambiguous_on_tie() {
        let errors = vec![error_at(2, "a"), error_at(5, "b"), error_at(5, "c")];
        assert_eq!(deepest_error(&errors), None);
    }

    #[test]
    fn deepest_error_should_pick_highest_offset() {
        let errors = vec![error_at(2, "a"), error_at(5, "b"), error_at(7, "c")];
        assert_eq!(deepest_error(&errors), Some(&error_at(7, "c")));
    }

    #[test]
    fn deepest_error_should_count_duplicates_as_tie() {
        let errors = vec![error_at(2, "a"), error_at(5, "b"), error_at(5, "b")];
        assert_eq!(deepest_error(&errors), None);
        assert_eq!(deepest_error(&[error_at(5, "b")]), Some(&error_at(5, "b")));
        assert_eq!(deepest_error(&[]), None);
    }

    #[test]
    fn errors_should_compare_variant_message_and_position() {
        let position = Position::new(3, 1, 4);
        assert_eq!(ParseError::Eof { position }, ParseError::Eof { position });
        assert_ne!(
            ParseError::Eof { position },
            ParseError::syntax("end of file", position)
        );
        assert_ne!(error_at(3, "a"), error_at(3, "b"));
        assert_eq!(ParseError::Eof { position }.to_string(), "end of file");
    }
}
