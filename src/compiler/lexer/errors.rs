//! Error types for the lexer.
//!
//! A [`LexError`] carries the failure kind, the source position, and the
//! tokens lexed so far, so callers can show where a template went wrong.

use crate::compiler::raw::Position;
use crate::compiler::syntax::Token;

/// The kind of lexer error that occurred.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexErrorKind {
    /// A failure with no more specific classification.
    #[error("{0}")]
    Unknown(String),
    /// A character that cannot start any parameter token.
    #[error("invalid parameter token: '{0}'")]
    InvalidParameterToken(char),
    /// An operator spelling that does not exist, or one used with
    /// forbidden adjacent whitespace.
    #[error("invalid operator: '{0}'")]
    InvalidOperator(String),
    /// A string literal interrupted by a newline or end of input.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// End of input inside a parameter list.
    #[error("unclosed parameter list at end of input")]
    OpenParameters,
    /// End of input inside a tag comment.
    #[error("unclosed tag comment")]
    OpenComment,
}

/// A lexer failure with position and partial-progress diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("lex error in \"{name}\" at {position}: {kind}")]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// The template name being lexed.
    pub name: String,
    /// Where the lexer stopped.
    pub position: Position,
    /// The tokens successfully lexed before the failure.
    pub tokens: Vec<Token>,
}

impl LexError {
    /// Creates a lexer error at `position`, capturing the partial stream.
    pub fn new(kind: LexErrorKind, name: &str, position: Position, tokens: &[Token]) -> Self {
        Self {
            kind,
            name: name.to_string(),
            position,
            tokens: tokens.to_vec(),
        }
    }
}

// The partial token stream is diagnostic payload, not identity.
impl PartialEq for LexError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.position == other.position
    }
}

/// Result type for lexer operations.
pub type LexResult<T> = Result<T, LexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name_position_and_kind() {
        let err = LexError::new(
            LexErrorKind::UnterminatedString,
            "greeting",
            Position {
                line: 3,
                column: 7,
                offset: 40,
            },
            &[],
        );
        let msg = err.to_string();
        assert!(msg.contains("greeting"));
        assert!(msg.contains("3:7"));
        assert!(msg.contains("unterminated string"));
    }

    #[test]
    fn invalid_operator_reports_spelling() {
        let kind = LexErrorKind::InvalidOperator("?".to_string());
        assert!(kind.to_string().contains('?'));
    }
}
