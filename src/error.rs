//! Error taxonomy for the runtime half of the engine.
//!
//! Lexer and parser errors live beside their producers under
//! `compiler::`; this module re-exports them and defines the render,
//! cache, and source failures. Everything surfaces to callers as a
//! [`RenderError`].

pub use crate::compiler::lexer::{LexError, LexErrorKind};
pub use crate::compiler::parser::{ParseError, ParseErrorKind};

/// A cache failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// A non-replacing insert collided with an existing document.
    #[error("a document named \"{0}\" is already cached")]
    KeyExists(String),
    /// A backing-store failure, for caches with one.
    #[error("cache store failure: {0}")]
    Io(String),
}

/// A template-source failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// No source could provide the requested template.
    #[error("no template found for \"{0}\"")]
    NotFound(String),
    /// A malformed or forbidden source key.
    #[error("illegal access: {0}")]
    IllegalAccess(String),
    /// An I/O failure while reading.
    #[error("source io failure: {0}")]
    Io(String),
}

/// A render failure. The first error encountered wins; partial output is
/// never returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// The requested template does not exist anywhere it could.
    #[error("no template exists: {0}")]
    NoTemplateExists(String),
    /// A malformed or forbidden source key.
    #[error("illegal access: {0}")]
    IllegalAccess(String),
    /// A template transitively inlines itself.
    #[error("cyclical reference to \"{name}\" in chain [{}]", chain.join(" -> "))]
    CyclicalReference { name: String, chain: Vec<String> },
    /// The template body failed to tokenize.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The token stream failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The cache rejected a write.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Evaluation or serialization of a resolved document failed.
    #[error("serialize error in \"{name}\": {message}")]
    Serialize { name: String, message: String },
    /// Anything without a better classification.
    #[error("{0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclical_reference_displays_the_chain() {
        let err = RenderError::CyclicalReference {
            name: "a".to_string(),
            chain: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cyclical reference to \"a\" in chain [a -> b]"
        );
    }

    #[test]
    fn key_exists_names_the_document() {
        assert!(CacheError::KeyExists("hello".to_string())
            .to_string()
            .contains("hello"));
    }
}
