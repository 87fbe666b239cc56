//! Error types for the parser.

/// The kind of parse error that occurred.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    /// A token that makes no sense where it appeared.
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    /// A block whose closing tag never arrived.
    #[error("block '{0}' is never closed")]
    UnclosedBlock(String),
    /// A closing tag that does not match the open block.
    #[error("expected '{expected}', found closing tag '{found}'")]
    MismatchedClose { expected: String, found: String },
    /// A closing tag with no block to close.
    #[error("closing tag '{0}' has nothing to close")]
    UnexpectedClose(String),
    /// A chained continuation after an incompatible predecessor.
    #[error("'{chained}' cannot continue '{predecessor}'")]
    InvalidChain {
        chained: String,
        predecessor: String,
    },
    /// A block invocation not followed by `:`.
    #[error("block '{0}' must open a body with ':'")]
    MissingBlockBody(String),
    /// A tag that cannot open a body did.
    #[error("'{0}' cannot open a block body")]
    UnexpectedBlockBody(String),
    /// An inline splice without a single literal path.
    #[error("inline requires a single string path")]
    InvalidInline,
    /// An anonymous tag with anything but one expression.
    #[error("an anonymous tag takes a single expression")]
    BadAnonymous,
    /// Tokens ran out mid-construct.
    #[error("unexpected end of input")]
    UnexpectedEof,
}

/// A parse failure, named for the template it came from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error in \"{name}\": {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub name: String,
}

impl ParseError {
    /// Creates a parse error for the named template.
    pub fn new(kind: ParseErrorKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }
}

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;
