//! Error types surfaced by the JSON and FIX parsers.

use thiserror::Error;

/// Error type handlers may raise; it is preserved as the cause of the
/// surrounding [`ParseError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A parse failure: what went wrong and the approximate input byte offset at
/// which it was detected. The offset is global across all chunks fed since
/// construction or the last `reset`, and points at the start of the offending
/// token where that can be recovered (best effort when the token began in an
/// earlier chunk).
#[derive(Debug, Error)]
#[error("{kind} at byte offset {offset}")]
pub struct ParseError {
    #[source]
    pub kind: ErrorKind,
    pub offset: u64,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The lexer rejected the input.
    #[error("lexical error: {0}")]
    Lexical(#[from] LexError),
    /// A token arrived that the grammar does not allow here.
    #[error("{0}")]
    Grammar(&'static str),
    /// An integer literal does not fit in an `i64`.
    #[error("integer overflow")]
    IntegerOverflow,
    /// A number literal does not fit in a finite `f64`.
    #[error("numeric (floating point) overflow")]
    FloatingOverflow,
    /// A handler returned an error; the cause is preserved.
    #[error("error in handler: {0}")]
    Handler(#[source] BoxError),
    /// The parser was used in a way its configuration forbids. Not sticky.
    #[error("configuration error: {0}")]
    Config(&'static str),
}

/// Lexical error classes, mirroring what the scanner can actually detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("string contains invalid UTF-8")]
    StringInvalidUtf8,
    #[error("invalid escaped character in string")]
    StringInvalidEscapedChar,
    #[error("invalid character inside string")]
    StringInvalidJsonChar,
    #[error("invalid hex character in \\u escape")]
    StringInvalidHexChar,
    #[error("invalid character")]
    InvalidChar,
    #[error("invalid keyword")]
    InvalidString,
    #[error("missing digits after decimal point")]
    MissingIntegerAfterDecimal,
    #[error("missing digits after exponent")]
    MissingIntegerAfterExponent,
    #[error("missing digits after minus sign")]
    MissingIntegerAfterMinus,
    #[error("comments are not allowed")]
    UnallowedComment,
}

/// Raised by [`JsonParserBuilder::build`](crate::JsonParserBuilder::build)
/// when the handler set is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("at least one token handler must be registered")]
    NoTokenHandlers,
    #[error("raw number handler conflicts with the typed {0} handler")]
    NumberHandlerConflict(&'static str),
}
