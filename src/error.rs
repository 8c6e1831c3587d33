//! Error types for XML ingestion.
//!
//! The scanner never recovers from malformed input: it surfaces the error on
//! the pull that reaches it, after every preceding well-formed event has been
//! yielded. The iterator and consumers pass errors through unchanged.

use std::fmt;

use thiserror::Error;

/// A location in the decoded UTF-8 stream.
///
/// `line` and `column` are 1-based; `column` counts bytes, not characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset into the decoded stream.
    pub offset: u64,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub(crate) fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {})",
            self.line, self.column, self.offset
        )
    }
}

/// Errors surfaced by the scanner and passed through by every consumer.
#[derive(Debug, Error)]
pub enum Error {
    /// Tokenization or structural violation: unclosed tag, mismatched end
    /// tag, duplicate attribute, invalid entity or character reference.
    #[error("malformed XML at {position}: {reason}")]
    MalformedInput { position: Position, reason: String },

    /// The XML declaration names an encoding this crate cannot decode.
    #[error("unsupported encoding declared in XML declaration: {declared:?}")]
    UnsupportedEncoding { declared: String },

    /// The underlying source failed. Never retried.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(position: Position, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            position,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let pos = Position {
            offset: 42,
            line: 3,
            column: 7,
        };
        assert_eq!(pos.to_string(), "line 3, column 7 (byte 42)");
    }

    #[test]
    fn test_malformed_display() {
        let err = Error::malformed(Position::start(), "unclosed tag");
        assert_eq!(
            err.to_string(),
            "malformed XML at line 1, column 1 (byte 0): unclosed tag"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
