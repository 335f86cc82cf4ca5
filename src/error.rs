//! Error types for SNUG decoding.

use std::fmt;
use thiserror::Error;

/// Result type for SNUG decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// The failure categories a decode can produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Key does not match `[A-Za-z0-9_-]+`.
    #[error("Invalid key")]
    InvalidKey,

    /// Multi-line array never closed, or dedent reached before `]`.
    #[error("Unclosed array")]
    UnclosedArray,

    /// Stray `]` inside an inline array body.
    #[error("Unexpected \"]\"")]
    UnexpectedCloseBracket,

    /// Unterminated quoted string inside an inline array body.
    #[error("Unclosed string")]
    UnclosedString,

    /// End of input reached inside a block string.
    #[error("Unclosed block string")]
    UnclosedBlockString,

    /// Read or decode failure of an imported file.
    #[error("Cannot import {path}: {reason}")]
    Import { path: String, reason: String },

    /// `@@` applied to a file whose root is not a single array-valued key.
    #[error("Import {path} must contain exactly one key holding an array")]
    ImportShape { path: String },

    /// An import chain revisited a file that is still being decoded.
    #[error("Import cycle through {path}")]
    ImportCycle { path: String },
}

/// Error produced by [`encode`](crate::encode).
///
/// The wire format can spell an object only at key position: as a key's
/// value, or as an immediate element of a key's array (repeated-key
/// lines). An object nested deeper inside an array has no text form —
/// the decoder reaches that shape only through imports — so trees
/// carrying one are rejected instead of encoded lossily.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot encode an object nested inside an array")]
pub struct EncodeError;

/// Error produced by [`decode`](crate::decode) and friends.
///
/// Carries the failure category plus, when known, the 1-based line number
/// and the raw content of the offending line. Errors raised inside an
/// imported file surface at the outer import site, with the imported path
/// and inner reason folded into the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: ErrorKind,
    line_number: Option<usize>,
    line_content: Option<String>,
}

impl DecodeError {
    /// Create an error with no position information.
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            line_number: None,
            line_content: None,
        }
    }

    /// Create an error at a known source position.
    ///
    /// `line_number` is 1-based; `line_content` is the raw line text.
    pub(crate) fn at(kind: ErrorKind, line_number: usize, line_content: &str) -> Self {
        Self {
            kind,
            line_number: Some(line_number),
            line_content: Some(line_content.to_string()),
        }
    }

    /// The failure category.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The 1-based line number of the offending line, if known.
    pub fn line_number(&self) -> Option<usize> {
        self.line_number
    }

    /// The raw content of the offending line, if known.
    pub fn line_content(&self) -> Option<&str> {
        self.line_content.as_deref()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line_number, &self.line_content) {
            (Some(line), Some(content)) => {
                write!(f, "{} at line {}: \"{}\"", self.kind, line, content)
            }
            _ => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<ErrorKind> for DecodeError {
    fn from(kind: ErrorKind) -> Self {
        DecodeError::new(kind)
    }
}
