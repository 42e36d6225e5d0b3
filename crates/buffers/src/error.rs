//! Buffer error type.

use thiserror::Error;

/// Error type for buffer reads and writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of input at offset {offset}: needed {needed} more byte(s)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("unterminated C string starting at offset {offset}")]
    UnterminatedCString { offset: usize },
    #[error("C string contains an interior NUL byte: {0:?}")]
    InteriorNul(String),
    #[error("length {length} at offset {offset} does not fit in an i32 prefix")]
    LengthOverflow { offset: usize, length: usize },
}
