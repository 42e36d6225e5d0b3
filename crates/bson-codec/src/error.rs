//! Error types shared by the readers, writers, codecs and registry.

use std::fmt;

use bson_codec_buffers::BufferError;
use thiserror::Error;

use crate::rw::Mode;
use crate::wire::ElementType;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether a rejected state-machine operation was a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => f.write_str("read"),
            Action::Write => f.write_str("write"),
        }
    }
}

/// An operation was attempted while a reader or writer was positioned
/// somewhere it is not legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub action: Action,
    /// Name of the rejected operation, e.g. `read_boolean`.
    pub name: &'static str,
    pub current: Mode,
    /// Mode the operation would have moved into, when it pushes a frame.
    pub destination: Option<Mode>,
    pub parent: Option<Mode>,
    /// Modes in which the operation is legal.
    pub allowed: &'static [Mode],
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.destination {
            Some(destination) => write!(
                f,
                "{} cannot transition from {} to {}",
                self.name, self.current, destination
            )?,
            None => {
                write!(f, "{} can only {} while positioned on ", self.name, self.action)?;
                for (i, mode) in self.allowed.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{mode}")?;
                }
                write!(f, ", but is positioned on {}", self.current)?;
            }
        }
        if let Some(parent) = self.parent {
            write!(f, " (parent: {parent})")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransitionError {}

/// Error type for every encode/decode operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
    /// The codec was handed a wire type it does not decode.
    #[error("{codec} can only decode {expected}, but got {actual}")]
    WrongWireType {
        codec: &'static str,
        expected: String,
        actual: ElementType,
    },
    /// The codec was handed a native value of a type it does not handle.
    #[error("{codec} can only handle {expected}, but got {actual}")]
    WrongNativeType {
        codec: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("no codec found for {type_name}")]
    NoCodec { type_name: &'static str },
    #[error("{value} overflows {target}")]
    Overflow { value: String, target: &'static str },
    #[error("cannot truncate {value} to {target} unless truncation is enabled")]
    TruncationDisallowed { value: String, target: &'static str },
    #[error("cannot decode into non-settable target of type {type_name}")]
    NonSettable { type_name: &'static str },
    #[error("registry is frozen: codecs cannot be registered after the first lookup")]
    FrozenRegistry,
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("maximum nesting depth of {max} exceeded")]
    MaxDepthExceeded { max: usize },
    #[error("unexpected binary subtype 0x{actual:02x}, expected 0x{expected:02x}")]
    UnexpectedSubtype { expected: u8, actual: u8 },
    #[error("map key: {0}")]
    KeyMarshal(String),
    #[error("{0}")]
    Custom(String),
    /// Decode failure annotated with the dotted key path where it happened.
    #[error("error decoding key {path}: {source}")]
    AtKey { path: String, source: Box<Error> },
}

impl Error {
    pub fn malformed(msg: impl fmt::Display) -> Self {
        Error::Malformed(msg.to_string())
    }

    pub fn custom(msg: impl fmt::Display) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Prefixes the error's key path with `key`.
    pub fn at_key(self, key: &str) -> Self {
        match self {
            Error::AtKey { path, source } => Error::AtKey {
                path: format!("{key}.{path}"),
                source,
            },
            other => Error::AtKey {
                path: key.to_owned(),
                source: Box::new(other),
            },
        }
    }

    /// Dotted key path recorded while unwinding out of nested containers.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::AtKey { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The error with any key-path annotation stripped.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::AtKey { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<BufferError> for Error {
    fn from(err: BufferError) -> Self {
        Error::Malformed(err.to_string())
    }
}
