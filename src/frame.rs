//! Frame-level parse outcome used while scanning the read buffer.
//!
//! The `Frame` enum itself lives in the codec module and is re-exported here.

pub use crate::codec::{CodecError, Frame, PduRegistry};

/// Result of checking the read buffer for a complete frame
#[derive(Debug)]
pub enum Error {
    /// Not enough data is available to parse a message
    Incomplete,
    /// The buffered bytes can never form a valid frame
    Invalid(CodecError),
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Incomplete => Error::Incomplete,
            other => Error::Invalid(other),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Incomplete => write!(f, "Incomplete frame"),
            Error::Invalid(err) => write!(f, "Frame error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Invalid(err) => Some(err),
            _ => None,
        }
    }
}
