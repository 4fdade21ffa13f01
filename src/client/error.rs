// ABOUTME: Gateway error types shared by the session, connection manager and send pipeline
// ABOUTME: Classifies failures as transport-level (session lost) or protocol-level (frame rejected)

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use crate::frame;
use std::io;
use thiserror::Error;

/// Error type for every gateway operation
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// A frame could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// SMPP protocol error indicated by command_status field
    #[error("Protocol error: {0:?}")]
    Protocol(CommandStatus),

    /// Data validation error (invalid message length, malformed addresses, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,

    /// Unexpected PDU received (wrong response type for request)
    #[error("Unexpected PDU: expected {expected}, got {actual}")]
    UnexpectedPdu { expected: String, actual: String },

    /// Connection closed by the peer or by `close`
    #[error("Connection closed")]
    ConnectionClosed,

    /// Gateway not in correct state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Outbound queue has no free slot
    #[error("Outbound queue is full")]
    QueueFull,
}

impl SmppError {
    /// True when the error means the session itself is unusable, as opposed
    /// to a single frame or request being rejected.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SmppError::Connection(_) | SmppError::Timeout | SmppError::ConnectionClosed
        )
    }
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl From<frame::Error> for SmppError {
    fn from(err: frame::Error) -> Self {
        match err {
            frame::Error::Incomplete => SmppError::ConnectionClosed,
            frame::Error::Invalid(err) => SmppError::Codec(err),
        }
    }
}

impl From<tokio::time::error::Elapsed> for SmppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        SmppError::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(SmppError::ConnectionClosed.is_transport());
        assert!(SmppError::Timeout.is_transport());
        assert!(SmppError::Connection(io::Error::from(io::ErrorKind::BrokenPipe)).is_transport());

        assert!(!SmppError::Protocol(CommandStatus::ThrottlingError).is_transport());
        assert!(!SmppError::Codec(CodecError::Incomplete).is_transport());
        assert!(!SmppError::InvalidData("bad".into()).is_transport());
        assert!(!SmppError::QueueFull.is_transport());
    }
}
