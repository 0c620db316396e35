//! Error types for WLFW operations.

use thiserror::Error;

use crate::blob::BlobError;
use crate::protocol::constants::QMI_RESULT_FAILURE;
use crate::protocol::tlv::CodecError;
use crate::transport::TransportError;

/// Numeric error codes recorded in the audit log (positive values).
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EINVAL: i32 = 22;
    pub const EBADMSG: i32 = 74;
    pub const ECONNRESET: i32 = 104;
    pub const ENOTCONN: i32 = 107;
    pub const ETIMEDOUT: i32 = 110;
    pub const EALREADY: i32 = 114;
}

#[derive(Error, Debug)]
pub enum WlfwError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Message 0x{msg_id:04X} timed out after {timeout_ms}ms")]
    Timeout { msg_id: u16, timeout_ms: u64 },

    #[error("Message 0x{msg_id:04X} rejected: result {result}, error {error}")]
    Rejected { msg_id: u16, result: u16, error: u16 },

    #[error("Indications already registered")]
    AlreadyRegistered,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("WLFW service not connected")]
    NotConnected,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No memory for segment type {mem_type}")]
    NoMemory { mem_type: u32 },

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Failed to save trace: {0}")]
    TraceSave(#[source] std::io::Error),
}

impl WlfwError {
    /// Negative numeric code as recorded in the audit log.
    pub fn errno(&self) -> i32 {
        match self {
            WlfwError::Transport(TransportError::ConnectionReset) => -errno::ECONNRESET,
            WlfwError::Transport(TransportError::NotConnected) => -errno::ENOTCONN,
            WlfwError::Transport(_) => -errno::EIO,
            WlfwError::Timeout { .. } => -errno::ETIMEDOUT,
            WlfwError::Rejected { result, .. } => -(*result as i32),
            WlfwError::AlreadyRegistered => -errno::EALREADY,
            WlfwError::Codec(_) => -errno::EBADMSG,
            WlfwError::Blob(BlobError::NotFound(_)) => -errno::ENOENT,
            WlfwError::Blob(_) => -errno::EIO,
            WlfwError::NotConnected => -errno::ENOTCONN,
            WlfwError::InvalidState(_)
            | WlfwError::InvalidArgument(_)
            | WlfwError::ProtocolMismatch(_)
            | WlfwError::TraceSave(_) => -errno::EINVAL,
            WlfwError::NoMemory { .. } => -errno::ENOMEM,
        }
    }

    /// Peer-reported detail code, `-QMI_RESULT_FAILURE` for timeouts.
    pub fn peer_error(&self) -> i32 {
        match self {
            WlfwError::Rejected { error, .. } => *error as i32,
            WlfwError::Timeout { .. } => -(QMI_RESULT_FAILURE as i32),
            _ => 0,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WlfwError::Timeout { .. })
    }

    pub fn is_connection_reset(&self) -> bool {
        matches!(self, WlfwError::Transport(TransportError::ConnectionReset))
    }
}

pub type Result<T> = std::result::Result<T, WlfwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        let timeout = WlfwError::Timeout {
            msg_id: 0x34,
            timeout_ms: 10,
        };
        assert_eq!(timeout.errno(), -errno::ETIMEDOUT);
        assert_eq!(timeout.peer_error(), -1);

        let rejected = WlfwError::Rejected {
            msg_id: 0x45,
            result: 1,
            error: 0x5A,
        };
        assert_eq!(rejected.errno(), -1);
        assert_eq!(rejected.peer_error(), 0x5A);

        let missing = WlfwError::Blob(BlobError::NotFound("caldata.bin".into()));
        assert_eq!(missing.errno(), -errno::ENOENT);
        assert_eq!(missing.peer_error(), 0);
    }

    #[test]
    fn test_reset_classification() {
        let err: WlfwError = TransportError::ConnectionReset.into();
        assert!(err.is_connection_reset());
        assert_eq!(err.errno(), -errno::ECONNRESET);
    }
}
