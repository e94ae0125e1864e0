//! Wire-level errors and the posix errno taxonomy of §7.

use thiserror::Error;

/// The small error taxonomy the gateway surfaces to clients, independent of
/// which layer actually detected the problem. `ERROR` messages carry only a
/// `posix_errno`; this is the thing that knows how to produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad field, un-terminated string, unknown codec type, seid/interface mismatch.
    Invalid,
    /// Device, remote endpoint, or local endpoint not found.
    NotFound,
    /// Endpoint locked by another client.
    Busy,
    /// Send failure, fd-passing failure, or a backend adapter error of any category.
    Io,
    /// Response would overflow the suggested buffer; response is truncated.
    Oos,
}

impl ErrorKind {
    /// The `posix_errno` value placed on the wire for this kind (§7).
    pub fn posix_errno(self) -> u32 {
        match self {
            ErrorKind::Invalid => libc::EINVAL as u32,
            ErrorKind::NotFound | ErrorKind::Busy | ErrorKind::Io | ErrorKind::Oos => {
                libc::EIO as u32
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("{field} is not NUL-terminated within its fixed buffer")]
    NotNulTerminated { field: &'static str },

    #[error("declared length {declared} does not match {actual} bytes received")]
    LengthMismatch { declared: u16, actual: usize },

    #[error("message shorter than its fixed header")]
    Truncated,

    #[error("unknown message type byte {0}")]
    UnknownMessageType(u8),

    #[error("unknown message name byte {0}")]
    UnknownMessageName(u8),

    #[error("codec block type {0} is neither SBC nor MPEG12")]
    UnsupportedCodecType(u8),

    #[error("codec block would overflow the suggested response buffer")]
    BufferOverflow,

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Classify this error per the taxonomy in §7.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WireError::NotNulTerminated { .. }
            | WireError::UnknownMessageType(_)
            | WireError::UnknownMessageName(_)
            | WireError::UnsupportedCodecType(_)
            | WireError::InvalidField(_) => ErrorKind::Invalid,
            WireError::BufferOverflow => ErrorKind::Oos,
            WireError::Truncated | WireError::LengthMismatch { .. } | WireError::Io(_) => {
                ErrorKind::Io
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
