//! `GatewayError` — the crate's own error enum, with conversions from the
//! lower layers it composes (§7: "`GatewayError` carries a `From` conversion
//! from the lower-layer errors and is the only error type that knows how to
//! map itself to a `GatewayErrorKind`/`posix_errno` pair for the wire").

use btaudio_backend::AdapterError;
use btaudio_proto::{ErrorKind, WireError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("request out of order for the session's current state")]
    OutOfOrder,

    #[error("seid {requested} does not match the session's opened seid {opened}")]
    SeidMismatch { requested: u8, opened: u8 },

    #[error("request transport does not match the session's established service kind")]
    TransportMismatch,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to bind rendezvous socket at {path}: {source}")]
    Bind {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Map to the wire taxonomy of §7.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Wire(e) => e.kind(),
            GatewayError::Adapter(e) => e.kind(),
            GatewayError::OutOfOrder
            | GatewayError::SeidMismatch { .. }
            | GatewayError::TransportMismatch => ErrorKind::Invalid,
            GatewayError::Io(_) | GatewayError::Bind { .. } | GatewayError::Config(_) => {
                ErrorKind::Io
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
