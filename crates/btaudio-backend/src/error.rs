//! `AdapterError` — the error type crossing the boundary from the external
//! `MediaTransport`/`VoiceTransport`/`DeviceRegistry` collaborators (§4.5, §7).

use btaudio_proto::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("device not found")]
    DeviceNotFound,

    #[error("remote endpoint {0} not found")]
    EndpointNotFound(u8),

    #[error("endpoint already locked by another session")]
    Locked,

    #[error("backend reported an error: {category}")]
    Backend { category: &'static str },

    #[error("fd handoff failed: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Every adapter failure maps onto the wire taxonomy of §7; the gateway
    /// never forwards backend-specific detail to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::DeviceNotFound | AdapterError::EndpointNotFound(_) => ErrorKind::NotFound,
            AdapterError::Locked => ErrorKind::Busy,
            AdapterError::Backend { .. } | AdapterError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
