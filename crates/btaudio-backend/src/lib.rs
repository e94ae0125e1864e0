//! Adapter contracts (`MediaTransport`, `VoiceTransport`, `DeviceRegistry`)
//! and the request/session bookkeeping shared between them, plus the
//! in-memory test doubles used to exercise the gateway without live
//! Bluetooth hardware (§4.5, §4.10).

pub mod adapter;
pub mod capability;
pub mod error;
pub mod fakes;
pub mod registry;

pub use adapter::{
    Completion, ConfiguredStream, DeviceHandle, DeviceRegistry, LocalEndpointId, LockHolder,
    LockMode, MediaTransport, RemoteEndpoint, RequestId, SessionHandle, StreamState,
    StreamStateCallback, SubscriptionId, VoiceTransport,
};
pub use capability::{marshal_configure_capabilities, unmarshal_configured_capability, ServiceCapability};
pub use error::{AdapterError, Result};
pub use registry::MediaSessionRegistry;
