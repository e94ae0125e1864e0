//! Trait contracts for the two transport backends and the device registry
//! (§1 "out of scope, referenced by contract only"; §4.5).
//!
//! Every asynchronous verb here mirrors the original daemon's callback-style
//! completion: the backend is handed a boxed closure and invokes it exactly
//! once, from wherever its own readiness source fires inside the same event
//! loop. There is no `Future`/executor machinery — the gateway's event loop
//! is the only scheduler, matching §5's single-threaded, lock-free model.

use std::os::fd::RawFd;

use btaudio_proto::CodecCapability;

use crate::capability::ServiceCapability;
use crate::error::AdapterError;

/// Identifies one outstanding asynchronous backend call, scoped to the
/// adapter that issued it. Mirrors the C original's `req_id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Identifies a live stream-state subscription (§4.5 `stream_state_subscribe`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// A backend session shared across every `ClientSession` negotiating against
/// the same (source, destination) address pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionHandle(pub u64);

/// A locally-owned stream endpoint (media SEP) or the voice pseudo-device,
/// once opened and locked by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalEndpointId(pub u64);

/// A resolved device, returned by [`DeviceRegistry::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceHandle(pub u64);

/// Identifies the `ClientSession` that holds a lock, for the sole purpose of
/// excluding "locked by myself" from contention checks (§8: "reflects
/// whether any *other* live session holds a write lock"). Deliberately not
/// the same type as [`SessionHandle`]: a lock is held by one client, while a
/// `SessionHandle` may be shared by several clients negotiating the same
/// address pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockHolder(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// One endpoint discovered on the remote device (§4.4 `GetCapabilities`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub seid: u8,
    pub capability: CodecCapability,
}

/// Result of a successful `configure` on the media path (§4.4).
#[derive(Debug, Clone)]
pub struct ConfiguredStream {
    pub transport_fd: RawFd,
    pub input_mtu: u16,
    pub output_mtu: u16,
    pub negotiated: CodecCapability,
}

/// Stream-state events a subscription can observe (§4.4's state table row
/// "backend reports IDLE").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
}

pub type Completion<T> = Box<dyn FnOnce(std::result::Result<T, AdapterError>)>;
pub type StreamStateCallback = Box<dyn FnMut(StreamState)>;

/// The streaming-media transport layer (A2DP/AVDTP), consumed only through
/// this contract (§1).
pub trait MediaTransport {
    fn get_session(&mut self, source: &str, destination: &str) -> SessionHandle;
    fn release_session(&mut self, session: SessionHandle);

    fn discover(&mut self, session: SessionHandle, cb: Completion<Vec<RemoteEndpoint>>);

    fn open(&mut self, session: SessionHandle, seid: u8) -> Result<LocalEndpointId, AdapterError>;
    fn lock(&mut self, endpoint: LocalEndpointId, holder: LockHolder, mode: LockMode) -> Result<(), AdapterError>;
    fn unlock(&mut self, endpoint: LocalEndpointId);
    /// True if any *other* session currently holds a write lock on this endpoint (§8).
    fn is_write_locked_by_other(&self, endpoint: LocalEndpointId, by: LockHolder) -> bool;
    fn is_configured(&self, endpoint: LocalEndpointId) -> bool;

    /// `caps` is the two-item AVDTP service-capability sequence built by
    /// [`crate::capability::marshal_configure_capabilities`] (§4.4, §4.6),
    /// not the raw wire codec block.
    fn configure(
        &mut self,
        session: SessionHandle,
        endpoint: LocalEndpointId,
        caps: Vec<ServiceCapability>,
        cb: Completion<ConfiguredStream>,
    ) -> RequestId;

    fn resume(
        &mut self,
        session: SessionHandle,
        endpoint: LocalEndpointId,
        cb: Completion<()>,
    ) -> RequestId;

    fn suspend(
        &mut self,
        session: SessionHandle,
        endpoint: LocalEndpointId,
        cb: Completion<()>,
    ) -> RequestId;

    /// Best-effort; must be safe to call even if the completion already fired (§4.5).
    fn cancel(&mut self, session: SessionHandle, request: RequestId);

    fn stream_state_subscribe(
        &mut self,
        endpoint: LocalEndpointId,
        cb: StreamStateCallback,
    ) -> SubscriptionId;
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

/// The telephony-voice transport layer (SCO/headset profile), consumed only
/// through this contract (§1).
pub trait VoiceTransport {
    fn lock(&mut self, device: DeviceHandle, holder: LockHolder, mode: LockMode) -> Result<(), AdapterError>;
    fn unlock(&mut self, device: DeviceHandle);
    fn is_write_locked_by_other(&self, device: DeviceHandle, by: LockHolder) -> bool;

    fn configure(&mut self, device: DeviceHandle, cb: Completion<()>) -> RequestId;
    fn request(&mut self, device: DeviceHandle, cb: Completion<RawFd>) -> RequestId;
    fn suspend(&mut self, device: DeviceHandle, cb: Completion<()>) -> RequestId;
    fn cancel(&mut self, device: DeviceHandle, request: RequestId);
}

/// Lookup of devices by addressing tuple (§1).
pub trait DeviceRegistry {
    fn find(
        &self,
        object: &str,
        source: &str,
        destination: &str,
        interface: Option<&str>,
    ) -> Result<DeviceHandle, AdapterError>;

    /// Inference order of §3 when the client leaves the interface unspecified.
    fn active_media_sink(&self, device: DeviceHandle) -> bool;
    fn active_headset(&self, device: DeviceHandle) -> bool;
    fn available_sink(&self, device: DeviceHandle) -> bool;
    fn available_headset(&self, device: DeviceHandle) -> bool;
}
