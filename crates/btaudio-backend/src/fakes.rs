//! In-memory test doubles for [`crate::adapter`]'s traits (§4.10).
//!
//! By default every async verb resolves synchronously, from inside the call
//! that issued it — convenient for exercising the happy path without an
//! event loop. Set `auto_resolve = false` to instead queue completions and
//! drive them explicitly with `resolve_*`/`force_idle`, which is how tests
//! exercise cancellation and backend-initiated teardown.

use std::collections::HashMap;
use std::os::fd::RawFd;

use crate::adapter::{
    Completion, ConfiguredStream, DeviceHandle, DeviceRegistry, LocalEndpointId, LockHolder,
    LockMode, MediaTransport, RemoteEndpoint, RequestId, SessionHandle, StreamState,
    StreamStateCallback, SubscriptionId, VoiceTransport,
};
use crate::capability::{unmarshal_configured_capability, ServiceCapability};
use crate::error::AdapterError;
use btaudio_proto::CodecCapability;

enum PendingMediaCall {
    Discover(Completion<Vec<RemoteEndpoint>>),
    Configure(Completion<ConfiguredStream>),
    Resume(Completion<()>),
    Suspend(Completion<()>),
}

#[derive(Default)]
struct EndpointState {
    locked_by: Option<(LockHolder, LockMode)>,
    configured: bool,
}

pub struct FakeMediaTransport {
    pub auto_resolve: bool,
    pub remote_endpoints: Vec<RemoteEndpoint>,
    pub next_stream_fd: RawFd,
    sessions: HashMap<SessionHandle, (String, String)>,
    endpoints: HashMap<LocalEndpointId, EndpointState>,
    /// Local endpoints are a hardware-level concept shared across every
    /// remote device, so `open` must return the same id for a given `seid`
    /// regardless of which session or media session asked (§8's lock
    /// visibility property depends on this).
    endpoint_by_seid: HashMap<u8, LocalEndpointId>,
    subscriptions: HashMap<SubscriptionId, (LocalEndpointId, StreamStateCallback)>,
    pending: HashMap<RequestId, PendingMediaCall>,
    next_session: u64,
    next_endpoint: u64,
    next_request: u64,
    next_sub: u64,
}

impl Default for FakeMediaTransport {
    fn default() -> Self {
        FakeMediaTransport {
            auto_resolve: true,
            remote_endpoints: Vec::new(),
            next_stream_fd: 100,
            sessions: HashMap::new(),
            endpoints: HashMap::new(),
            endpoint_by_seid: HashMap::new(),
            subscriptions: HashMap::new(),
            pending: HashMap::new(),
            next_session: 1,
            next_endpoint: 1,
            next_request: 1,
            next_sub: 1,
        }
    }
}

impl FakeMediaTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }

    pub fn resolve_configure(&mut self, request: RequestId, result: Result<ConfiguredStream, AdapterError>) {
        if let Some(PendingMediaCall::Configure(cb)) = self.pending.remove(&request) {
            cb(result);
        }
    }

    pub fn resolve_resume(&mut self, request: RequestId, result: Result<(), AdapterError>) {
        if let Some(PendingMediaCall::Resume(cb)) = self.pending.remove(&request) {
            cb(result);
        }
    }

    pub fn resolve_suspend(&mut self, request: RequestId, result: Result<(), AdapterError>) {
        if let Some(PendingMediaCall::Suspend(cb)) = self.pending.remove(&request) {
            cb(result);
        }
    }

    pub fn has_pending(&self, request: RequestId) -> bool {
        self.pending.contains_key(&request)
    }

    /// Simulate the remote tearing down a stream; fires every subscription
    /// registered for `endpoint`.
    pub fn force_idle(&mut self, endpoint: LocalEndpointId) {
        for (ep, cb) in self.subscriptions.values_mut() {
            if *ep == endpoint {
                cb(StreamState::Idle);
            }
        }
    }
}

impl MediaTransport for FakeMediaTransport {
    fn get_session(&mut self, source: &str, destination: &str) -> SessionHandle {
        let handle = SessionHandle(self.next_session);
        self.next_session += 1;
        self.sessions
            .insert(handle, (source.to_owned(), destination.to_owned()));
        handle
    }

    fn release_session(&mut self, session: SessionHandle) {
        self.sessions.remove(&session);
    }

    fn discover(&mut self, _session: SessionHandle, cb: Completion<Vec<RemoteEndpoint>>) {
        if self.auto_resolve {
            cb(Ok(self.remote_endpoints.clone()));
        } else {
            let request = self.alloc_request();
            self.pending.insert(request, PendingMediaCall::Discover(cb));
        }
    }

    fn open(&mut self, _session: SessionHandle, seid: u8) -> Result<LocalEndpointId, AdapterError> {
        if let Some(&id) = self.endpoint_by_seid.get(&seid) {
            return Ok(id);
        }
        if !self.remote_endpoints.iter().any(|e| e.seid == seid) {
            return Err(AdapterError::EndpointNotFound(seid));
        }
        let id = LocalEndpointId(self.next_endpoint);
        self.next_endpoint += 1;
        self.endpoints.insert(id, EndpointState::default());
        self.endpoint_by_seid.insert(seid, id);
        Ok(id)
    }

    fn lock(&mut self, endpoint: LocalEndpointId, holder: LockHolder, mode: LockMode) -> Result<(), AdapterError> {
        let state = self.endpoints.entry(endpoint).or_default();
        if state.locked_by.is_some() {
            return Err(AdapterError::Locked);
        }
        state.locked_by = Some((holder, mode));
        Ok(())
    }

    fn unlock(&mut self, endpoint: LocalEndpointId) {
        if let Some(state) = self.endpoints.get_mut(&endpoint) {
            state.locked_by = None;
        }
    }

    fn is_write_locked_by_other(&self, endpoint: LocalEndpointId, by: LockHolder) -> bool {
        matches!(
            self.endpoints.get(&endpoint).and_then(|s| s.locked_by),
            Some((holder, LockMode::Write)) if holder != by
        )
    }

    fn is_configured(&self, endpoint: LocalEndpointId) -> bool {
        self.endpoints
            .get(&endpoint)
            .map(|s| s.configured)
            .unwrap_or(false)
    }

    fn configure(
        &mut self,
        _session: SessionHandle,
        endpoint: LocalEndpointId,
        caps: Vec<ServiceCapability>,
        cb: Completion<ConfiguredStream>,
    ) -> RequestId {
        let request = self.alloc_request();
        let negotiated = unmarshal_configured_capability(&caps)
            .unwrap_or(CodecCapability::Opaque { codec_type: 0xFF, payload: Vec::new() });
        if self.auto_resolve {
            if let Some(state) = self.endpoints.get_mut(&endpoint) {
                state.configured = true;
            }
            let fd = self.next_stream_fd;
            self.next_stream_fd += 1;
            cb(Ok(ConfiguredStream {
                transport_fd: fd,
                input_mtu: 672,
                output_mtu: 672,
                negotiated,
            }));
        } else {
            self.pending.insert(request, PendingMediaCall::Configure(cb));
        }
        request
    }

    fn resume(
        &mut self,
        _session: SessionHandle,
        _endpoint: LocalEndpointId,
        cb: Completion<()>,
    ) -> RequestId {
        let request = self.alloc_request();
        if self.auto_resolve {
            cb(Ok(()));
        } else {
            self.pending.insert(request, PendingMediaCall::Resume(cb));
        }
        request
    }

    fn suspend(
        &mut self,
        _session: SessionHandle,
        _endpoint: LocalEndpointId,
        cb: Completion<()>,
    ) -> RequestId {
        let request = self.alloc_request();
        if self.auto_resolve {
            cb(Ok(()));
        } else {
            self.pending.insert(request, PendingMediaCall::Suspend(cb));
        }
        request
    }

    fn cancel(&mut self, _session: SessionHandle, request: RequestId) {
        // Best-effort and idempotent: dropping a missing/already-resolved
        // entry is a no-op, matching the real adapters' contract (§4.5).
        self.pending.remove(&request);
    }

    fn stream_state_subscribe(
        &mut self,
        endpoint: LocalEndpointId,
        cb: StreamStateCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub);
        self.next_sub += 1;
        self.subscriptions.insert(id, (endpoint, cb));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription);
    }
}

enum PendingVoiceCall {
    Configure(Completion<()>),
    Request(Completion<RawFd>),
    Suspend(Completion<()>),
}

pub struct FakeVoiceTransport {
    pub auto_resolve: bool,
    pub sco_fd: RawFd,
    locks: HashMap<DeviceHandle, (LockHolder, LockMode)>,
    pending: HashMap<RequestId, PendingVoiceCall>,
    next_request: u64,
}

impl Default for FakeVoiceTransport {
    fn default() -> Self {
        FakeVoiceTransport {
            auto_resolve: true,
            sco_fd: 200,
            locks: HashMap::new(),
            pending: HashMap::new(),
            next_request: 1,
        }
    }
}

impl FakeVoiceTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }

    pub fn resolve_request(&mut self, request: RequestId, result: Result<RawFd, AdapterError>) {
        if let Some(PendingVoiceCall::Request(cb)) = self.pending.remove(&request) {
            cb(result);
        }
    }
}

impl VoiceTransport for FakeVoiceTransport {
    fn lock(&mut self, device: DeviceHandle, holder: LockHolder, mode: LockMode) -> Result<(), AdapterError> {
        if self.locks.contains_key(&device) {
            return Err(AdapterError::Locked);
        }
        self.locks.insert(device, (holder, mode));
        Ok(())
    }

    fn unlock(&mut self, device: DeviceHandle) {
        self.locks.remove(&device);
    }

    fn is_write_locked_by_other(&self, device: DeviceHandle, by: LockHolder) -> bool {
        matches!(self.locks.get(&device), Some((holder, LockMode::Write)) if *holder != by)
    }

    fn configure(&mut self, _device: DeviceHandle, cb: Completion<()>) -> RequestId {
        let request = self.alloc_request();
        if self.auto_resolve {
            cb(Ok(()));
        } else {
            self.pending.insert(request, PendingVoiceCall::Configure(cb));
        }
        request
    }

    fn request(&mut self, _device: DeviceHandle, cb: Completion<RawFd>) -> RequestId {
        let request = self.alloc_request();
        if self.auto_resolve {
            cb(Ok(self.sco_fd));
        } else {
            self.pending.insert(request, PendingVoiceCall::Request(cb));
        }
        request
    }

    fn suspend(&mut self, _device: DeviceHandle, cb: Completion<()>) -> RequestId {
        let request = self.alloc_request();
        if self.auto_resolve {
            cb(Ok(()));
        } else {
            self.pending.insert(request, PendingVoiceCall::Suspend(cb));
        }
        request
    }

    fn cancel(&mut self, _device: DeviceHandle, request: RequestId) {
        self.pending.remove(&request);
    }
}

#[derive(Default, Clone)]
pub struct FakeDeviceRegistry {
    pub devices: HashMap<String, DeviceHandle>,
    pub media_sink: HashMap<DeviceHandle, bool>,
    pub headset: HashMap<DeviceHandle, bool>,
    next_handle: u64,
}

impl FakeDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, object: &str) -> DeviceHandle {
        self.next_handle += 1;
        let handle = DeviceHandle(self.next_handle);
        self.devices.insert(object.to_owned(), handle);
        handle
    }
}

impl DeviceRegistry for FakeDeviceRegistry {
    fn find(
        &self,
        object: &str,
        _source: &str,
        _destination: &str,
        _interface: Option<&str>,
    ) -> Result<DeviceHandle, AdapterError> {
        self.devices.get(object).copied().ok_or(AdapterError::DeviceNotFound)
    }

    fn active_media_sink(&self, device: DeviceHandle) -> bool {
        self.media_sink.get(&device).copied().unwrap_or(false)
    }

    fn active_headset(&self, device: DeviceHandle) -> bool {
        self.headset.get(&device).copied().unwrap_or(false)
    }

    fn available_sink(&self, device: DeviceHandle) -> bool {
        self.media_sink.contains_key(&device)
    }

    fn available_headset(&self, device: DeviceHandle) -> bool {
        self.headset.contains_key(&device)
    }
}
