//! The per-client protocol dispatch (§4.4) and the backend-completion
//! draining that keeps it lock-free (§5).
//!
//! Every handler that calls into a backend hands it a closure that does
//! nothing but push a tagged event onto a shared queue; the gateway drains
//! that queue with full `&mut self` access right after the call returns.
//! This sidesteps the borrow conflict a closure capturing `&mut self` while
//! `self.media`/`self.voice` are themselves fields of `self` would hit, and
//! is the single-threaded analogue of the teacher's async/await completions.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use mio::Token;
use tracing::{debug, error, info, warn};

use btaudio_backend::{
    AdapterError, ConfiguredStream, DeviceHandle, DeviceRegistry,
    LockMode as AdapterLockMode, MediaSessionRegistry, MediaTransport, RemoteEndpoint,
    SessionHandle, StreamState, VoiceTransport,
};
use btaudio_proto::codec::{CodecBlock, CodecCapability, LockMode, TransportKind};
use btaudio_proto::messages::{
    EmptyBody, GetCapabilitiesRequest, GetCapabilitiesResponse, OpenRequest, OpenResponse,
    SetConfigurationRequest, SetConfigurationResponse,
};
use btaudio_proto::wire::{encode_error, MessageHeader, MessageName, MessageType, A2DP_SEID_MAX};
use btaudio_proto::{ErrorKind, FdChannel};

use crate::session::{ClientSession, DeviceBinding, PendingRequest, ServiceKind, SessionStage};

enum CompletionEvent {
    Discover(Result<Vec<RemoteEndpoint>, AdapterError>),
    Configure(Result<ConfiguredStream, AdapterError>),
    Resume(Result<(), AdapterError>),
    Suspend(Result<(), AdapterError>),
    VoiceConfigure(Result<(), AdapterError>),
    VoiceRequest(Result<std::os::fd::RawFd, AdapterError>),
    VoiceSuspend(Result<(), AdapterError>),
    StreamIdle,
}

type CompletionQueue = Rc<RefCell<VecDeque<(Token, CompletionEvent)>>>;

/// Outcome of dispatching one inbound message: either nothing more to do
/// right now, or bytes (and optionally an fd) to write back immediately.
pub enum DispatchOutcome {
    Pending,
    Reply { bytes: Vec<u8>, fd: Option<std::os::fd::RawFd> },
}

pub struct Gateway {
    pub sessions: HashMap<Token, ClientSession>,
    pub media: Box<dyn MediaTransport>,
    pub voice: Box<dyn VoiceTransport>,
    pub registry: Box<dyn DeviceRegistry>,
    pub media_sessions: MediaSessionRegistry,
    pub suggested_buffer_size: usize,
    completions: CompletionQueue,
}

impl Gateway {
    pub fn new(
        media: Box<dyn MediaTransport>,
        voice: Box<dyn VoiceTransport>,
        registry: Box<dyn DeviceRegistry>,
        suggested_buffer_size: usize,
    ) -> Self {
        Gateway {
            sessions: HashMap::new(),
            media,
            voice,
            registry,
            media_sessions: MediaSessionRegistry::new(),
            suggested_buffer_size,
            completions: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    fn completion_sink(&self, token: Token) -> impl Fn(CompletionEvent) + 'static {
        let queue = self.completions.clone();
        move |event| queue.borrow_mut().push_back((token, event))
    }

    /// Dispatch one fully-framed message (already validated by the caller
    /// per §4.1) and drain whatever completions the call produced
    /// synchronously, returning bytes ready to write back if any.
    pub fn dispatch(&mut self, token: Token, header: MessageHeader, body: &[u8]) -> DispatchOutcome {
        if header.msg_type != MessageType::Request {
            warn!(?token, name = ?header.name, "ignoring non-request message from a client");
            return DispatchOutcome::Pending;
        }

        let result = match header.name {
            MessageName::GetCapabilities => self.handle_get_capabilities(token, body),
            MessageName::Open => self.handle_open(token, body),
            MessageName::SetConfiguration => self.handle_set_configuration(token, body),
            MessageName::StartStream => self.handle_start_stream(token),
            MessageName::StopStream => self.handle_stop_stream(token),
            MessageName::Close => self.handle_close(token),
            MessageName::Control => Ok(DispatchOutcome::Reply {
                bytes: EmptyBody::encode(MessageType::Response, MessageName::Control),
                fd: None,
            }),
            MessageName::NewStream => {
                warn!(?token, "client sent NewStream, which is gateway-to-client only");
                Err(ErrorKind::Invalid)
            }
        };

        match result {
            Ok(outcome) => {
                self.drain_completions();
                outcome
            }
            Err(kind) => DispatchOutcome::Reply {
                bytes: encode_error(header.name, kind.posix_errno()),
                fd: None,
            },
        }
    }

    fn session_mut(&mut self, token: Token) -> Option<&mut ClientSession> {
        self.sessions.get_mut(&token)
    }

    /// Acquire the shared media session for (source, destination), reusing
    /// the one this client session already holds rather than bumping the
    /// refcount again — a session only ever releases once, at teardown
    /// (§3: "Backend sessions are shared... lifetime = longest holder").
    fn acquire_media_session(&mut self, token: Token, source: &str, destination: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(&token).and_then(|s| s.media_session) {
            return existing;
        }
        self.media_sessions
            .acquire(source, destination, || self.media.get_session(source, destination))
    }

    fn handle_get_capabilities(&mut self, token: Token, body: &[u8]) -> Result<DispatchOutcome, ErrorKind> {
        let req = GetCapabilitiesRequest::decode_body(body).map_err(|e| e.kind())?;
        let device = self
            .registry
            .find(&req.object, &req.source, &req.destination, None)
            .map_err(|e| e.kind())?;

        let kind = infer_service_kind(req.transport, &*self.registry, device);

        if kind.is_voice() {
            let blocks = vec![voice_capability_block(A2DP_SEID_MAX + 1)];
            let resp = GetCapabilitiesResponse {
                source: req.source,
                destination: req.destination,
                blocks,
            };
            let bytes = resp.encode(self.suggested_buffer_size).map_err(|e| e.kind())?;
            return Ok(DispatchOutcome::Reply { bytes, fd: None });
        }

        let session_handle = self.acquire_media_session(token, &req.source, &req.destination);

        if let Some(session) = self.session_mut(token) {
            session.service_kind = kind;
            session.device = Some(DeviceBinding {
                source: req.source.clone(),
                destination: req.destination.clone(),
                object: req.object.clone(),
                device,
            });
            session.media_session = Some(session_handle);
            session.pending = Some(PendingRequest::MediaDiscover { session: session_handle });
            session.seid = Some(req.seid); // re-used as the capability filter once discovery completes
        }

        let sink = self.completion_sink(token);
        self.media.discover(
            session_handle,
            Box::new(move |result| sink(CompletionEvent::Discover(result))),
        );

        Ok(DispatchOutcome::Pending)
    }

    fn handle_open(&mut self, token: Token, body: &[u8]) -> Result<DispatchOutcome, ErrorKind> {
        let req = OpenRequest::decode_body(body).map_err(|e| e.kind())?;
        let session = self.sessions.get(&token).ok_or(ErrorKind::Invalid)?;
        if session.stage != SessionStage::Fresh {
            return Err(ErrorKind::Invalid);
        }

        let wants_voice = req.seid > A2DP_SEID_MAX;
        // §3: once a prior GetCapabilities has established this session's
        // service kind, a later Open whose transport disagrees is INVALID
        // rather than silently reusing the established kind.
        if !matches!(session.service_kind, ServiceKind::None)
            && wants_voice != session.service_kind.is_voice()
        {
            return Err(ErrorKind::Invalid);
        }

        if wants_voice {
            let device = self
                .registry
                .find(&req.object, &req.source, &req.destination, None)
                .map_err(|e| e.kind())?;
            self.voice
                .lock(device, lock_holder(token), to_adapter_lock(req.lock))
                .map_err(|e| e.kind())?;
            let session = self.session_mut(token).unwrap();
            session.service_kind = ServiceKind::Headset;
            session.device = Some(DeviceBinding {
                source: req.source.clone(),
                destination: req.destination.clone(),
                object: req.object.clone(),
                device,
            });
            session.seid = Some(req.seid);
            session.lock_mode = Some(to_adapter_lock(req.lock));
            session.stage = SessionStage::Opened;
        } else {
            let media_session = self.acquire_media_session(token, &req.source, &req.destination);
            let endpoint = self.media.open(media_session, req.seid).map_err(|e| e.kind())?;
            self.media
                .lock(endpoint, lock_holder(token), to_adapter_lock(req.lock))
                .map_err(|e| e.kind())?;

            let device = self
                .registry
                .find(&req.object, &req.source, &req.destination, None)
                .map_err(|e| e.kind())?;
            let session = self.session_mut(token).unwrap();
            session.service_kind = if matches!(session.service_kind, ServiceKind::None) {
                ServiceKind::Sink
            } else {
                session.service_kind
            };
            session.device = Some(DeviceBinding {
                source: req.source.clone(),
                destination: req.destination.clone(),
                object: req.object.clone(),
                device,
            });
            session.media_session = Some(media_session);
            session.local_endpoint = Some(endpoint);
            session.seid = Some(req.seid);
            session.lock_mode = Some(to_adapter_lock(req.lock));
            session.stage = SessionStage::Opened;
        }

        let resp = OpenResponse {
            source: req.source,
            destination: req.destination,
        };
        Ok(DispatchOutcome::Reply {
            bytes: resp.encode(),
            fd: None,
        })
    }

    fn handle_set_configuration(&mut self, token: Token, body: &[u8]) -> Result<DispatchOutcome, ErrorKind> {
        let req = SetConfigurationRequest::decode_body(body).map_err(|e| e.kind())?;
        req.block.capability.require_known().map_err(|e| e.kind())?;

        let session = self.sessions.get(&token).ok_or(ErrorKind::Invalid)?;
        if session.stage != SessionStage::Opened {
            return Err(ErrorKind::Invalid);
        }
        match session.seid {
            Some(seid) if seid == req.block.seid => {}
            Some(_) => {
                return Err(ErrorKind::Invalid);
            }
            None => return Err(ErrorKind::Invalid),
        }

        if session.service_kind.is_voice() {
            if req.block.transport != TransportKind::Sco {
                return Err(ErrorKind::Invalid);
            }
            let device = session.device.as_ref().ok_or(ErrorKind::Invalid)?.device;
            session.pending.is_none().then_some(()).ok_or(ErrorKind::Invalid)?;

            let request = self.voice.configure(
                device,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::VoiceConfigure(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::VoiceConfigure { device, request });
            session.negotiated = Some(req.block.capability);
        } else {
            if req.block.transport != TransportKind::A2dp {
                return Err(ErrorKind::Invalid);
            }
            let media_session = session.media_session.ok_or(ErrorKind::Invalid)?;
            let endpoint = session.local_endpoint.ok_or(ErrorKind::Invalid)?;
            let caps = req.block.capability.clone();
            let avdtp_caps = btaudio_backend::marshal_configure_capabilities(&caps);

            let request = self.media.configure(
                media_session,
                endpoint,
                avdtp_caps,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::Configure(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::MediaConfigure {
                session: media_session,
                request,
            });
            session.negotiated = Some(caps);
        }

        Ok(DispatchOutcome::Pending)
    }

    fn handle_start_stream(&mut self, token: Token) -> Result<DispatchOutcome, ErrorKind> {
        let session = self.sessions.get(&token).ok_or(ErrorKind::Invalid)?;
        if session.stage != SessionStage::Configured {
            return Err(ErrorKind::Io);
        }

        if session.service_kind.is_voice() {
            let device = session.device.as_ref().unwrap().device;
            let request = self.voice.request(
                device,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::VoiceRequest(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::VoiceRequest { device, request });
        } else {
            let media_session = session.media_session.unwrap();
            let endpoint = session.local_endpoint.unwrap();
            let request = self.media.resume(
                media_session,
                endpoint,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::Resume(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::MediaResume {
                session: media_session,
                request,
            });
        }

        Ok(DispatchOutcome::Pending)
    }

    fn handle_stop_stream(&mut self, token: Token) -> Result<DispatchOutcome, ErrorKind> {
        let session = self.sessions.get(&token).ok_or(ErrorKind::Invalid)?;
        if session.stage != SessionStage::Streaming {
            return Err(ErrorKind::Io);
        }

        if session.service_kind.is_voice() {
            let device = session.device.as_ref().unwrap().device;
            let request = self.voice.suspend(
                device,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::VoiceSuspend(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::VoiceSuspend { device, request });
        } else {
            let media_session = session.media_session.unwrap();
            let endpoint = session.local_endpoint.unwrap();
            let request = self.media.suspend(
                media_session,
                endpoint,
                Box::new({
                    let sink = self.completion_sink(token);
                    move |result| sink(CompletionEvent::Suspend(result))
                }),
            );
            let session = self.session_mut(token).unwrap();
            session.pending = Some(PendingRequest::MediaSuspend {
                session: media_session,
                request,
            });
        }

        Ok(DispatchOutcome::Pending)
    }

    fn handle_close(&mut self, token: Token) -> Result<DispatchOutcome, ErrorKind> {
        self.teardown_session(token);
        if let Some(session) = self.session_mut(token) {
            session.stage = SessionStage::Fresh;
        }
        Ok(DispatchOutcome::Reply {
            bytes: EmptyBody::encode(MessageType::Response, MessageName::Close),
            fd: None,
        })
    }

    /// §3 destruction / §4.4 `Close`: cancel in-flight work, unsubscribe,
    /// unlock, release the backend session. Safe to call more than once.
    pub fn teardown_session(&mut self, token: Token) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };

        let pending = session.pending.take();
        let stream_state_sub = session.stream_state_sub.take();
        let local_endpoint = session.local_endpoint.take();

        if let Some(pending) = pending {
            self.cancel_pending(pending);
        }

        if let Some(sub) = stream_state_sub {
            self.media.unsubscribe(sub);
        }

        if let Some(endpoint) = local_endpoint {
            self.media.unlock(endpoint);
        }

        if let (Some(device_binding), true) = (
            self.sessions.get(&token).and_then(|s| s.device.clone()),
            self.sessions
                .get(&token)
                .map(|s| s.service_kind.is_voice())
                .unwrap_or(false),
        ) {
            self.voice.unlock(device_binding.device);
        }

        if let Some(session) = self.sessions.get_mut(&token) {
            if let (Some(media_session), Some(device)) =
                (session.media_session.take(), session.device.as_ref())
            {
                if self
                    .media_sessions
                    .release(&device.source, &device.destination)
                    .is_some()
                {
                    self.media.release_session(media_session);
                }
            }
            session.negotiated = None;
            session.transport_fd = None;
        }
    }

    fn cancel_pending(&mut self, pending: PendingRequest) {
        match pending {
            PendingRequest::MediaDiscover { .. } => {} // discover has no cancel verb; the drained result is simply ignored
            PendingRequest::MediaConfigure { session, request }
            | PendingRequest::MediaResume { session, request }
            | PendingRequest::MediaSuspend { session, request } => {
                self.media.cancel(session, request);
            }
            PendingRequest::VoiceConfigure { device, request }
            | PendingRequest::VoiceRequest { device, request }
            | PendingRequest::VoiceSuspend { device, request } => {
                self.voice.cancel(device, request);
            }
        }
    }

    /// Drain every completion queued by backend calls made during this
    /// dispatch (or, for real backends, since the last drain) and apply each
    /// one to the owning session. Completions for sessions that have since
    /// disconnected are silently dropped (§5 cancellation note).
    pub fn drain_completions(&mut self) {
        loop {
            let next = self.completions.borrow_mut().pop_front();
            let Some((token, event)) = next else { break };
            if !self.sessions.contains_key(&token) {
                debug!(?token, "dropping completion for a session that no longer exists");
                continue;
            }
            self.apply_completion(token, event);
        }
    }

    fn apply_completion(&mut self, token: Token, event: CompletionEvent) {
        match event {
            CompletionEvent::Discover(Ok(endpoints)) => {
                self.complete_get_capabilities(token, endpoints);
            }
            CompletionEvent::Discover(Err(e)) => {
                error!(?token, error = %e, "endpoint discovery failed");
                self.clear_pending(token);
            }
            CompletionEvent::Configure(Ok(configured)) => {
                self.complete_media_configure(token, configured);
            }
            CompletionEvent::Configure(Err(e)) => {
                error!(?token, error = %e, "media configure failed");
                self.clear_pending(token);
            }
            CompletionEvent::Resume(Ok(())) => {
                self.complete_start_stream(token);
            }
            CompletionEvent::Resume(Err(e)) => {
                error!(?token, error = %e, "media resume failed");
                self.clear_pending(token);
            }
            CompletionEvent::Suspend(Ok(())) | CompletionEvent::VoiceSuspend(Ok(())) => {
                self.clear_pending(token);
                if let Some(session) = self.session_mut(token) {
                    session.stage = SessionStage::Configured;
                }
            }
            CompletionEvent::Suspend(Err(e)) | CompletionEvent::VoiceSuspend(Err(e)) => {
                error!(?token, error = %e, "stream suspend failed");
                self.clear_pending(token);
            }
            CompletionEvent::VoiceConfigure(Ok(())) => {
                self.complete_voice_configure(token);
            }
            CompletionEvent::VoiceConfigure(Err(e)) => {
                error!(?token, error = %e, "voice configure failed");
                self.clear_pending(token);
            }
            CompletionEvent::VoiceRequest(Ok(fd)) => {
                if let Some(session) = self.session_mut(token) {
                    session.transport_fd = Some(fd);
                }
                self.complete_start_stream(token);
            }
            CompletionEvent::VoiceRequest(Err(e)) => {
                error!(?token, error = %e, "voice stream request failed");
                self.clear_pending(token);
            }
            CompletionEvent::StreamIdle => {
                info!(?token, "remote tore down the stream");
                self.teardown_session(token);
                if let Some(session) = self.session_mut(token) {
                    session.stage = SessionStage::Fresh;
                }
            }
        }
    }

    fn clear_pending(&mut self, token: Token) {
        if let Some(session) = self.session_mut(token) {
            session.pending = None;
        }
    }

    fn complete_get_capabilities(&mut self, token: Token, endpoints: Vec<RemoteEndpoint>) {
        let Some(session) = self.sessions.get(&token) else { return };
        let filter_seid = session.seid;
        let media_session = session.media_session;
        let blocks: Vec<CodecBlock> = endpoints
            .into_iter()
            .filter(|ep| filter_seid.map(|want| want == 0 || want == ep.seid).unwrap_or(true))
            .filter_map(|ep| {
                let local = self.media.open(media_session?, ep.seid).ok()?;
                Some(CodecBlock {
                    seid: ep.seid,
                    transport: TransportKind::A2dp,
                    configured: self.media.is_configured(local),
                    lock: LockMode {
                        read: false,
                        write: self.media.is_write_locked_by_other(local, lock_holder(token)),
                    },
                    capability: ep.capability,
                })
            })
            .collect();

        self.clear_pending(token);
        let Some(session) = self.sessions.get(&token) else { return };
        let Some(device) = session.device.as_ref() else { return };
        let resp = GetCapabilitiesResponse {
            source: device.source.clone(),
            destination: device.destination.clone(),
            blocks,
        };
        match resp.encode(self.suggested_buffer_size) {
            Ok(bytes) => {
                self.reply_now(token, bytes, None);
            }
            Err(e) => self.reply_error(token, MessageName::GetCapabilities, e.kind()),
        }
    }

    fn complete_media_configure(&mut self, token: Token, configured: ConfiguredStream) {
        self.clear_pending(token);
        let Some(session) = self.session_mut(token) else { return };
        session.transport_fd = Some(configured.transport_fd);
        session.stage = SessionStage::Configured;
        let endpoint = session.local_endpoint;

        if let Some(endpoint) = endpoint {
            let sink = self.completion_sink(token);
            let sub = self.media.stream_state_subscribe(
                endpoint,
                Box::new(move |state| {
                    if state == StreamState::Idle {
                        sink(CompletionEvent::StreamIdle);
                    }
                }),
            );
            if let Some(session) = self.session_mut(token) {
                session.stream_state_sub = Some(sub);
            }
        }

        let resp = SetConfigurationResponse {
            link_mtu: configured.output_mtu,
        };
        self.reply_now(token, resp.encode(), None);
    }

    fn complete_voice_configure(&mut self, token: Token) {
        self.clear_pending(token);
        if let Some(session) = self.session_mut(token) {
            session.stage = SessionStage::Configured;
        }
        let resp = SetConfigurationResponse { link_mtu: 48 };
        self.reply_now(token, resp.encode(), None);
    }

    /// §4.2/§4.4: the `StartStream` response is a plain message; only the
    /// `NewStream` indication that follows carries the transport fd. If the
    /// fd handoff fails, the client gets `ERROR(StartStream, ioerr)` instead
    /// of being left thinking the stream came up.
    fn complete_start_stream(&mut self, token: Token) {
        self.clear_pending(token);
        let Some(session) = self.session_mut(token) else { return };
        let fd = session.transport_fd;

        self.reply_now(token, EmptyBody::encode(MessageType::Response, MessageName::StartStream), None);

        let Some(fd) = fd else {
            warn!(?token, "completing StartStream with no transport fd to hand off");
            if let Some(session) = self.session_mut(token) {
                session.stage = SessionStage::Streaming;
            }
            return;
        };

        let indication = EmptyBody::encode(MessageType::Indication, MessageName::NewStream);
        if self.reply_now(token, indication, Some(fd)) {
            if let Some(session) = self.session_mut(token) {
                session.stage = SessionStage::Streaming;
            }
        } else {
            self.reply_error(token, MessageName::StartStream, ErrorKind::Io);
        }
    }

    fn reply_error(&mut self, token: Token, name: MessageName, kind: ErrorKind) {
        self.reply_now(token, encode_error(name, kind.posix_errno()), None);
    }

    /// Write bytes (and, for `NewStream`, hand off an fd) straight to the
    /// client socket. Used from completion handlers, which run outside the
    /// request/response turn that produced `DispatchOutcome::Reply`. Returns
    /// whether the write succeeded, so callers that must react to a failed
    /// fd handoff (§4.2/§4.4) can surface their own error to the client.
    fn reply_now(&mut self, token: Token, bytes: Vec<u8>, fd: Option<std::os::fd::RawFd>) -> bool {
        let Some(session) = self.sessions.get_mut(&token) else { return false };
        let result = match fd {
            Some(fd) => FdChannel::new(&session.stream).send(&bytes, fd),
            None => std::io::Write::write_all(&mut session.stream, &bytes).map_err(btaudio_proto::WireError::Io),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(?token, error = %e, "failed to write reply to client");
                false
            }
        }
    }
}

fn lock_holder(token: Token) -> btaudio_backend::LockHolder {
    btaudio_backend::LockHolder(token.0 as u64)
}

fn to_adapter_lock(lock: LockMode) -> AdapterLockMode {
    if lock.write {
        AdapterLockMode::Write
    } else {
        AdapterLockMode::Read
    }
}

fn infer_service_kind(transport: TransportKind, registry: &dyn DeviceRegistry, device: DeviceHandle) -> ServiceKind {
    match transport {
        TransportKind::Sco => ServiceKind::Headset,
        TransportKind::A2dp => {
            if registry.active_media_sink(device) {
                ServiceKind::Sink
            } else if registry.active_headset(device) {
                ServiceKind::Headset
            } else if registry.available_sink(device) {
                ServiceKind::Sink
            } else if registry.available_headset(device) {
                ServiceKind::Headset
            } else {
                // Neither role is available at all; fall back to the voice
                // pseudo-endpoint, which every paired device supports.
                ServiceKind::Headset
            }
        }
    }
}

fn voice_capability_block(seid: u8) -> CodecBlock {
    // The synthesized voice pseudo-endpoint always advertises 8 kHz mono PCM (§3).
    CodecBlock {
        seid,
        transport: TransportKind::Sco,
        configured: false,
        lock: LockMode { read: false, write: false },
        capability: CodecCapability::Opaque {
            codec_type: 0xFF,
            payload: vec![8, 1], // 8 kHz, mono — opaque to the wire codec, interpreted by clients
        },
    }
}
