//! The per-client session record and its lifecycle (§3, §4.3).

use std::os::fd::RawFd;
use std::os::unix::net::UnixStream;

use btaudio_backend::{DeviceHandle, LocalEndpointId, LockMode, RequestId, SessionHandle};
use btaudio_proto::CodecCapability;
use mio::Token;

/// Which transport a session has committed to; immutable after the first
/// `Open`/`GetCapabilities` that sets it (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    None,
    Headset,
    Sink,
    Source,
}

impl ServiceKind {
    pub fn is_media(self) -> bool {
        matches!(self, ServiceKind::Sink | ServiceKind::Source)
    }

    pub fn is_voice(self) -> bool {
        matches!(self, ServiceKind::Headset)
    }
}

/// The device/session addressing a `ClientSession` is bound to, once resolved.
#[derive(Debug, Clone)]
pub struct DeviceBinding {
    pub source: String,
    pub destination: String,
    pub object: String,
    pub device: DeviceHandle,
}

/// Coarse progress through the DAG of §3/§4.4's state table. Tracked
/// separately from the richer fields below so ordering checks stay a single
/// match rather than re-deriving state from optionals scattered around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Fresh,
    Opened,
    Configured,
    Streaming,
}

/// What a session is waiting on, if anything. Carries just enough to route
/// a drained completion back to this session and, on cancellation, to the
/// right adapter call (§4.5's `cancel`).
#[derive(Debug, Clone, Copy)]
pub enum PendingRequest {
    MediaDiscover { session: SessionHandle },
    MediaConfigure { session: SessionHandle, request: RequestId },
    MediaResume { session: SessionHandle, request: RequestId },
    MediaSuspend { session: SessionHandle, request: RequestId },
    VoiceConfigure { device: DeviceHandle, request: RequestId },
    VoiceRequest { device: DeviceHandle, request: RequestId },
    VoiceSuspend { device: DeviceHandle, request: RequestId },
}

pub struct ClientSession {
    pub token: Token,
    /// Scopes every log line this session produces so one session's
    /// interleaved events can be filtered out of a busy gateway's log
    /// (§4.9).
    pub span: tracing::Span,
    pub stream: UnixStream,
    pub stage: SessionStage,
    pub service_kind: ServiceKind,
    pub device: Option<DeviceBinding>,
    pub media_session: Option<SessionHandle>,
    pub local_endpoint: Option<LocalEndpointId>,
    pub seid: Option<u8>,
    pub lock_mode: Option<LockMode>,
    pub negotiated: Option<CodecCapability>,
    pub transport_fd: Option<RawFd>,
    pub stream_state_sub: Option<btaudio_backend::SubscriptionId>,
    pub pending: Option<PendingRequest>,
}

impl ClientSession {
    pub fn new(token: Token, stream: UnixStream) -> Self {
        ClientSession {
            token,
            span: tracing::info_span!("session", id = token.0),
            stream,
            stage: SessionStage::Fresh,
            service_kind: ServiceKind::None,
            device: None,
            media_session: None,
            local_endpoint: None,
            seid: None,
            lock_mode: None,
            negotiated: None,
            transport_fd: None,
            stream_state_sub: None,
            pending: None,
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        use std::os::fd::AsRawFd;
        self.stream.as_raw_fd()
    }

    /// §3: "A session holds at most one in-flight-request slot ... at a time."
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
