//! The rendezvous-socket accept loop (§4.2) and the `mio`-driven readiness
//! loop that drives [`Gateway::dispatch`] (§5).
//!
//! One `mio::Poll` instance multiplexes the listening socket and every
//! connected client. All sockets are non-blocking; there is no thread pool
//! and no lock — the event loop is the only scheduler, matching §5's
//! single-threaded model. Client sockets stay plain
//! `std::os::unix::net::UnixStream` (so [`ClientSession`] can hand them to
//! [`FdChannel`] for `SCM_RIGHTS` writes); registration with `Poll` goes
//! through [`mio::unix::SourceFd`] on the raw descriptor instead of wrapping
//! them in `mio::net::UnixStream`.

use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};

use btaudio_proto::wire::{validate_framing, HEADER_LEN};
use btaudio_proto::FdChannel;

use crate::error::{GatewayError, Result};
use crate::session::ClientSession;
use crate::state_machine::{DispatchOutcome, Gateway};

const LISTENER: Token = Token(usize::MAX);
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Arrange for `SIGINT`/`SIGTERM` to set the flag [`EventLoop::run`] polls,
/// rather than terminating the process immediately (§4.2: "shuts down
/// in-flight sessions in an orderly fashion before exiting").
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, request_shutdown as libc::sighandler_t);
        libc::signal(libc::SIGTERM, request_shutdown as libc::sighandler_t);
    }
}

/// Remove a stale socket file left behind by a prior run before binding.
/// A prior gateway that is still alive would hold the listening fd open
/// against that inode regardless, so this never steals a live socket.
fn bind_rendezvous_socket(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|source| GatewayError::Bind {
            path: path.display().to_string(),
            source,
        })?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GatewayError::Bind {
            path: path.display().to_string(),
            source,
        })?;
    }
    UnixListener::bind(path).map_err(|source| GatewayError::Bind {
        path: path.display().to_string(),
        source,
    })
}

pub struct EventLoop {
    poll: Poll,
    listener: UnixListener,
    socket_path: std::path::PathBuf,
    next_token: usize,
    shutdown_grace: Duration,
}

impl EventLoop {
    pub fn bind(socket_path: &Path, shutdown_grace: Duration) -> Result<Self> {
        let listener = bind_rendezvous_socket(socket_path)?;
        listener.set_nonblocking(true)?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut SourceFd(&listener.as_raw_fd()), LISTENER, Interest::READABLE)?;

        Ok(EventLoop {
            poll,
            listener,
            socket_path: socket_path.to_owned(),
            next_token: 0,
            shutdown_grace,
        })
    }

    fn alloc_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// Accept every pending connection (readiness is level-triggered per
    /// connection, not per-listener, so this drains until `WouldBlock`).
    fn accept_all(&mut self, gateway: &mut Gateway) {
        loop {
            let (stream, _addr) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "failed to accept a client connection");
                    break;
                }
            };
            if let Err(e) = stream.set_nonblocking(true) {
                warn!(error = %e, "failed to set client socket non-blocking, dropping it");
                continue;
            }

            let token = self.alloc_token();
            if let Err(e) =
                self.poll
                    .registry()
                    .register(&mut SourceFd(&stream.as_raw_fd()), token, Interest::READABLE)
            {
                warn!(error = %e, "failed to register client socket with the event loop");
                continue;
            }

            debug!(?token, "accepted client connection");
            gateway.sessions.insert(token, ClientSession::new(token, stream));
        }
    }

    /// Read and dispatch every whole message currently buffered on `token`'s
    /// socket. Returns `false` once the peer has disconnected.
    fn service_client(&mut self, gateway: &mut Gateway, token: Token) -> bool {
        let Some(span) = gateway.sessions.get(&token).map(|s| s.span.clone()) else {
            return false;
        };
        let _guard = span.enter();

        let buf_cap = gateway.suggested_buffer_size.max(HEADER_LEN);
        loop {
            let Some(session) = gateway.sessions.get_mut(&token) else {
                return false;
            };
            let mut buf = vec![0u8; buf_cap];
            match session.stream.read(&mut buf) {
                Ok(0) => {
                    debug!(?token, "client closed the connection");
                    return false;
                }
                Ok(n) => match validate_framing(&buf[..n]) {
                    Ok(header) => {
                        let body = buf[HEADER_LEN..n].to_vec();
                        match gateway.dispatch(token, header, &body) {
                            DispatchOutcome::Pending => {}
                            DispatchOutcome::Reply { bytes, fd } => {
                                self.write_reply(gateway, token, &bytes, fd);
                            }
                        }
                    }
                    Err(e) => {
                        error!(?token, error = %e, "malformed message, closing the session");
                        return false;
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return true,
                Err(e) => {
                    debug!(?token, error = %e, "read error, closing the session");
                    return false;
                }
            }
        }
    }

    fn write_reply(&self, gateway: &mut Gateway, token: Token, bytes: &[u8], fd: Option<std::os::fd::RawFd>) {
        let Some(session) = gateway.sessions.get_mut(&token) else { return };
        let result = match fd {
            Some(fd) => FdChannel::new(&session.stream).send(bytes, fd),
            None => std::io::Write::write_all(&mut session.stream, bytes).map_err(btaudio_proto::WireError::Io),
        };
        if let Err(e) = result {
            error!(?token, error = %e, "failed to write reply to client");
        }
    }

    fn disconnect(&mut self, gateway: &mut Gateway, token: Token) {
        gateway.teardown_session(token);
        if let Some(session) = gateway.sessions.remove(&token) {
            let _ = self.poll.registry().deregister(&mut SourceFd(&session.raw_fd()));
        }
    }

    /// Run until a `SIGINT`/`SIGTERM` is observed, then tear every session
    /// down in place and unlink the rendezvous socket.
    pub fn run(&mut self, gateway: &mut Gateway) -> Result<()> {
        info!(path = %self.socket_path.display(), "gateway listening");

        while !SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            match self.step(gateway, POLL_TIMEOUT) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.shutdown(gateway);
        Ok(())
    }

    /// One readiness cycle: accept pending connections, service every
    /// readable client, then drop whoever disconnected. Split out of `run`
    /// so integration tests can pump the loop without going through
    /// signal-based shutdown.
    pub fn step(&mut self, gateway: &mut Gateway, timeout: Duration) -> std::io::Result<()> {
        let mut events = Events::with_capacity(128);
        self.poll.poll(&mut events, Some(timeout))?;

        let mut to_disconnect = Vec::new();
        for event in events.iter() {
            if event.token() == LISTENER {
                self.accept_all(gateway);
                continue;
            }
            if !self.service_client(gateway, event.token()) {
                to_disconnect.push(event.token());
            }
        }
        for token in to_disconnect {
            self.disconnect(gateway, token);
        }
        Ok(())
    }

    /// Tear down every live session and unlink the rendezvous socket. Called
    /// both at the end of an orderly `run` and, if bring-up fails after
    /// `bind`, by `main` on the way out.
    pub fn shutdown(&mut self, gateway: &mut Gateway) {
        info!(sessions = gateway.sessions.len(), "shutting down, draining sessions");
        let deadline = Instant::now() + self.shutdown_grace;
        let tokens: Vec<Token> = gateway.sessions.keys().copied().collect();
        for token in tokens {
            self.disconnect(gateway, token);
        }
        if Instant::now() < deadline {
            std::thread::sleep(deadline - Instant::now());
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
