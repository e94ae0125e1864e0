//! Library surface for `btaudio-gatewayd`: the rendezvous-socket listener,
//! per-client protocol state machine, and process configuration/logging.
//!
//! Split out from the binary so `tests/` can drive a real `EventLoop`
//! against the in-memory fake backends without re-implementing process
//! bring-up.

pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod session;
pub mod state_machine;
