//! Wire protocol, codec capability marshalling, and fd handoff for the audio
//! IPC gateway.
//!
//! This crate knows nothing about sessions, backends, or the event loop; it
//! only turns bytes into typed requests/responses and back, and moves file
//! descriptors across the same socket those bytes travel on.

pub mod codec;
pub mod error;
pub mod fd_channel;
pub mod messages;
pub mod wire;

pub use codec::{CodecBlock, CodecCapability, LockMode, SbcCapability, TransportKind};
pub use error::{ErrorKind, Result, WireError};
pub use fd_channel::FdChannel;
pub use wire::{MessageHeader, MessageName, MessageType};
