//! Fixed-layout control message framing (§6.1).
//!
//! Every message on the control socket starts with a 4-byte header
//! (`type`, `name`, `length`) followed by a name-specific, fixed-size body.
//! Packing is host-native: this is a local IPC channel between cooperating
//! processes on the same machine, never transported off-host.

use crate::error::{Result, WireError};

pub const HEADER_LEN: usize = 4;

/// Suggested upper bound for a single response buffer (§4.6, §7 `OOS`).
pub const SUGGESTED_BUFFER_SIZE: usize = 1024;

/// SEIDs above this value address the synthesized voice pseudo-endpoint (§3).
pub const A2DP_SEID_MAX: u8 = 61;
/// The single voice pseudo-endpoint's SEID.
pub const VOICE_SEID: u8 = 62;

pub const SOURCE_ADDR_LEN: usize = 18;
pub const DESTINATION_ADDR_LEN: usize = 18;
pub const OBJECT_PATH_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Indication,
    Error,
}

impl MessageType {
    pub fn to_byte(self) -> u8 {
        match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Indication => 2,
            MessageType::Error => 3,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(MessageType::Request),
            1 => Ok(MessageType::Response),
            2 => Ok(MessageType::Indication),
            3 => Ok(MessageType::Error),
            other => Err(WireError::UnknownMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageName {
    GetCapabilities,
    Open,
    SetConfiguration,
    StartStream,
    StopStream,
    Close,
    Control,
    NewStream,
}

impl MessageName {
    pub fn to_byte(self) -> u8 {
        match self {
            MessageName::GetCapabilities => 0,
            MessageName::Open => 1,
            MessageName::SetConfiguration => 2,
            MessageName::StartStream => 3,
            MessageName::StopStream => 4,
            MessageName::Close => 5,
            MessageName::Control => 6,
            MessageName::NewStream => 7,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(MessageName::GetCapabilities),
            1 => Ok(MessageName::Open),
            2 => Ok(MessageName::SetConfiguration),
            3 => Ok(MessageName::StartStream),
            4 => Ok(MessageName::StopStream),
            5 => Ok(MessageName::Close),
            6 => Ok(MessageName::Control),
            7 => Ok(MessageName::NewStream),
            other => Err(WireError::UnknownMessageName(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub msg_type: MessageType,
    pub name: MessageName,
    /// Total message length in bytes, header included.
    pub length: u16,
}

impl MessageHeader {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.msg_type.to_byte());
        out.push(self.name.to_byte());
        out.extend_from_slice(&self.length.to_ne_bytes());
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated);
        }
        let msg_type = MessageType::from_byte(buf[0])?;
        let name = MessageName::from_byte(buf[1])?;
        let length = u16::from_ne_bytes([buf[2], buf[3]]);
        Ok(MessageHeader {
            msg_type,
            name,
            length,
        })
    }
}

/// Validate that `buf` is exactly one whole message: its declared `length`
/// must equal the number of bytes actually received in one `recv` (§4.1). A
/// mismatch is a fatal protocol error for the session that sent it.
pub fn validate_framing(buf: &[u8]) -> Result<MessageHeader> {
    let header = MessageHeader::decode(buf)?;
    if header.length as usize != buf.len() {
        return Err(WireError::LengthMismatch {
            declared: header.length,
            actual: buf.len(),
        });
    }
    Ok(header)
}

/// Write a fixed-width, NUL-terminated-or-padded string field.
pub fn encode_fixed_str(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width.saturating_sub(1));
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (width - n), 0);
}

/// Read a fixed-width string field, requiring a NUL terminator within the
/// buffer (§4.1). Returns the bytes before the first NUL, as UTF-8 lossy
/// (addresses and object paths are ASCII in practice).
pub fn decode_fixed_str<'a>(buf: &'a [u8], field: &'static str) -> Result<&'a str> {
    let nul_at = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(WireError::NotNulTerminated { field })?;
    std::str::from_utf8(&buf[..nul_at]).map_err(|_| WireError::InvalidField(field))
}

/// Encode an `ERROR` message (header + `posix_errno`).
pub fn encode_error(name: MessageName, posix_errno: u32) -> Vec<u8> {
    let length = (HEADER_LEN + 4) as u16;
    let mut out = Vec::with_capacity(length as usize);
    MessageHeader {
        msg_type: MessageType::Error,
        name,
        length,
    }
    .encode(&mut out);
    out.extend_from_slice(&posix_errno.to_ne_bytes());
    out
}

/// Decode an `ERROR` message body (header already validated/consumed by the caller).
pub fn decode_error_body(body: &[u8]) -> Result<u32> {
    if body.len() < 4 {
        return Err(WireError::Truncated);
    }
    Ok(u32::from_ne_bytes([body[0], body[1], body[2], body[3]]))
}
