//! Codec capability types and the on-wire codec block (§3, §4.6, §6.1).
//!
//! Field layouts for SBC and MPEG-1/2 mirror the bit-packed AVDTP capability
//! blobs the backend's `MediaTransport` collaborator hands back; bit
//! positions are picked to match `bt-classic`'s SBC packing and extended in
//! the same spirit for MPEG12.

use crate::error::{Result, WireError};

pub const SBC_CAPABILITY_LEN: usize = 4;
pub const MPEG12_CAPABILITY_LEN: usize = 4;

/// `transport` field of `GetCapabilities`/`Open` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Sco,
    A2dp,
}

impl TransportKind {
    pub fn to_byte(self) -> u8 {
        match self {
            TransportKind::Sco => 0,
            TransportKind::A2dp => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(TransportKind::Sco),
            1 => Ok(TransportKind::A2dp),
            _ => Err(WireError::InvalidField("transport")),
        }
    }
}

/// Endpoint lock state as reported in a codec block (§6.1: bit0=READ, bit1=WRITE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockMode {
    pub read: bool,
    pub write: bool,
}

impl LockMode {
    pub const NONE: LockMode = LockMode {
        read: false,
        write: false,
    };
    pub const WRITE: LockMode = LockMode {
        read: false,
        write: true,
    };

    pub fn to_byte(self) -> u8 {
        (self.read as u8) | ((self.write as u8) << 1)
    }

    pub fn from_byte(b: u8) -> Self {
        LockMode {
            read: b & 0x01 != 0,
            write: b & 0x02 != 0,
        }
    }

    pub fn is_locked(self) -> bool {
        self.read || self.write
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbcCapability {
    pub channel_mode: u8,
    pub sampling_freq: u8,
    pub allocation_method: u8,
    pub subbands: u8,
    pub block_length: u8,
    pub min_bitpool: u8,
    pub max_bitpool: u8,
}

impl SbcCapability {
    /// All values the format supports, as advertised by a fully capable endpoint.
    pub fn all() -> Self {
        SbcCapability {
            channel_mode: 0x0F,
            sampling_freq: 0x0F,
            allocation_method: 0x03,
            subbands: 0x03,
            block_length: 0x0F,
            min_bitpool: 2,
            max_bitpool: 250,
        }
    }

    pub fn to_bytes(self) -> [u8; SBC_CAPABILITY_LEN] {
        [
            (self.sampling_freq << 4) | self.channel_mode,
            (self.block_length << 4) | (self.subbands << 2) | self.allocation_method,
            self.min_bitpool,
            self.max_bitpool,
        ]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < SBC_CAPABILITY_LEN {
            return Err(WireError::Truncated);
        }
        let cap = SbcCapability {
            sampling_freq: buf[0] >> 4,
            channel_mode: buf[0] & 0x0F,
            block_length: buf[1] >> 4,
            subbands: (buf[1] >> 2) & 0x03,
            allocation_method: buf[1] & 0x03,
            min_bitpool: buf[2],
            max_bitpool: buf[3],
        };
        if cap.min_bitpool < 2 || cap.max_bitpool > 250 || cap.min_bitpool > cap.max_bitpool {
            return Err(WireError::InvalidField("sbc_bitpool"));
        }
        Ok(cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpeg12Capability {
    pub channel_mode: u8,
    pub crc: bool,
    pub layer: u8,
    pub sampling_freq: u8,
    pub media_payload_format: bool,
    pub vbr: bool,
    /// 15-bit bitrate index bitmask.
    pub bitrate: u16,
}

impl Mpeg12Capability {
    pub fn to_bytes(self) -> [u8; MPEG12_CAPABILITY_LEN] {
        let bitrate = self.bitrate & 0x7FFF;
        [
            (self.layer << 5) | ((self.crc as u8) << 4) | self.channel_mode,
            (self.sampling_freq << 2) | ((self.media_payload_format as u8) << 1) | self.vbr as u8,
            (bitrate >> 8) as u8,
            (bitrate & 0xFF) as u8,
        ]
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < MPEG12_CAPABILITY_LEN {
            return Err(WireError::Truncated);
        }
        Ok(Mpeg12Capability {
            layer: buf[0] >> 5,
            crc: buf[0] & 0x10 != 0,
            channel_mode: buf[0] & 0x0F,
            sampling_freq: buf[1] >> 2,
            media_payload_format: buf[1] & 0x02 != 0,
            vbr: buf[1] & 0x01 != 0,
            bitrate: (u16::from(buf[2]) << 8 | u16::from(buf[3])) & 0x7FFF,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecCapability {
    Sbc(SbcCapability),
    Mpeg12(Mpeg12Capability),
    /// Capability type the gateway doesn't interpret, carried opaquely (§4.6).
    Opaque { codec_type: u8, payload: Vec<u8> },
}

const CODEC_TYPE_SBC: u8 = 0;
const CODEC_TYPE_MPEG12: u8 = 1;

impl CodecCapability {
    pub fn codec_type(&self) -> u8 {
        match self {
            CodecCapability::Sbc(_) => CODEC_TYPE_SBC,
            CodecCapability::Mpeg12(_) => CODEC_TYPE_MPEG12,
            CodecCapability::Opaque { codec_type, .. } => *codec_type,
        }
    }

    pub fn payload_bytes(&self) -> Vec<u8> {
        match self {
            CodecCapability::Sbc(c) => c.to_bytes().to_vec(),
            CodecCapability::Mpeg12(c) => c.to_bytes().to_vec(),
            CodecCapability::Opaque { payload, .. } => payload.clone(),
        }
    }

    pub fn from_type_and_payload(codec_type: u8, payload: &[u8]) -> Result<Self> {
        match codec_type {
            CODEC_TYPE_SBC => Ok(CodecCapability::Sbc(SbcCapability::from_bytes(payload)?)),
            CODEC_TYPE_MPEG12 => Ok(CodecCapability::Mpeg12(Mpeg12Capability::from_bytes(
                payload,
            )?)),
            other => Ok(CodecCapability::Opaque {
                codec_type: other,
                payload: payload.to_vec(),
            }),
        }
    }

    /// §4.6 inbound rule: only SBC/MPEG12 are accepted when configuring a stream.
    pub fn require_known(&self) -> Result<()> {
        match self {
            CodecCapability::Sbc(_) | CodecCapability::Mpeg12(_) => Ok(()),
            CodecCapability::Opaque { codec_type, .. } => {
                Err(WireError::UnsupportedCodecType(*codec_type))
            }
        }
    }
}

const CODEC_BLOCK_HEADER_LEN: usize = 5;

/// One entry in a `GetCapabilities` response, or the embedded block of a
/// `SetConfiguration` request (§6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecBlock {
    pub seid: u8,
    pub transport: TransportKind,
    pub configured: bool,
    pub lock: LockMode,
    pub capability: CodecCapability,
}

impl CodecBlock {
    pub fn encode(&self, out: &mut Vec<u8>, suggested_buffer_size: usize) -> Result<()> {
        let payload = self.capability.payload_bytes();
        let total_len = CODEC_BLOCK_HEADER_LEN + payload.len();
        if total_len > u8::MAX as usize {
            return Err(WireError::BufferOverflow);
        }
        if out.len() + total_len > suggested_buffer_size {
            return Err(WireError::BufferOverflow);
        }
        out.push(total_len as u8);
        out.push(self.capability.codec_type());
        out.push((self.seid & 0x3F) | ((self.configured as u8) << 6));
        out.push(self.transport.to_byte());
        out.push(self.lock.to_byte());
        out.extend_from_slice(&payload);
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < CODEC_BLOCK_HEADER_LEN {
            return Err(WireError::Truncated);
        }
        let length = buf[0] as usize;
        if length < CODEC_BLOCK_HEADER_LEN || length > buf.len() {
            return Err(WireError::LengthMismatch {
                declared: length as u16,
                actual: buf.len(),
            });
        }
        let codec_type = buf[1];
        let seid = buf[2] & 0x3F;
        let configured = buf[2] & 0x40 != 0;
        let transport = TransportKind::from_byte(buf[3])?;
        let lock = LockMode::from_byte(buf[4]);
        let payload = &buf[CODEC_BLOCK_HEADER_LEN..length];
        let capability = CodecCapability::from_type_and_payload(codec_type, payload)?;
        Ok((
            CodecBlock {
                seid,
                transport,
                configured,
                lock,
                capability,
            },
            length,
        ))
    }
}

/// Decode every codec block packed back-to-back in a `GetCapabilities` response body.
pub fn decode_all(mut buf: &[u8]) -> Result<Vec<CodecBlock>> {
    let mut blocks = Vec::new();
    while !buf.is_empty() {
        let (block, consumed) = CodecBlock::decode(buf)?;
        blocks.push(block);
        buf = &buf[consumed..];
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sbc_capability_round_trips() {
        let cap = SbcCapability {
            channel_mode: 0b0010,
            sampling_freq: 0b0001,
            allocation_method: 0b01,
            subbands: 0b10,
            block_length: 0b0100,
            min_bitpool: 2,
            max_bitpool: 53,
        };
        let bytes = cap.to_bytes();
        assert_eq!(SbcCapability::from_bytes(&bytes).unwrap(), cap);
    }

    #[test]
    fn sbc_rejects_bad_bitpool() {
        let mut bytes = SbcCapability::all().to_bytes();
        bytes[2] = 1; // below the legal minimum of 2
        assert!(SbcCapability::from_bytes(&bytes).is_err());
    }

    #[test]
    fn mpeg12_capability_round_trips() {
        let cap = Mpeg12Capability {
            channel_mode: 0b0101,
            crc: true,
            layer: 0b011,
            sampling_freq: 0b101010,
            media_payload_format: false,
            vbr: true,
            bitrate: 0x4321 & 0x7FFF,
        };
        let bytes = cap.to_bytes();
        assert_eq!(Mpeg12Capability::from_bytes(&bytes).unwrap(), cap);
    }

    #[test]
    fn codec_block_round_trips() {
        let block = CodecBlock {
            seid: 5,
            transport: TransportKind::A2dp,
            configured: true,
            lock: LockMode::WRITE,
            capability: CodecCapability::Sbc(SbcCapability::all()),
        };
        let mut buf = Vec::new();
        block.encode(&mut buf, 1024).unwrap();
        let (decoded, consumed) = CodecBlock::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, block);
    }

    #[test]
    fn unknown_codec_type_is_opaque_but_rejected_by_set_configuration() {
        let block = CodecBlock {
            seid: 1,
            transport: TransportKind::Sco,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Opaque {
                codec_type: 0x42,
                payload: vec![1, 2, 3],
            },
        };
        let mut buf = Vec::new();
        block.encode(&mut buf, 1024).unwrap();
        let (decoded, _) = CodecBlock::decode(&buf).unwrap();
        assert!(decoded.capability.require_known().is_err());
    }

    #[test]
    fn encode_rejects_overflow_of_suggested_buffer() {
        let block = CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(SbcCapability::all()),
        };
        let mut buf = vec![0u8; 10];
        let err = block.encode(&mut buf, 12).unwrap_err();
        assert!(matches!(err, WireError::BufferOverflow));
    }

    #[test]
    fn decode_all_handles_multiple_blocks() {
        let b1 = CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(SbcCapability::all()),
        };
        let b2 = CodecBlock {
            seid: 2,
            transport: TransportKind::A2dp,
            configured: true,
            lock: LockMode::WRITE,
            capability: CodecCapability::Mpeg12(Mpeg12Capability {
                channel_mode: 1,
                crc: false,
                layer: 2,
                sampling_freq: 3,
                media_payload_format: true,
                vbr: false,
                bitrate: 100,
            }),
        };
        let mut buf = Vec::new();
        b1.encode(&mut buf, 1024).unwrap();
        b2.encode(&mut buf, 1024).unwrap();
        let decoded = decode_all(&buf).unwrap();
        assert_eq!(decoded, vec![b1, b2]);
    }
}
