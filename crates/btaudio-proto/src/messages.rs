//! Request/response/indication bodies (§6.1), layered on top of [`crate::wire`].

use crate::codec::CodecBlock;
use crate::error::{Result, WireError};
use crate::wire::{
    decode_fixed_str, encode_fixed_str, MessageHeader, MessageName, MessageType, DESTINATION_ADDR_LEN,
    HEADER_LEN, OBJECT_PATH_LEN, SOURCE_ADDR_LEN,
};
use crate::codec::TransportKind;

const FLAG_AUTOCONNECT: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCapabilitiesRequest {
    pub source: String,
    pub destination: String,
    pub object: String,
    pub transport: TransportKind,
    pub autoconnect: bool,
    pub seid: u8,
}

impl GetCapabilitiesRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        encode_fixed_str(&mut body, &self.source, SOURCE_ADDR_LEN);
        encode_fixed_str(&mut body, &self.destination, DESTINATION_ADDR_LEN);
        encode_fixed_str(&mut body, &self.object, OBJECT_PATH_LEN);
        body.push(self.transport.to_byte());
        body.push(if self.autoconnect { FLAG_AUTOCONNECT } else { 0 });
        body.push(self.seid);
        finish(MessageType::Request, MessageName::GetCapabilities, body)
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let mut off = 0;
        let source = take_str(body, &mut off, SOURCE_ADDR_LEN, "source")?;
        let destination = take_str(body, &mut off, DESTINATION_ADDR_LEN, "destination")?;
        let object = take_str(body, &mut off, OBJECT_PATH_LEN, "object")?;
        let transport = TransportKind::from_byte(take_u8(body, &mut off, "transport")?)?;
        let flags = take_u8(body, &mut off, "flags")?;
        let seid = take_u8(body, &mut off, "seid")?;
        Ok(GetCapabilitiesRequest {
            source,
            destination,
            object,
            transport,
            autoconnect: flags & FLAG_AUTOCONNECT != 0,
            seid,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCapabilitiesResponse {
    pub source: String,
    pub destination: String,
    pub blocks: Vec<CodecBlock>,
}

impl GetCapabilitiesResponse {
    pub fn encode(&self, suggested_buffer_size: usize) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        encode_fixed_str(&mut body, &self.source, SOURCE_ADDR_LEN);
        encode_fixed_str(&mut body, &self.destination, DESTINATION_ADDR_LEN);
        let header_reserve = HEADER_LEN + body.len();
        for block in &self.blocks {
            block.encode(&mut body, suggested_buffer_size.saturating_sub(header_reserve))?;
        }
        Ok(finish(
            MessageType::Response,
            MessageName::GetCapabilities,
            body,
        ))
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let mut off = 0;
        let source = take_str(body, &mut off, SOURCE_ADDR_LEN, "source")?;
        let destination = take_str(body, &mut off, DESTINATION_ADDR_LEN, "destination")?;
        let blocks = crate::codec::decode_all(&body[off..])?;
        Ok(GetCapabilitiesResponse {
            source,
            destination,
            blocks,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub source: String,
    pub destination: String,
    pub object: String,
    pub seid: u8,
    pub lock: crate::codec::LockMode,
}

impl OpenRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        encode_fixed_str(&mut body, &self.source, SOURCE_ADDR_LEN);
        encode_fixed_str(&mut body, &self.destination, DESTINATION_ADDR_LEN);
        encode_fixed_str(&mut body, &self.object, OBJECT_PATH_LEN);
        body.push(self.seid);
        body.push(self.lock.to_byte());
        finish(MessageType::Request, MessageName::Open, body)
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let mut off = 0;
        let source = take_str(body, &mut off, SOURCE_ADDR_LEN, "source")?;
        let destination = take_str(body, &mut off, DESTINATION_ADDR_LEN, "destination")?;
        let object = take_str(body, &mut off, OBJECT_PATH_LEN, "object")?;
        let seid = take_u8(body, &mut off, "seid")?;
        let lock = crate::codec::LockMode::from_byte(take_u8(body, &mut off, "lock")?);
        Ok(OpenRequest {
            source,
            destination,
            object,
            seid,
            lock,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenResponse {
    pub source: String,
    pub destination: String,
}

impl OpenResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        encode_fixed_str(&mut body, &self.source, SOURCE_ADDR_LEN);
        encode_fixed_str(&mut body, &self.destination, DESTINATION_ADDR_LEN);
        finish(MessageType::Response, MessageName::Open, body)
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let mut off = 0;
        let source = take_str(body, &mut off, SOURCE_ADDR_LEN, "source")?;
        let destination = take_str(body, &mut off, DESTINATION_ADDR_LEN, "destination")?;
        Ok(OpenResponse { source, destination })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetConfigurationRequest {
    pub block: CodecBlock,
}

impl SetConfigurationRequest {
    pub fn encode(&self, suggested_buffer_size: usize) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.block
            .encode(&mut body, suggested_buffer_size.saturating_sub(HEADER_LEN))?;
        Ok(finish(
            MessageType::Request,
            MessageName::SetConfiguration,
            body,
        ))
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (block, _) = CodecBlock::decode(body)?;
        Ok(SetConfigurationRequest { block })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetConfigurationResponse {
    pub link_mtu: u16,
}

impl SetConfigurationResponse {
    pub fn encode(&self) -> Vec<u8> {
        let body = self.link_mtu.to_ne_bytes().to_vec();
        finish(
            MessageType::Response,
            MessageName::SetConfiguration,
            body,
        )
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let mut off = 0;
        let link_mtu = take_u16(body, &mut off, "link_mtu")?;
        Ok(SetConfigurationResponse { link_mtu })
    }
}

/// `StartStream`/`StopStream`/`Close`/`Control` all carry empty bodies in
/// both directions; `NewStream` is the same shape with its fd carried
/// out-of-band via `FdChannel` rather than in this body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBody;

impl EmptyBody {
    pub fn encode(msg_type: MessageType, name: MessageName) -> Vec<u8> {
        finish(msg_type, name, Vec::new())
    }

    pub fn decode_body(body: &[u8]) -> Result<Self> {
        if !body.is_empty() {
            return Err(WireError::LengthMismatch {
                declared: (HEADER_LEN + body.len()) as u16,
                actual: HEADER_LEN,
            });
        }
        Ok(EmptyBody)
    }
}

fn finish(msg_type: MessageType, name: MessageName, body: Vec<u8>) -> Vec<u8> {
    let length = (HEADER_LEN + body.len()) as u16;
    let mut out = Vec::with_capacity(length as usize);
    MessageHeader {
        msg_type,
        name,
        length,
    }
    .encode(&mut out);
    out.extend_from_slice(&body);
    out
}

fn take_str(body: &[u8], off: &mut usize, width: usize, field: &'static str) -> Result<String> {
    if *off + width > body.len() {
        return Err(WireError::Truncated);
    }
    let s = decode_fixed_str(&body[*off..*off + width], field)?.to_owned();
    *off += width;
    Ok(s)
}

fn take_u8(body: &[u8], off: &mut usize, field: &'static str) -> Result<u8> {
    let b = *body.get(*off).ok_or(WireError::InvalidField(field))?;
    *off += 1;
    Ok(b)
}

fn take_u16(body: &[u8], off: &mut usize, field: &'static str) -> Result<u16> {
    if *off + 2 > body.len() {
        return Err(WireError::InvalidField(field));
    }
    let v = u16::from_ne_bytes([body[*off], body[*off + 1]]);
    *off += 2;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecCapability, LockMode, SbcCapability};
    use crate::wire::validate_framing;

    #[test]
    fn get_capabilities_request_round_trips() {
        let req = GetCapabilitiesRequest {
            source: "AA:AA:AA:AA:AA:AA".into(),
            destination: "BB:BB:BB:BB:BB:BB".into(),
            object: "/dev/x".into(),
            transport: TransportKind::A2dp,
            autoconnect: true,
            seid: 3,
        };
        let buf = req.encode();
        let header = validate_framing(&buf).unwrap();
        assert_eq!(header.name, MessageName::GetCapabilities);
        let decoded = GetCapabilitiesRequest::decode_body(&buf[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn get_capabilities_response_with_blocks_round_trips() {
        let block = CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(SbcCapability::all()),
        };
        let resp = GetCapabilitiesResponse {
            source: "AA:AA:AA:AA:AA:AA".into(),
            destination: "BB:BB:BB:BB:BB:BB".into(),
            blocks: vec![block],
        };
        let buf = resp.encode(1024).unwrap();
        validate_framing(&buf).unwrap();
        let decoded = GetCapabilitiesResponse::decode_body(&buf[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn set_configuration_round_trips() {
        let req = SetConfigurationRequest {
            block: CodecBlock {
                seid: 1,
                transport: TransportKind::A2dp,
                configured: false,
                lock: LockMode::WRITE,
                capability: CodecCapability::Sbc(SbcCapability::all()),
            },
        };
        let buf = req.encode(1024).unwrap();
        validate_framing(&buf).unwrap();
        let decoded = SetConfigurationRequest::decode_body(&buf[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, req);

        let resp = SetConfigurationResponse { link_mtu: 672 };
        let buf = resp.encode();
        validate_framing(&buf).unwrap();
        assert_eq!(
            SetConfigurationResponse::decode_body(&buf[HEADER_LEN..]).unwrap(),
            resp
        );
    }

    #[test]
    fn empty_body_rejects_trailing_bytes() {
        assert!(EmptyBody::decode_body(&[1]).is_err());
        assert!(EmptyBody::decode_body(&[]).is_ok());
    }
}
