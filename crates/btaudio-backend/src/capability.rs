//! Converts between the on-wire codec capability (§6.1) and the two-item
//! AVDTP service-capability sequence a real `MediaTransport` collaborator
//! expects on `configure` (§4.4 SetConfiguration, §4.6 CapabilityMarshaller).
//!
//! The wire's SBC/MPEG12 field layouts already match AVDTP's media-codec
//! capability bit-for-bit (grounded on `bt-classic/src/avdtp.rs`), so the
//! marshalling work here is building and unwrapping the capability *list*
//! AVDTP negotiates, not re-encoding the codec fields a second time.

use btaudio_proto::CodecCapability;

/// One AVDTP service capability. Only the two categories this gateway ever
/// sends or reads back are represented; every other AVDTP category belongs
/// to the external collaborator and never crosses this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCapability {
    /// The media-transport category; no payload.
    MediaTransport,
    /// The media-codec category, carrying the wire-shaped SBC/MPEG12/Opaque block.
    MediaCodec(CodecCapability),
}

/// Build the two-capability sequence `MediaTransport::configure` expects: a
/// bare media-transport capability followed by the negotiated media-codec
/// capability (§4.4: "rebuild the session's capability list with exactly
/// two AVDTP service capabilities").
pub fn marshal_configure_capabilities(capability: &CodecCapability) -> Vec<ServiceCapability> {
    vec![
        ServiceCapability::MediaTransport,
        ServiceCapability::MediaCodec(capability.clone()),
    ]
}

/// Pull the media-codec capability back out of a capability sequence, e.g.
/// to report what a backend actually configured.
pub fn unmarshal_configured_capability(capabilities: &[ServiceCapability]) -> Option<CodecCapability> {
    capabilities.iter().find_map(|c| match c {
        ServiceCapability::MediaCodec(cap) => Some(cap.clone()),
        ServiceCapability::MediaTransport => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use btaudio_proto::codec::SbcCapability;

    #[test]
    fn marshals_exactly_two_capabilities_transport_then_codec() {
        let cap = CodecCapability::Sbc(SbcCapability::all());
        let marshalled = marshal_configure_capabilities(&cap);
        assert_eq!(marshalled.len(), 2);
        assert_eq!(marshalled[0], ServiceCapability::MediaTransport);
        assert_eq!(marshalled[1], ServiceCapability::MediaCodec(cap));
    }

    #[test]
    fn unmarshal_round_trips_the_codec_capability() {
        let cap = CodecCapability::Sbc(SbcCapability::all());
        let marshalled = marshal_configure_capabilities(&cap);
        assert_eq!(unmarshal_configured_capability(&marshalled), Some(cap));
    }

    #[test]
    fn unmarshal_finds_nothing_in_a_transport_only_list() {
        assert_eq!(unmarshal_configured_capability(&[ServiceCapability::MediaTransport]), None);
    }
}
