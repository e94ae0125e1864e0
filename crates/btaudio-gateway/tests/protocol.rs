//! End-to-end protocol tests driving a real `UnixStream` client against the
//! listener, backed by the in-memory fake adapters (§8's literal scenarios).

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use btaudio_backend::fakes::{FakeDeviceRegistry, FakeMediaTransport, FakeVoiceTransport};
use btaudio_backend::RemoteEndpoint;
use btaudio_gateway::listener::EventLoop;
use btaudio_gateway::state_machine::Gateway;
use btaudio_proto::codec::{CodecBlock, CodecCapability, LockMode, SbcCapability, TransportKind};
use btaudio_proto::messages::{
    GetCapabilitiesRequest, GetCapabilitiesResponse, OpenRequest, OpenResponse,
    SetConfigurationRequest, SetConfigurationResponse,
};
use btaudio_proto::wire::{MessageName, MessageType, A2DP_SEID_MAX, HEADER_LEN};
use btaudio_proto::FdChannel;

const SOURCE: &str = "AA:AA:AA:AA:AA:AA";
const DESTINATION: &str = "BB:BB:BB:BB:BB:BB";
const OBJECT: &str = "/org/bluez/hci0/dev_BB_BB_BB_BB_BB_BB";

fn sbc_capability() -> SbcCapability {
    SbcCapability::all()
}

/// Holds the directory alive for the test's duration; dropped (and removed)
/// at the end of the test function's scope.
fn scratch_socket_path() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.sock");
    (dir, path)
}

fn pump(event_loop: &mut EventLoop, gateway: &mut Gateway, rounds: usize) {
    for _ in 0..rounds {
        event_loop.step(gateway, Duration::from_millis(20)).unwrap();
    }
}

fn connect_client(path: &std::path::Path) -> UnixStream {
    let stream = UnixStream::connect(path).unwrap();
    stream.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    stream
}

/// One full request/reply round trip with no fd expected in the response.
fn roundtrip(event_loop: &mut EventLoop, gateway: &mut Gateway, client: &mut UnixStream, request: &[u8]) -> Vec<u8> {
    client.write_all(request).unwrap();
    pump(event_loop, gateway, 5);
    let mut buf = vec![0u8; 4096];
    let n = client.read(&mut buf).unwrap();
    buf.truncate(n);
    buf
}

fn registry_with_device() -> FakeDeviceRegistry {
    let mut registry = FakeDeviceRegistry::new();
    registry.add_device(OBJECT);
    registry
}

#[test]
fn basic_sbc_sink_end_to_end() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let mut media = FakeMediaTransport::new();
    media.remote_endpoints.push(RemoteEndpoint {
        seid: 1,
        capability: CodecCapability::Sbc(sbc_capability()),
    });
    let voice = FakeVoiceTransport::new();
    let mut registry = registry_with_device();
    registry.media_sink.insert(btaudio_backend::DeviceHandle(1), true);

    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);
    let mut client = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2); // let the listener accept the connection

    let get_caps = GetCapabilitiesRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        transport: TransportKind::A2dp,
        autoconnect: false,
        seid: 0,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &get_caps.encode());
    let resp = GetCapabilitiesResponse::decode_body(&reply[HEADER_LEN..]).unwrap();
    assert_eq!(resp.blocks.len(), 1);
    assert_eq!(resp.blocks[0].seid, 1);
    assert!(!resp.blocks[0].configured);
    assert!(!resp.blocks[0].lock.write);
    assert_eq!(resp.blocks[0].capability, CodecCapability::Sbc(sbc_capability()));

    let open = OpenRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        seid: 1,
        lock: LockMode::WRITE,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &open.encode());
    OpenResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let set_config = SetConfigurationRequest {
        block: CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(sbc_capability()),
        },
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &set_config.encode(1024).unwrap());
    let resp = SetConfigurationResponse::decode_body(&reply[HEADER_LEN..]).unwrap();
    assert!(resp.link_mtu > 0);

    let start = btaudio_proto::messages::EmptyBody::encode(MessageType::Request, MessageName::StartStream);
    client.write_all(&start).unwrap();
    pump(&mut event_loop, &mut gateway, 5);
    let (bytes, fds) = FdChannel::new(&client).recv(4096).unwrap();
    assert_eq!(fds.len(), 1, "NewStream must hand off exactly one fd");
    let start_header = btaudio_proto::wire::MessageHeader::decode(&bytes).unwrap();
    assert_eq!(start_header.name, MessageName::StartStream);
    let new_stream_offset = start_header.length as usize;
    let new_stream_header = btaudio_proto::wire::MessageHeader::decode(&bytes[new_stream_offset..]).unwrap();
    assert_eq!(new_stream_header.name, MessageName::NewStream);
    assert_eq!(new_stream_header.msg_type, MessageType::Indication);
}

#[test]
fn voice_path_delivers_sco_fd() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let media = FakeMediaTransport::new();
    let voice = FakeVoiceTransport::new();
    let registry = registry_with_device();
    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);
    let mut client = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2);

    let open = OpenRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        seid: A2DP_SEID_MAX + 1,
        lock: LockMode::WRITE,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &open.encode());
    OpenResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let set_config = SetConfigurationRequest {
        block: CodecBlock {
            seid: A2DP_SEID_MAX + 1,
            transport: TransportKind::Sco,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Opaque { codec_type: 0xFF, payload: vec![8, 1] },
        },
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &set_config.encode(1024).unwrap());
    let resp = SetConfigurationResponse::decode_body(&reply[HEADER_LEN..]).unwrap();
    assert_eq!(resp.link_mtu, 48);

    let start = btaudio_proto::messages::EmptyBody::encode(MessageType::Request, MessageName::StartStream);
    client.write_all(&start).unwrap();
    pump(&mut event_loop, &mut gateway, 5);
    let (_bytes, fds) = FdChannel::new(&client).recv(4096).unwrap();
    assert_eq!(fds.len(), 1);
}

#[test]
fn contention_reports_lock_bit_to_other_clients() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let mut media = FakeMediaTransport::new();
    media.remote_endpoints.push(RemoteEndpoint {
        seid: 1,
        capability: CodecCapability::Sbc(sbc_capability()),
    });
    let voice = FakeVoiceTransport::new();
    let registry = registry_with_device();
    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);

    let mut c1 = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2);
    let mut c2 = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2);

    let open = OpenRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        seid: 1,
        lock: LockMode::WRITE,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut c1, &open.encode());
    OpenResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let get_caps = GetCapabilitiesRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        transport: TransportKind::A2dp,
        autoconnect: false,
        seid: 1,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut c2, &get_caps.encode());
    let resp = GetCapabilitiesResponse::decode_body(&reply[HEADER_LEN..]).unwrap();
    assert_eq!(resp.blocks.len(), 1);
    assert!(resp.blocks[0].lock.write, "C2 must see C1's write lock on seid 1");
}

#[test]
fn disconnect_during_configure_cancels_exactly_once() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let mut media = FakeMediaTransport::new();
    media.auto_resolve = false;
    media.remote_endpoints.push(RemoteEndpoint {
        seid: 1,
        capability: CodecCapability::Sbc(sbc_capability()),
    });
    let voice = FakeVoiceTransport::new();
    let registry = registry_with_device();
    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);

    let mut client = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2);

    let open = OpenRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        seid: 1,
        lock: LockMode::WRITE,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &open.encode());
    OpenResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let set_config = SetConfigurationRequest {
        block: CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(sbc_capability()),
        },
    };
    client.write_all(&set_config.encode(1024).unwrap()).unwrap();
    pump(&mut event_loop, &mut gateway, 5);
    assert_eq!(gateway.sessions.len(), 1, "configure must still be pending, not replied yet");

    drop(client);
    pump(&mut event_loop, &mut gateway, 5);
    assert!(gateway.sessions.is_empty(), "disconnect must destroy the session");
}

#[test]
fn stream_torn_down_externally_fails_subsequent_requests() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let mut media = FakeMediaTransport::new();
    media.remote_endpoints.push(RemoteEndpoint {
        seid: 1,
        capability: CodecCapability::Sbc(sbc_capability()),
    });
    let voice = FakeVoiceTransport::new();
    let registry = registry_with_device();
    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);

    let mut client = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 2);

    let open = OpenRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        seid: 1,
        lock: LockMode::WRITE,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &open.encode());
    OpenResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let set_config = SetConfigurationRequest {
        block: CodecBlock {
            seid: 1,
            transport: TransportKind::A2dp,
            configured: false,
            lock: LockMode::NONE,
            capability: CodecCapability::Sbc(sbc_capability()),
        },
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &set_config.encode(1024).unwrap());
    SetConfigurationResponse::decode_body(&reply[HEADER_LEN..]).unwrap();

    let token = *gateway.sessions.keys().next().unwrap();
    let endpoint = gateway.sessions.get(&token).unwrap().local_endpoint.unwrap();
    gateway.media.force_idle(endpoint);
    pump(&mut event_loop, &mut gateway, 2);

    let stop = btaudio_proto::messages::EmptyBody::encode(MessageType::Request, MessageName::StopStream);
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut client, &stop);
    let header = btaudio_proto::wire::MessageHeader::decode(&reply).unwrap();
    assert_eq!(header.msg_type, MessageType::Error);
    let errno = btaudio_proto::wire::decode_error_body(&reply[HEADER_LEN..]).unwrap();
    assert_eq!(errno, libc::EIO as u32);
}

#[test]
fn malformed_length_destroys_only_that_session() {
    let (_dir, socket_path) = scratch_socket_path();
    let mut event_loop = EventLoop::bind(&socket_path, Duration::from_millis(50)).unwrap();

    let media = FakeMediaTransport::new();
    let voice = FakeVoiceTransport::new();
    let registry = registry_with_device();
    let mut gateway = Gateway::new(Box::new(media), Box::new(voice), Box::new(registry), 1024);

    let mut bad = connect_client(&socket_path);
    let mut good = connect_client(&socket_path);
    pump(&mut event_loop, &mut gateway, 3);
    assert_eq!(gateway.sessions.len(), 2);

    // Header declares length=24 but only 20 bytes are actually sent.
    let mut malformed = Vec::new();
    btaudio_proto::wire::MessageHeader {
        msg_type: MessageType::Request,
        name: MessageName::Close,
        length: 24,
    }
    .encode(&mut malformed);
    malformed.resize(20, 0);
    bad.write_all(&malformed).unwrap();
    pump(&mut event_loop, &mut gateway, 5);

    assert_eq!(gateway.sessions.len(), 1, "only the malformed session should be destroyed");

    let get_caps = GetCapabilitiesRequest {
        source: SOURCE.into(),
        destination: DESTINATION.into(),
        object: OBJECT.into(),
        transport: TransportKind::Sco,
        autoconnect: false,
        seid: 0,
    };
    let reply = roundtrip(&mut event_loop, &mut gateway, &mut good, &get_caps.encode());
    let header = btaudio_proto::wire::MessageHeader::decode(&reply).unwrap();
    assert_eq!(header.msg_type, MessageType::Response, "surviving session still works");
}
