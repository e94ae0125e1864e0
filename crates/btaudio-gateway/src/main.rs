//! `btaudio-gatewayd` — process bring-up for the audio IPC gateway (§4.2,
//! §4.8, §6.2, §6.3).
//!
//! Backed entirely by the in-memory test doubles in `btaudio_backend::fakes`
//! for now: real BlueZ/D-Bus collaborators for `MediaTransport`,
//! `VoiceTransport`, and `DeviceRegistry` are out of scope (§1), so this
//! binary wires the same object-safe trait contracts to a fixed set of
//! demo devices instead.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use btaudio_backend::fakes::{FakeDeviceRegistry, FakeMediaTransport, FakeVoiceTransport};
use btaudio_gateway::config::GatewayConfig;
use btaudio_gateway::listener::{self, EventLoop};
use btaudio_gateway::state_machine::Gateway;
use btaudio_gateway::{error, logging};
use btaudio_proto::ErrorKind;

/// Audio IPC gateway daemon.
#[derive(Parser)]
#[command(name = "btaudio-gatewayd")]
#[command(about = "Brokers client sessions over the rendezvous socket against the A2DP and SCO backends")]
#[command(version)]
struct Cli {
    /// TOML configuration file. Defaults apply for anything it omits.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the rendezvous socket path from the config file/defaults.
    #[arg(short, long)]
    socket: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match GatewayConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return exit_code(ErrorKind::Invalid);
        }
    };
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }

    logging::init(&config);
    listener::install_signal_handlers();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway exiting on error");
            exit_code(e.kind())
        }
    }
}

fn run(config: &GatewayConfig) -> error::Result<()> {
    let mut event_loop = EventLoop::bind(&config.socket_path, config.shutdown_grace)?;

    let media = Box::new(FakeMediaTransport::new());
    let voice = Box::new(FakeVoiceTransport::new());
    let mut registry = FakeDeviceRegistry::new();
    registry.add_device("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
    let registry = Box::new(registry);

    let mut gateway = Gateway::new(media, voice, registry, config.suggested_buffer_size);

    info!(
        socket = %config.socket_path.display(),
        buffer_size = config.suggested_buffer_size,
        "starting audio IPC gateway"
    );

    let result = event_loop.run(&mut gateway);
    if result.is_err() {
        event_loop.shutdown(&mut gateway);
    }
    result
}

/// Map the top-level failure to a process exit code (§6.3): `EX_USAGE`-ish
/// for bad input, `EX_OSERR`-ish for everything else, mirroring the
/// `posix_errno` taxonomy the gateway already uses on the wire.
fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::Invalid => ExitCode::from(64),
        _ => ExitCode::from(71),
    }
}
