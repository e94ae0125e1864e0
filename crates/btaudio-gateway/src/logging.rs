//! Structured logging setup (§4.9), grounded on the teacher's
//! `infra-common::logging::setup` shape: a `tracing-subscriber` `fmt`
//! subscriber driven by `EnvFilter`, installed once at process start.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{GatewayConfig, LogFormat};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides
/// `config.log_level` when set, matching `EnvFilter`'s usual precedence.
/// Safe to call more than once in a single test binary — later calls are a
/// no-op rather than a panic, since `tracing`'s global subscriber can only be
/// set once per process.
pub fn init(config: &GatewayConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = fmt().with_env_filter(filter);
    let result = match config.log_format {
        LogFormat::Pretty => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {e}");
    }
}
