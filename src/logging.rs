//! Tracing initialisation for binaries and tests embedding fipscan.
//!
//! The library itself only emits `tracing` events and never installs a
//! subscriber.

use std::sync::Once;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the output format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "FIPSCAN_LOG_FORMAT";

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`]; anything other than `json` means text.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::Text,
        }
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Install the global subscriber with an `EnvFilter` (default `info`).
///
/// Only the first call has any effect. A subscriber installed elsewhere is
/// left in place.
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match format {
            LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_current_span(true))
                .try_init(),
        };
        if installed.is_ok() {
            info!(format = ?format, "fipscan tracing initialized");
        }
    });
}
