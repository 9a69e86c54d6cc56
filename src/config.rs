//! Configuration for a scan.
//!
//! Every field has a default matching the tool's design constants, so an
//! empty JSON object is a valid configuration.

use crate::error::{Result, ScanError};
use crate::io::IOLimits;
use crate::timeout::DEFAULT_PROBE_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on concurrently running checks.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Environment variable that makes the toolchain's crypto backend require a
/// validated module at startup.
pub const STRICT_MODE_ENV: &str = "GOFIPS";

/// Stderr fragments printed when the backend refuses to start in strict mode.
pub const DEFAULT_REFUSAL_MARKERS: [&str; 3] = [
    "panic: opensslcrypto: FIPS mode requested",
    "FIPS mode requested",
    "but not available in OpenSSL",
];

/// Master configuration for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Path prefixes never descended into (default: /proc, /sys, /dev).
    pub excluded_prefixes: Vec<PathBuf>,
    /// Maximum number of checks in flight (default: 10).
    pub max_parallel: usize,
    /// Runtime probe settings.
    pub probe: ProbeConfig,
    /// Limits applied when opening candidate files.
    pub io: IOLimits,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: ["/proc", "/sys", "/dev"].iter().map(PathBuf::from).collect(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            probe: ProbeConfig::default(),
            io: IOLimits::default(),
        }
    }
}

impl ScanConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ScanError::InvalidConfig(format!("malformed JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(ScanError::InvalidConfig(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        if self.probe.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "probe timeout must be non-zero".to_string(),
            ));
        }
        if self.probe.markers.iter().all(|m| m.is_empty()) {
            return Err(ScanError::InvalidConfig(
                "at least one non-empty refusal marker is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_excluded_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.excluded_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe.timeout = timeout;
        self
    }
}

/// Runtime probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Execution bound per candidate (default: 2s).
    pub timeout: Duration,
    /// Variables added to the inherited environment (default: GOFIPS=1).
    pub env: BTreeMap<String, String>,
    /// Stderr substrings that mark a refusal to run in strict mode.
    pub markers: Vec<String>,
    /// Cap on captured stderr (default: 65536).
    pub max_stderr_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            env: BTreeMap::from([(STRICT_MODE_ENV.to_string(), "1".to_string())]),
            markers: DEFAULT_REFUSAL_MARKERS.iter().map(|m| m.to_string()).collect(),
            max_stderr_bytes: 64 * 1024,
        }
    }
}
