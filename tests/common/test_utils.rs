//! File helpers and scripted probes shared by the integration tests.

use fipscan::probe::{Probe, ProbeError, RuntimeProbeResult, Termination};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Write `content` to `dir/name` with mode 0755, creating parent directories.
pub fn write_executable(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    write_with_mode(dir, name, content, 0o755)
}

pub fn write_with_mode(dir: &Path, name: &str, content: &[u8], mode: u32) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

/// Write a `/bin/sh` script with the given body.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    write_executable(dir, name, format!("#!/bin/sh\n{body}\n").as_bytes())
}

fn result(passed: bool) -> RuntimeProbeResult {
    let diagnostic = if passed {
        String::new()
    } else {
        "panic: opensslcrypto: FIPS mode requested (1) but not available in OpenSSL".to_string()
    };
    RuntimeProbeResult {
        passed,
        marker: (!passed).then(|| "panic: opensslcrypto: FIPS mode requested".to_string()),
        diagnostic,
        termination: Termination::Exited {
            code: Some(if passed { 0 } else { 2 }),
        },
    }
}

/// Probe answering from a table keyed by file name, without running anything.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    refused: HashMap<String, bool>,
    unstartable: Vec<String>,
    hanging: Vec<String>,
}

impl ScriptedProbe {
    /// Every probe passes unless listed.
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn refusing(mut self, name: &str) -> Self {
        self.refused.insert(name.to_string(), true);
        self
    }

    pub fn unstartable(mut self, name: &str) -> Self {
        self.unstartable.push(name.to_string());
        self
    }

    /// Still running at the deadline, having written nothing.
    pub fn hanging(mut self, name: &str) -> Self {
        self.hanging.push(name.to_string());
        self
    }
}

impl Probe for ScriptedProbe {
    async fn run(&self, path: &Path) -> Result<RuntimeProbeResult, ProbeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.unstartable.contains(&name) {
            return Err(ProbeError::Spawn {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        if self.hanging.contains(&name) {
            return Ok(RuntimeProbeResult {
                passed: true,
                diagnostic: String::new(),
                marker: None,
                termination: Termination::TimedOut,
            });
        }
        Ok(result(!self.refused.contains_key(&name)))
    }
}

/// Probe that sleeps and records how many runs overlapped.
#[derive(Debug, Clone)]
pub struct CountingProbe {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl CountingProbe {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for CountingProbe {
    async fn run(&self, _path: &Path) -> Result<RuntimeProbeResult, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result(true))
    }
}
