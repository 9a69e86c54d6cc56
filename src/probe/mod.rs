//! Runtime probe: run a candidate with strict validated-module mode enforced.
//!
//! The candidate is started with the configured environment injected, stdin
//! and stdout detached, and stderr captured. Only a refusal marker in stderr
//! fails the probe. A clean exit, an unrelated error exit and a timeout all
//! pass: a process still running at the deadline did not refuse to start.
//!
//! Nothing beyond the deadline isolates the candidate. Whatever it does in
//! its first seconds of life, it does for real.

pub mod markers;

use crate::config::ProbeConfig;
use crate::timeout::{with_deadline, Deadline, TimeoutConfig};
pub use markers::MarkerSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

// How long stderr may keep draining after the child is gone.
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How the probed process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Exited on its own; `code` is None when killed by a signal.
    Exited { code: Option<i32> },
    /// Still running at the deadline and killed.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeProbeResult {
    pub passed: bool,
    /// Captured stderr, lossily decoded; may be empty.
    pub diagnostic: String,
    /// The refusal marker that failed the probe.
    pub marker: Option<String>,
    pub termination: Termination,
}

/// Something that can probe a candidate at runtime.
pub trait Probe: Send + Sync + 'static {
    fn run(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<RuntimeProbeResult, ProbeError>> + Send;
}

/// Subprocess-backed probe.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    timeout: Duration,
    env: BTreeMap<String, String>,
    markers: MarkerSet,
    max_stderr_bytes: usize,
}

impl RuntimeProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.timeout,
            env: config.env.clone(),
            markers: MarkerSet::new(config.markers.iter().cloned()),
            max_stderr_bytes: config.max_stderr_bytes,
        }
    }

    fn capture(&self) -> StderrCapture {
        StderrCapture::new(self.markers.clone(), self.max_stderr_bytes)
    }

    async fn execute(&self, path: &Path) -> Result<RuntimeProbeResult, ProbeError> {
        let started = Instant::now();
        let mut child = Command::new(path)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let captured = Arc::new(Mutex::new(self.capture()));
        let mut drain = tokio::spawn(capture_stderr(child.stderr.take(), Arc::clone(&captured)));

        let deadline = TimeoutConfig::new(self.timeout, "runtime_probe");
        let outcome = with_deadline(&deadline, child.wait()).await;
        let termination = match outcome {
            Deadline::Completed(Ok(status)) => Termination::Exited {
                code: status.code(),
            },
            Deadline::Completed(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Waiting on probe failed");
                Termination::Exited { code: None }
            }
            Deadline::Elapsed(_) => {
                if let Err(e) = child.start_kill() {
                    debug!(path = %path.display(), error = %e, "Kill after timeout failed");
                }
                let _ = child.wait().await;
                Termination::TimedOut
            }
        };

        // A grandchild can hold the pipe open; keep what arrived so far.
        if tokio::time::timeout(STDERR_DRAIN_GRACE, &mut drain)
            .await
            .is_err()
        {
            drain.abort();
        }

        let result = captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .result(termination);
        debug!(
            path = %path.display(),
            passed = result.passed,
            termination = ?result.termination,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Runtime probe finished"
        );
        Ok(result)
    }
}

impl Default for RuntimeProbe {
    fn default() -> Self {
        Self::new(&ProbeConfig::default())
    }
}

impl Probe for RuntimeProbe {
    fn run(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<RuntimeProbeResult, ProbeError>> + Send {
        self.execute(path)
    }
}

/// Stderr as it streams in.
///
/// Only the first `limit` bytes are kept for the report, but every byte is
/// searched for refusal markers.
#[derive(Debug)]
struct StderrCapture {
    markers: MarkerSet,
    limit: usize,
    retained: Vec<u8>,
    // Tail of the searched stream, long enough to hold all but the last byte
    // of a marker split across reads.
    carry: Vec<u8>,
    marker: Option<String>,
}

impl StderrCapture {
    fn new(markers: MarkerSet, limit: usize) -> Self {
        Self {
            markers,
            limit,
            retained: Vec::new(),
            carry: Vec::new(),
            marker: None,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.retained.len());
        self.retained.extend_from_slice(&chunk[..chunk.len().min(room)]);

        if self.marker.is_some() {
            return;
        }
        let mut window = std::mem::take(&mut self.carry);
        window.extend_from_slice(chunk);
        if let Some(found) = self.markers.find_bytes(&window) {
            self.marker = Some(found.to_string());
            return;
        }
        let keep = self.markers.max_len().saturating_sub(1);
        window.drain(..window.len().saturating_sub(keep));
        self.carry = window;
    }

    fn result(&self, termination: Termination) -> RuntimeProbeResult {
        RuntimeProbeResult {
            passed: self.marker.is_none(),
            diagnostic: String::from_utf8_lossy(&self.retained).into_owned(),
            marker: self.marker.clone(),
            termination,
        }
    }
}

/// Read stderr to EOF, feeding every chunk to `sink`.
async fn capture_stderr(stderr: Option<ChildStderr>, sink: Arc<Mutex<StderrCapture>>) {
    let Some(mut stderr) = stderr else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(&chunk[..n]),
        }
    }
}
