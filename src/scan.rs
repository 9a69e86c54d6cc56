//! The scan entry point.

use crate::cancel::CancellationSignal;
use crate::classify::BinaryClassifier;
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::host::{detect_once, HostCapabilityProvider};
use crate::orchestrator::{ComplianceCheck, Orchestrator};
use crate::probe::{Probe, RuntimeProbe};
use crate::report::{BinaryReport, ScanSummary};
use crate::walk::DirectoryScanner;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Scans directory trees for toolchain-built executables and evaluates each
/// one for strict validated-module compliance.
///
/// A `Scanner` holds no per-scan state; it may run any number of scans.
pub struct Scanner<P = RuntimeProbe> {
    config: ScanConfig,
    host_provider: Box<dyn HostCapabilityProvider + Send + Sync>,
    probe: Arc<P>,
}

impl Scanner<RuntimeProbe> {
    pub fn new(
        config: ScanConfig,
        host_provider: impl HostCapabilityProvider + Send + Sync + 'static,
    ) -> Self {
        let probe = RuntimeProbe::new(&config.probe);
        Self::with_probe(config, host_provider, probe)
    }
}

impl<P: Probe> Scanner<P> {
    /// Build a scanner around a custom probe.
    pub fn with_probe(
        config: ScanConfig,
        host_provider: impl HostCapabilityProvider + Send + Sync + 'static,
        probe: P,
    ) -> Self {
        Self {
            config,
            host_provider: Box::new(host_provider),
            probe: Arc::new(probe),
        }
    }

    /// Scan `root` and return one report per candidate, in discovery order.
    ///
    /// Errors only for an invalid configuration, an unreadable root, or
    /// cancellation. Problems with a single candidate are recorded on its
    /// report instead.
    pub async fn scan(
        &self,
        root: impl AsRef<Path>,
        cancel: &CancellationSignal,
    ) -> Result<Vec<BinaryReport>> {
        self.config.validate()?;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let started = Instant::now();
        let root = root.as_ref();
        info!(root = %root.display(), max_parallel = self.config.max_parallel, "Scan started");

        let host = Arc::new(detect_once(self.host_provider.as_ref()));

        let walker = DirectoryScanner::new(
            root,
            self.config.excluded_prefixes.clone(),
            BinaryClassifier::new(self.config.io.clone()),
        )?;
        debug!(root = %walker.root().display(), "Walking resolved root");
        let walk_cancel = cancel.clone();
        let candidates = tokio::task::spawn_blocking(move || walker.collect(&walk_cancel))
            .await
            .map_err(|e| ScanError::Walk(e.to_string()))??;

        let check = ComplianceCheck::new(Arc::clone(&self.probe), host, self.config.io.clone());
        let orchestrator = Orchestrator::new(check, self.config.max_parallel);
        let reports = orchestrator.run(candidates, cancel).await?;

        let summary = ScanSummary::from_reports(&reports);
        info!(
            root = %root.display(),
            candidates = summary.total,
            uses_system_crypto = summary.uses_system_crypto,
            failed_runtime_check = summary.failed_runtime_check,
            compliant = summary.compliant,
            errors = summary.errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan finished"
        );
        Ok(reports)
    }
}

/// One-shot scan with the default runtime probe.
pub async fn scan(
    root: impl AsRef<Path>,
    config: ScanConfig,
    host_provider: impl HostCapabilityProvider + Send + Sync + 'static,
    cancel: &CancellationSignal,
) -> Result<Vec<BinaryReport>> {
    Scanner::new(config, host_provider).scan(root, cancel).await
}
