//! Bounded-parallel dispatch of per-candidate checks.
//!
//! One task is spawned per candidate. Each waits on the admission gate, runs
//! its check, and writes its report into the slot reserved for its index.
//! Cancellation stops further dispatch but never kills running tasks; the
//! orchestrator waits for all of them and then discards everything.

use crate::cancel::CancellationSignal;
use crate::error::{CheckError, Result, ScanError};
use crate::evaluate::evaluate;
use crate::host::HostCapability;
use crate::io::IOLimits;
use crate::metadata;
use crate::probe::Probe;
use crate::report::{BinaryReport, ReportSlots};
use crate::walk::CandidateBinary;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Counting admission gate that also records its high-water mark.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Held while a check runs; released on drop.
pub struct AdmissionPermit {
    gate: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait for a free slot. None only if the gate was closed.
    pub async fn acquire(&self) -> Option<AdmissionPermit> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .ok()?;
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        Some(AdmissionPermit {
            gate: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A complete check of one candidate, always producing a report.
pub trait CandidateCheck: Send + Sync + 'static {
    fn check(&self, candidate: &CandidateBinary) -> impl Future<Output = BinaryReport> + Send;
}

/// Extract metadata, probe at runtime, evaluate.
pub struct ComplianceCheck<P> {
    probe: Arc<P>,
    host: Arc<HostCapability>,
    limits: IOLimits,
}

impl<P: Probe> ComplianceCheck<P> {
    pub fn new(probe: Arc<P>, host: Arc<HostCapability>, limits: IOLimits) -> Self {
        Self {
            probe,
            host,
            limits,
        }
    }
}

impl<P: Probe> CandidateCheck for ComplianceCheck<P> {
    async fn check(&self, candidate: &CandidateBinary) -> BinaryReport {
        let mut report = BinaryReport::new(candidate);

        let path = candidate.path.clone();
        let limits = self.limits.clone();
        let extracted =
            tokio::task::spawn_blocking(move || metadata::extract(&path, &limits)).await;
        let metadata = match extracted {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(e)) => {
                warn!(path = %candidate.relative_path.display(), error = %e, "Metadata extraction failed");
                return report.with_error(CheckError::Extraction(e.to_string()));
            }
            Err(e) => return report.with_error(CheckError::TaskFailed(e.to_string())),
        };
        report.metadata = Some(metadata);

        let probe = match self.probe.run(&candidate.path).await {
            Ok(probe) => probe,
            Err(e) => {
                warn!(path = %candidate.relative_path.display(), error = %e, "Runtime probe failed to start");
                return report.with_error(CheckError::Probe(e.to_string()));
            }
        };

        let uses_system_crypto = report
            .metadata
            .as_ref()
            .is_some_and(|m| m.uses_system_crypto);
        let verdict = evaluate(uses_system_crypto, probe.passed, self.host.fips_capable);
        debug!(
            path = %candidate.relative_path.display(),
            verdict = %verdict,
            "Candidate evaluated"
        );
        report.probe = Some(probe);
        report.verdict = Some(verdict);
        report
    }
}

pub struct Orchestrator<C> {
    checker: Arc<C>,
    gate: AdmissionGate,
}

impl<C: CandidateCheck> Orchestrator<C> {
    pub fn new(checker: C, max_parallel: usize) -> Self {
        Self {
            checker: Arc::new(checker),
            gate: AdmissionGate::new(max_parallel.max(1)),
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Check every candidate; reports come back in candidate order.
    ///
    /// Either every candidate has a report or the scan was cancelled and no
    /// report is returned.
    pub async fn run(
        &self,
        candidates: Vec<CandidateBinary>,
        cancel: &CancellationSignal,
    ) -> Result<Vec<BinaryReport>> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let started = Instant::now();
        let candidates: Arc<[CandidateBinary]> = candidates.into();
        let slots = Arc::new(ReportSlots::new(candidates.len()));
        let mut tasks = JoinSet::new();

        for index in 0..candidates.len() {
            if cancel.is_cancelled() {
                info!(dispatched = index, "Cancelled during dispatch");
                break;
            }

            let checker = Arc::clone(&self.checker);
            let gate = self.gate.clone();
            let slots = Arc::clone(&slots);
            let candidates = Arc::clone(&candidates);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let Some(_permit) = gate.acquire().await else {
                    return;
                };
                if cancel.is_cancelled() {
                    return;
                }
                let report = checker.check(&candidates[index]).await;
                slots.fill(index, report);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Check task panicked");
            }
        }

        if cancel.is_cancelled() {
            info!("Scan cancelled; discarding results");
            return Err(ScanError::Cancelled);
        }

        let reports = slots.take_reports(&candidates);
        info!(
            reports = reports.len(),
            peak_parallel = self.gate.peak(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Checks finished"
        );
        Ok(reports)
    }
}
