//! Per-binary reports and their ordered aggregation.

use crate::classify::BinaryKind;
use crate::error::CheckError;
use crate::evaluate::ComplianceVerdict;
use crate::metadata::StaticMetadata;
use crate::probe::RuntimeProbeResult;
use crate::walk::CandidateBinary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Outcome of checking one candidate.
///
/// A report carries a verdict or an error, never both. An error means the
/// verdict is unknown, which is not the same as `NOT_COMPLIANT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryReport {
    pub relative_path: PathBuf,
    pub kind: BinaryKind,
    pub metadata: Option<StaticMetadata>,
    pub probe: Option<RuntimeProbeResult>,
    pub verdict: Option<ComplianceVerdict>,
    pub error: Option<CheckError>,
}

impl BinaryReport {
    pub fn new(candidate: &CandidateBinary) -> Self {
        Self {
            relative_path: candidate.relative_path.clone(),
            kind: candidate.kind,
            metadata: None,
            probe: None,
            verdict: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: CheckError) -> Self {
        self.verdict = None;
        self.error = Some(error);
        self
    }

    pub fn is_compliant(&self) -> bool {
        self.verdict.as_ref().is_some_and(ComplianceVerdict::is_compliant)
    }
}

/// Fixed-size, write-once slots indexed by discovery order.
#[derive(Debug)]
pub struct ReportSlots {
    slots: Mutex<Vec<Option<BinaryReport>>>,
}

impl ReportSlots {
    pub fn new(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; len]),
        }
    }

    /// Store `report` at `index`. Returns false, keeping the first write,
    /// if the slot was already filled or does not exist.
    pub fn fill(&self, index: usize, report: BinaryReport) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(report);
                true
            }
            Some(_) => {
                warn!(index = index, "Report slot already written");
                false
            }
            None => {
                warn!(index = index, "Report slot out of range");
                false
            }
        }
    }

    /// Drain the reports in index order. A slot nobody wrote becomes an
    /// error report for its candidate, so the output always has one entry
    /// per candidate.
    pub fn take_reports(&self, candidates: &[CandidateBinary]) -> Vec<BinaryReport> {
        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner));
        slots
            .into_iter()
            .zip(candidates)
            .map(|(slot, candidate)| {
                slot.unwrap_or_else(|| {
                    BinaryReport::new(candidate).with_error(CheckError::TaskFailed(
                        "check task ended without a report".to_string(),
                    ))
                })
            })
            .collect()
    }
}

/// Aggregate counts over a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub uses_system_crypto: usize,
    pub failed_runtime_check: usize,
    pub compliant: usize,
    pub errors: usize,
}

impl ScanSummary {
    pub fn from_reports(reports: &[BinaryReport]) -> Self {
        let mut summary = ScanSummary {
            total: reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.metadata.as_ref().is_some_and(|m| m.uses_system_crypto) {
                summary.uses_system_crypto += 1;
            }
            if report.probe.as_ref().is_some_and(|p| !p.passed) {
                summary.failed_runtime_check += 1;
            }
            if report.is_compliant() {
                summary.compliant += 1;
            }
            if report.error.is_some() {
                summary.errors += 1;
            }
        }
        summary
    }
}
