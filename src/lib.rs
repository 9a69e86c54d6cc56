//! Scanner for toolchain-built executables that must run with a validated
//! cryptographic module.
//!
//! A scan walks a directory tree, picks out ELF executables carrying Go build
//! provenance, reads their build settings, starts each one briefly with
//! strict mode requested, and combines both observations with the host's
//! capability into a per-binary verdict.

pub mod buildinfo;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod host;
pub mod io;
pub mod logging;
pub mod metadata;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod scan;
pub mod timeout;
pub mod walk;

pub use cancel::CancellationSignal;
pub use classify::{BinaryClassifier, BinaryKind};
pub use config::{ProbeConfig, ScanConfig};
pub use error::{CheckError, Result, ScanError};
pub use evaluate::{evaluate, ComplianceVerdict, Verdict, VerdictReason};
pub use host::{HostCapability, HostCapabilityProvider, StaticHostProvider};
pub use metadata::StaticMetadata;
pub use probe::{Probe, ProbeError, RuntimeProbe, RuntimeProbeResult, Termination};
pub use report::{BinaryReport, ScanSummary};
pub use scan::{scan, Scanner};
pub use walk::{CandidateBinary, DirectoryScanner};
