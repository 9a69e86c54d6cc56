//! Host cryptographic capability.
//!
//! Detecting whether the host ships a validated cryptographic module is done
//! by the embedding application. The scanner asks its provider exactly once
//! per scan and shares the resulting value read-only with every check.

use serde::{Deserialize, Serialize};
use tracing::info;

/// What the host's cryptographic library can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapability {
    pub fips_capable: bool,
    pub library_version: String,
}

impl HostCapability {
    pub fn new(fips_capable: bool, library_version: impl Into<String>) -> Self {
        Self {
            fips_capable,
            library_version: library_version.into(),
        }
    }
}

/// Source of the host capability.
pub trait HostCapabilityProvider {
    fn detect(&self) -> HostCapability;
}

/// Provider returning a value computed up front.
#[derive(Debug, Clone)]
pub struct StaticHostProvider(pub HostCapability);

impl HostCapabilityProvider for StaticHostProvider {
    fn detect(&self) -> HostCapability {
        self.0.clone()
    }
}

impl<F> HostCapabilityProvider for F
where
    F: Fn() -> HostCapability,
{
    fn detect(&self) -> HostCapability {
        self()
    }
}

/// Ask `provider` once and log the answer.
pub(crate) fn detect_once(provider: &dyn HostCapabilityProvider) -> HostCapability {
    let host = provider.detect();
    info!(
        fips_capable = host.fips_capable,
        library_version = %host.library_version,
        "Host capability detected"
    );
    host
}
