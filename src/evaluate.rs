//! Compliance evaluation.
//!
//! Combines the static build signal, the runtime probe outcome and the host
//! capability into a verdict. Checks run in a fixed priority order, so the
//! first failing condition names the reason.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall verdict for one executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Compliant,
    NotCompliant,
}

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// Built without delegating crypto to the system library
    CryptoBackendNotEngaged,
    /// Refused to start with strict validated-module mode enforced
    RuntimeRefusedStrictMode,
    /// Everything else held, but the host module is not validated
    HostLacksValidatedModule,
    /// All signals positive; depends on the host module's own certification
    Tentative,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            VerdictReason::CryptoBackendNotEngaged => "crypto backend not engaged.",
            VerdictReason::RuntimeRefusedStrictMode => "runtime refused strict mode.",
            VerdictReason::HostLacksValidatedModule => {
                "host lacks a validated cryptographic module."
            }
            VerdictReason::Tentative => {
                "tentatively compliant; depends on external validation of the host module."
            }
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub verdict: Verdict,
    pub reason: VerdictReason,
}

impl ComplianceVerdict {
    pub fn is_compliant(&self) -> bool {
        self.verdict == Verdict::Compliant
    }
}

impl fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.verdict {
            Verdict::Compliant => "COMPLIANT",
            Verdict::NotCompliant => "NOT_COMPLIANT",
        };
        write!(f, "{}: {}", label, self.reason)
    }
}

/// Pure verdict function.
pub fn evaluate(
    uses_system_crypto: bool,
    runtime_probe_passed: bool,
    host_fips_capable: bool,
) -> ComplianceVerdict {
    let not_compliant = |reason| ComplianceVerdict {
        verdict: Verdict::NotCompliant,
        reason,
    };

    if !uses_system_crypto {
        return not_compliant(VerdictReason::CryptoBackendNotEngaged);
    }
    if !runtime_probe_passed {
        return not_compliant(VerdictReason::RuntimeRefusedStrictMode);
    }
    if !host_fips_capable {
        return not_compliant(VerdictReason::HostLacksValidatedModule);
    }
    ComplianceVerdict {
        verdict: Verdict::Compliant,
        reason: VerdictReason::Tentative,
    }
}
