//! Static build metadata of a candidate.

use crate::buildinfo::{self, BuildInfo, BuildInfoError};
use crate::io::error::IoError;
use crate::io::{IOLimits, MappedFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Build setting recording whether native interop was enabled.
pub const CGO_SETTING: &str = "CGO_ENABLED";
/// Build setting listing the enabled toolchain experiments.
pub const EXPERIMENT_SETTING: &str = "GOEXPERIMENT";
/// Experiment that delegates crypto to the system library.
pub const SYSTEM_CRYPTO_EXPERIMENT: &str = "systemcrypto";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    BuildInfo(#[from] BuildInfoError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMetadata {
    pub go_version: String,
    /// Main module path; empty when the binary was built outside a module.
    pub module: String,
    pub module_version: String,
    pub cgo_enabled: bool,
    pub uses_system_crypto: bool,
    pub dependency_count: usize,
}

impl From<&BuildInfo> for StaticMetadata {
    fn from(info: &BuildInfo) -> Self {
        StaticMetadata {
            go_version: info.go_version.clone(),
            module: info.main.path.clone(),
            module_version: info.main.version.clone(),
            cgo_enabled: info.setting(CGO_SETTING) == Some("1"),
            uses_system_crypto: info
                .setting(EXPERIMENT_SETTING)
                .is_some_and(|v| v.contains(SYSTEM_CRYPTO_EXPERIMENT)),
            dependency_count: info.deps.len(),
        }
    }
}

/// Read and summarise the provenance of the executable at `path`.
pub fn extract(path: &Path, limits: &IOLimits) -> Result<StaticMetadata, ExtractionError> {
    let file = MappedFile::open(path, limits)?;
    let info = buildinfo::read(file.data())?;
    Ok(StaticMetadata::from(&info))
}
