//! Candidate classification.
//!
//! An entry is a candidate when it is executable, is an ELF image, and
//! exposes a toolchain provenance header. Failing any stage excludes it
//! silently. Executables whose toolchain embeds no provenance are never seen.

use crate::buildinfo;
use crate::io::error::IoError;
use crate::io::{IOLimits, MappedFile};
use object::FileKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::Metadata;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Type tag carried on every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryKind {
    GoBinary,
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryKind::GoBinary => f.write_str("gobinary"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BinaryClassifier {
    limits: IOLimits,
}

impl BinaryClassifier {
    pub fn new(limits: IOLimits) -> Self {
        Self { limits }
    }

    /// Classify a regular file whose metadata was already fetched.
    pub fn classify(&self, path: &Path, metadata: &Metadata) -> Option<BinaryKind> {
        if !is_executable(metadata) {
            trace!(path = %path.display(), "Not executable");
            return None;
        }

        let file = match MappedFile::open(path, &self.limits) {
            Ok(file) => file,
            Err(e @ IoError::FileTooLarge { .. }) => {
                warn!(path = %path.display(), error = %e, "Executable skipped: over size limit");
                return None;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot open executable");
                return None;
            }
        };

        if !matches!(FileKind::parse(file.data()), Ok(FileKind::Elf32 | FileKind::Elf64)) {
            trace!(path = %path.display(), "Not an ELF image");
            return None;
        }

        if !buildinfo::has_buildinfo(file.data()) {
            debug!(path = %path.display(), "ELF without toolchain provenance");
            return None;
        }

        debug!(path = %path.display(), size = file.size(), "Candidate accepted");
        Some(BinaryKind::GoBinary)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    true
}
