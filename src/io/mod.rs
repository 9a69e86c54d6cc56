//! Bounded, memory-mapped access to candidate files.
//!
//! Executables under a root filesystem can be large; mapping them lets the
//! classifier and the provenance decoder look at headers and one data region
//! without copying the whole file.

pub mod error;

use crate::io::error::{IoError, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{trace, warn};

/// Maximum number of bytes searched for the provenance header (64KB).
pub const MAX_PROVENANCE_SEARCH: usize = 64 * 1024;

/// Resource limits for opening candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// Files larger than this are never mapped.
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// A read-only memory map of a file, bounded by `IOLimits`.
pub struct MappedFile {
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    size: u64,
}

impl MappedFile {
    /// Opens and maps `path`, failing if it exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        if size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: size,
            });
        }

        let mmap = if size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file. A concurrent writer can
            // change the bytes under us, which the parsers tolerate as malformed input.
            Some(unsafe { Mmap::map(&file)? })
        };

        trace!(path = %path.display(), size = size, "Mapped file");
        Ok(Self {
            mmap,
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The full mapped contents; empty for zero-length files.
    pub fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content).unwrap();
        temp_file
    }

    #[test]
    fn open_file_successfully() {
        let file = create_temp_file(b"hello world");
        let mapped = MappedFile::open(file.path(), &IOLimits::default()).unwrap();
        assert_eq!(mapped.size(), 11);
        assert_eq!(mapped.data(), b"hello world");
    }

    #[test]
    fn open_file_too_large() {
        let file = create_temp_file(&[0; 100]);
        let limits = IOLimits { max_file_size: 50 };
        let result = MappedFile::open(file.path(), &limits);
        assert!(matches!(result, Err(IoError::FileTooLarge { limit: 50, found: 100 })));
    }

    #[test]
    fn open_empty_file() {
        let file = create_temp_file(b"");
        let mapped = MappedFile::open(file.path(), &IOLimits::default()).unwrap();
        assert_eq!(mapped.size(), 0);
        assert!(mapped.data().is_empty());
        assert!(mapped.data().is_empty());
    }

    #[test]
    fn open_missing_file() {
        let result = MappedFile::open("/definitely/not/here", &IOLimits::default());
        assert!(matches!(result, Err(IoError::StdIo(_))));
    }
}
