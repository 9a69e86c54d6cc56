//! Directory walk producing candidates.
//!
//! Entries that cannot be read are logged and skipped. Excluded prefixes are
//! pruned before descent, so virtual filesystems such as `/proc` are never
//! entered. Symbolic links are neither followed nor classified.

use crate::cancel::CancellationSignal;
use crate::classify::{BinaryClassifier, BinaryKind};
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file accepted for checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBinary {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub kind: BinaryKind,
}

pub struct DirectoryScanner {
    root: PathBuf,
    excluded_prefixes: Vec<PathBuf>,
    classifier: BinaryClassifier,
}

impl DirectoryScanner {
    /// Resolve `root` to an absolute path and check it is readable.
    pub fn new(
        root: impl AsRef<Path>,
        excluded_prefixes: Vec<PathBuf>,
        classifier: BinaryClassifier,
    ) -> Result<Self> {
        let root = root.as_ref();
        let root_error = |source| ScanError::Root {
            path: root.to_path_buf(),
            source,
        };
        let absolute = std::path::absolute(root).map_err(root_error)?;
        std::fs::metadata(&absolute).map_err(root_error)?;

        Ok(Self {
            root: absolute,
            excluded_prefixes,
            classifier,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lies under one of the excluded prefixes.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Walk the tree and classify every regular file. Siblings are visited in
    /// file-name order, so discovery order is stable across runs.
    pub fn collect(&self, cancel: &CancellationSignal) -> Result<Vec<CandidateBinary>> {
        let mut candidates = Vec::new();
        let mut visited = 0usize;
        let mut skipped = 0usize;

        let mut entries = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = entries.next() {
            if cancel.is_cancelled() {
                info!(visited = visited, "Walk cancelled");
                return Err(ScanError::Cancelled);
            }
            visited += 1;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        path = ?e.path().map(Path::display),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    skipped += 1;
                    continue;
                }
            };

            if self.is_excluded(entry.path()) {
                debug!(path = %entry.path().display(), "Excluded prefix");
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    skipped += 1;
                    continue;
                }
            };

            if let Some(kind) = self.classifier.classify(entry.path(), &metadata) {
                candidates.push(CandidateBinary {
                    relative_path: self.relative(entry.path()),
                    path: entry.into_path(),
                    kind,
                });
            }
        }

        info!(
            root = %self.root.display(),
            visited = visited,
            skipped = skipped,
            candidates = candidates.len(),
            "Walk finished"
        );
        Ok(candidates)
    }

    fn relative(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path.to_path_buf(),
        }
    }
}
