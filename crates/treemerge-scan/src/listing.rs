//! Flat listing of the files under one root.

use std::path::PathBuf;
use std::time::Duration;

use treemerge_core::{FileEntry, ScanWarning};

/// Result of scanning one directory tree.
#[derive(Debug, Clone)]
pub struct FileListing {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Regular files, sorted lexicographically by full path.
    pub entries: Vec<FileEntry>,
    /// Non-fatal problems met during the walk.
    pub warnings: Vec<ScanWarning>,
    /// Directories visited below the root.
    pub dir_count: u64,
    /// Time taken by the walk.
    pub scan_duration: Duration,
}

impl FileListing {
    /// Number of files listed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size of all listed files.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Whether the walk was incomplete in any way.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}
