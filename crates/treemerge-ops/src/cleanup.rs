//! Junk file removal (empty files and temporary files).

use std::path::PathBuf;

use strum::Display;
use tracing::{info, warn};

use treemerge_core::{Confirm, ConfirmAction, ConfirmRequest, FileEntry, RuleConfig, ScanConfig};
use treemerge_scan::JwalkScanner;

use crate::executor::ActionExecutor;
use crate::outcome::{PassSummary, PathFailure, FsOp};

/// Which kinds of junk to remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JunkOptions {
    /// Remove zero-byte files.
    pub empty: bool,
    /// Remove files with a temporary suffix.
    pub temporary: bool,
}

/// Why a file counts as junk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JunkKind {
    #[strum(to_string = "empty file")]
    Empty,
    #[strum(to_string = "temporary file")]
    Temporary,
}

impl JunkKind {
    /// Classify a file. Emptiness is checked first.
    pub fn classify(entry: &FileEntry, rules: &RuleConfig, options: JunkOptions) -> Option<Self> {
        if options.empty && entry.size == 0 {
            Some(Self::Empty)
        } else if options.temporary && rules.is_temp_name(&entry.name) {
            Some(Self::Temporary)
        } else {
            None
        }
    }
}

/// Delete junk files under every root, asking before each deletion.
pub fn remove_junk(
    roots: &[PathBuf],
    rules: &RuleConfig,
    options: JunkOptions,
    executor: &ActionExecutor,
    confirm: &mut dyn Confirm,
) -> PassSummary {
    let mut summary = PassSummary::new(FsOp::Delete);
    if options == JunkOptions::default() {
        return summary;
    }

    let scanner = JwalkScanner::new();
    for root in roots {
        let listing = match scanner.scan(&ScanConfig::new(root)) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping root");
                summary.add_error(PathFailure::new(root.clone(), e.to_string()));
                continue;
            }
        };

        for entry in &listing.entries {
            let Some(kind) = JunkKind::classify(entry, rules, options) else {
                continue;
            };

            let request = ConfirmRequest::new(ConfirmAction::DeleteJunk, &entry.path, kind.to_string());
            if !confirm.confirm(&request) {
                summary.declined += 1;
                continue;
            }

            match executor.discard(&entry.path) {
                Ok(bytes) => {
                    info!(path = %entry.path.display(), kind = %kind, "Deleted junk");
                    summary.succeeded += 1;
                    summary.bytes_processed += bytes;
                }
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "Could not delete junk");
                    summary.add_error(PathFailure::new(entry.path.clone(), e.to_string()));
                }
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;
    use treemerge_core::{AutoConfirm, DenyAll};

    fn junk_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("empty_file.txt"), "").unwrap();
        fs::write(root.join("cache.tmp"), "temporary data").unwrap();
        fs::write(root.join("sub/backup.BAK"), "backup data").unwrap();
        fs::write(root.join("keep.txt"), "keep me").unwrap();
        temp
    }

    #[test]
    fn test_classify_prefers_empty() {
        let rules = RuleConfig::default();
        let all = JunkOptions { empty: true, temporary: true };
        let empty_tmp = FileEntry::new("/y/x.tmp", "x.tmp", 0, SystemTime::now());

        assert_eq!(JunkKind::classify(&empty_tmp, &rules, all), Some(JunkKind::Empty));
        assert_eq!(
            JunkKind::classify(&empty_tmp, &rules, JunkOptions { empty: false, temporary: true }),
            Some(JunkKind::Temporary)
        );
        assert_eq!(JunkKind::classify(&empty_tmp, &rules, JunkOptions::default()), None);
    }

    #[test]
    fn test_remove_all_junk() {
        let temp = junk_tree();
        let options = JunkOptions { empty: true, temporary: true };

        let summary = remove_junk(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            options,
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.bytes_processed, 14 + 11);
        assert!(!temp.path().join("empty_file.txt").exists());
        assert!(!temp.path().join("cache.tmp").exists());
        assert!(!temp.path().join("sub/backup.BAK").exists());
        assert!(temp.path().join("keep.txt").exists());
    }

    #[test]
    fn test_only_empty() {
        let temp = junk_tree();
        let options = JunkOptions { empty: true, temporary: false };

        let summary = remove_junk(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            options,
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 1);
        assert!(temp.path().join("cache.tmp").exists());
    }

    #[test]
    fn test_declined() {
        let temp = junk_tree();
        let options = JunkOptions { empty: true, temporary: true };

        let summary = remove_junk(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            options,
            &ActionExecutor::new(),
            &mut DenyAll,
        );

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.declined, 3);
        assert!(temp.path().join("cache.tmp").exists());
    }

    #[test]
    fn test_missing_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let summary = remove_junk(
            &[temp.path().join("missing")],
            &RuleConfig::default(),
            JunkOptions { empty: true, temporary: false },
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );
        assert_eq!(summary.failed, 1);
    }
}
