//! File name sanitizing.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use treemerge_core::{Confirm, ConfirmAction, ConfirmRequest, RuleConfig, ScanConfig};
use treemerge_scan::JwalkScanner;

use crate::conflict::auto_rename_path;
use crate::executor::ActionExecutor;
use crate::outcome::{PassSummary, PathFailure, FsOp};

/// Replace tricky characters in the names of all files under `roots`.
///
/// When the cleaned name is already taken the file gets a numbered name
/// instead ("a_b_(1).txt" with the default rules). Directory names and
/// names that are not valid UTF-8 are left alone.
pub fn sanitize_names(
    roots: &[PathBuf],
    rules: &RuleConfig,
    executor: &ActionExecutor,
    confirm: &mut dyn Confirm,
) -> PassSummary {
    let mut summary = PassSummary::new(FsOp::Rename);
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
            // Undecodable names cannot be rewritten without losing bytes.
            let Some(name) = entry.file_name().to_str() else {
                debug!(path = %entry.path.display(), "Name is not UTF-8, leaving it alone");
                continue;
            };
            if !rules.has_tricky_chars(name) {
                continue;
            }

            let clean = rules.sanitize_name(name);
            if clean.is_empty() || clean == "." || clean == ".." {
                summary.add_error(PathFailure::new(
                    entry.path.clone(),
                    format!("sanitized name '{clean}' is not usable"),
                ));
                continue;
            }

            let wanted = entry.path.with_file_name(&clean);
            let dest = if wanted.exists() {
                // Numbered names are cleaned too, so a later run leaves them be.
                let cleaned = |p: &Path| {
                    let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    p.with_file_name(rules.sanitize_name(&name))
                };
                match auto_rename_path(&wanted, |p| cleaned(p).exists()).map(|p| cleaned(&p)) {
                    Some(dest) => dest,
                    None => {
                        summary.add_error(PathFailure::new(
                            entry.path.clone(),
                            "no free name left",
                        ));
                        continue;
                    }
                }
            } else {
                wanted
            };

            let new_name = dest
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let request = ConfirmRequest::new(ConfirmAction::Rename, &entry.path, format!("-> {new_name}"));
            if !confirm.confirm(&request) {
                summary.declined += 1;
                continue;
            }

            match executor.rename(&entry.path, &dest) {
                Ok(()) => {
                    info!(from = %entry.path.display(), to = %new_name, "Renamed");
                    summary.succeeded += 1;
                }
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "Rename failed");
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
    use tempfile::TempDir;
    use treemerge_core::{AutoConfirm, DenyAll};

    #[test]
    fn test_sanitize_tricky_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("file:name.txt"), "Tricky content").unwrap();
        fs::write(root.join("money$file.txt"), "Cash content").unwrap();
        fs::write(root.join("plain.txt"), "plain").unwrap();

        let summary = sanitize_names(
            &[root.to_path_buf()],
            &RuleConfig::default(),
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 2);
        assert_eq!(fs::read_to_string(root.join("file_name.txt")).unwrap(), "Tricky content");
        assert_eq!(fs::read_to_string(root.join("money_file.txt")).unwrap(), "Cash content");
        assert!(root.join("plain.txt").exists());
    }

    #[test]
    fn test_sanitize_collision_gets_number() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a b.txt"), "spaced").unwrap();
        fs::write(root.join("a_b.txt"), "existing").unwrap();

        let summary = sanitize_names(
            &[root.to_path_buf()],
            &RuleConfig::default(),
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 1);
        assert_eq!(fs::read_to_string(root.join("a_b.txt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("a_b_(1).txt")).unwrap(), "spaced");
    }

    #[test]
    fn test_sanitize_declined() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("star*file.txt"), "Star content").unwrap();

        let summary = sanitize_names(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            &ActionExecutor::new(),
            &mut DenyAll,
        );

        assert_eq!(summary.declined, 1);
        assert!(temp.path().join("star*file.txt").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_undecodable_name_is_left_alone() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let raw = temp.path().join(OsStr::from_bytes(b"a b\xff.txt"));
        fs::write(&raw, "latin-1 leftovers").unwrap();

        let summary = sanitize_names(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            &ActionExecutor::new(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 0);
        assert!(!summary.has_errors());
        assert!(raw.exists());
    }
}
