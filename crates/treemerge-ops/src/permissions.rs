//! Permission normalization.

use std::path::PathBuf;

use treemerge_core::{Confirm, RuleConfig};

use crate::outcome::PassSummary;

/// Set the mode of every file under `roots` to `rules.permissions`.
///
/// Only the permission bits (`0o7777`) are compared. On non-Unix platforms
/// this is a no-op.
pub fn normalize_permissions(
    roots: &[PathBuf],
    rules: &RuleConfig,
    confirm: &mut dyn Confirm,
) -> PassSummary {
    #[cfg(unix)]
    {
        unix::normalize(roots, rules, confirm)
    }

    #[cfg(not(unix))]
    {
        let _ = (roots, rules, confirm);
        tracing::warn!("Permission normalization is only supported on Unix");
        PassSummary::new(crate::outcome::FsOp::Chmod)
    }
}

#[cfg(unix)]
mod unix {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use tracing::{info, warn};

    use treemerge_core::{Confirm, ConfirmAction, ConfirmRequest, RuleConfig, ScanConfig};
    use treemerge_scan::JwalkScanner;

    use crate::outcome::{PassSummary, PathFailure, FsOp};

    pub(super) fn normalize(
        roots: &[PathBuf],
        rules: &RuleConfig,
        confirm: &mut dyn Confirm,
    ) -> PassSummary {
        let mut summary = PassSummary::new(FsOp::Chmod);
        let target_mode = rules.permissions & 0o7777;
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
                let current = match fs::metadata(&entry.path) {
                    Ok(m) => m.permissions().mode() & 0o7777,
                    Err(e) => {
                        summary.add_error(PathFailure::new(entry.path.clone(), e.to_string()));
                        continue;
                    }
                };
                if current == target_mode {
                    continue;
                }

                let request = ConfirmRequest::new(
                    ConfirmAction::ChangePermissions,
                    &entry.path,
                    format!("{current:o} -> {target_mode:o}"),
                );
                if !confirm.confirm(&request) {
                    summary.declined += 1;
                    continue;
                }

                match fs::set_permissions(&entry.path, fs::Permissions::from_mode(target_mode)) {
                    Ok(()) => {
                        info!(
                            path = %entry.path.display(),
                            from = format!("{current:o}"),
                            to = format!("{target_mode:o}"),
                            "Fixed permissions"
                        );
                        summary.succeeded += 1;
                    }
                    Err(e) => {
                        warn!(path = %entry.path.display(), error = %e, "chmod failed");
                        summary.add_error(PathFailure::new(entry.path.clone(), e.to_string()));
                    }
                }
            }
        }

        summary
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;
    use treemerge_core::{AutoConfirm, DenyAll};

    fn mode(path: &std::path::Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_normalize_permissions() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("script.sh");
        let fine = temp.path().join("fine.txt");
        fs::write(&script, "#!/bin/bash").unwrap();
        fs::write(&fine, "ok").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o777)).unwrap();
        fs::set_permissions(&fine, fs::Permissions::from_mode(0o644)).unwrap();

        let summary = normalize_permissions(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            &mut AutoConfirm,
        );

        assert_eq!(summary.succeeded, 1);
        assert_eq!(mode(&script), 0o644);
        assert_eq!(mode(&fine), 0o644);
    }

    #[test]
    fn test_normalize_declined() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("script.sh");
        fs::write(&script, "#!/bin/bash").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let summary = normalize_permissions(
            &[temp.path().to_path_buf()],
            &RuleConfig::default(),
            &mut DenyAll,
        );

        assert_eq!(summary.declined, 1);
        assert_eq!(mode(&script), 0o755);
    }
}
