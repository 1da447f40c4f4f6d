//! Parallel file listing on top of jwalk.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};

use jwalk::{DirEntry, Parallelism, WalkDir};
use tracing::{debug, trace, warn};

use treemerge_core::{FileEntry, ScanConfig, ScanError, ScanWarning, WarningKind};

use crate::filter::EntryFilter;
use crate::listing::FileListing;

/// Lists regular files below a root with jwalk's rayon-backed walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct JwalkScanner;

impl JwalkScanner {
    pub fn new() -> Self {
        Self
    }

    /// List every regular file under the configured root.
    ///
    /// Fails only when the root itself cannot be used. Unreadable
    /// subdirectories and entries whose metadata cannot be read are recorded
    /// as warnings and the listing is returned partial.
    pub fn scan(&self, config: &ScanConfig) -> Result<FileListing, ScanError> {
        let started = Instant::now();
        let root = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }
        // jwalk reports an unlistable root as an ordinary entry error.
        std::fs::read_dir(&root).map_err(|e| ScanError::io(&root, e))?;

        let filter = Arc::new(EntryFilter::new(config)?);
        let walker = WalkDir::new(&root)
            .parallelism(parallelism_for(config.threads))
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .min_depth(1)
            .max_depth(config.max_depth.map_or(usize::MAX, |d| d as usize))
            .process_read_dir(move |_, _, _, children| {
                children.retain(|child| {
                    child.as_ref().map_or(true, |entry| {
                        !filter.rejects(entry.file_name(), &entry.path())
                    })
                });
            });

        let mut listing = FileListing {
            root,
            entries: Vec::new(),
            warnings: Vec::new(),
            dir_count: 0,
            scan_duration: Duration::ZERO,
        };

        for item in walker {
            match item {
                Ok(entry) => visit(entry, &mut listing),
                Err(err) => {
                    let path = err.path().map(PathBuf::from).unwrap_or_default();
                    let warning = match err.io_error().map(|e| e.kind()) {
                        Some(ErrorKind::PermissionDenied) => ScanWarning::permission_denied(path),
                        _ => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    warn!(path = %warning.path.display(), "{}", warning.message);
                    listing.warnings.push(warning);
                }
            }
        }

        listing.entries.sort_by(|a, b| a.path.cmp(&b.path));
        listing.scan_duration = started.elapsed();

        debug!(
            root = %listing.root.display(),
            files = listing.entries.len(),
            dirs = listing.dir_count,
            warnings = listing.warnings.len(),
            "Scan finished"
        );
        Ok(listing)
    }
}

fn parallelism_for(threads: usize) -> Parallelism {
    if threads == 0 {
        Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_millis(100),
        }
    } else {
        Parallelism::RayonNewPool(threads)
    }
}

/// Fold one walker entry into the listing. Directories are counted,
/// anything that is not a regular file is dropped.
fn visit(entry: DirEntry<((), ())>, listing: &mut FileListing) {
    let kind = entry.file_type();
    let path = entry.path();

    if kind.is_dir() {
        listing.dir_count += 1;
        return;
    }
    if !kind.is_file() {
        trace!(path = %path.display(), "Not a regular file");
        return;
    }

    match entry.metadata() {
        Ok(meta) => listing.entries.push(FileEntry::new(
            path,
            entry.file_name().to_string_lossy().into_owned(),
            meta.len(),
            meta.modified().unwrap_or(UNIX_EPOCH),
        )),
        Err(err) => listing.warnings.push(ScanWarning::new(
            path,
            err.to_string(),
            WarningKind::MetadataError,
        )),
    }
}
