//! The consolidation loop.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use treemerge_core::{
    Confirm, ConfirmAction, ConfirmRequest, ConsolidateConfig, FileEntry, ScanError, ScanWarning,
    WarningKind,
};
use treemerge_ops::{ActionExecutor, ExecError};
use treemerge_scan::{FileListing, JwalkScanner};

use crate::catalog::Catalog;
use crate::decision::{classify, ActionRecord, Decision, Outcome};
use crate::report::ConsolidationReport;

type Observer<'a> = Box<dyn FnMut(&ActionRecord) + 'a>;

/// Moves every file of the source roots into the target root.
///
/// One decision per source file, applied immediately, in processing order.
/// Source roots are taken in the order given and files within a root in
/// lexicographic path order, so root order comes before path order.
/// Destructive steps (overwrite, discarding a source) are put to the
/// [`Confirm`] oracle first.
pub struct ConsolidationEngine<'a> {
    config: ConsolidateConfig,
    executor: ActionExecutor,
    confirm: &'a mut dyn Confirm,
    cancel: Arc<AtomicBool>,
    observer: Option<Observer<'a>>,
}

impl<'a> ConsolidationEngine<'a> {
    pub fn new(config: ConsolidateConfig, confirm: &'a mut dyn Confirm) -> Self {
        let executor = ActionExecutor::new().with_delete_mode(config.delete_mode);
        Self {
            config,
            executor,
            confirm,
            cancel: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    /// Share a cancellation flag. Once set, the run stops before the next file.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Call `observer` with every record as soon as it is produced.
    pub fn with_observer(mut self, observer: impl FnMut(&ActionRecord) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Handle to the cancellation flag.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Build the target catalog and consolidate every source root into it.
    ///
    /// Only a target that cannot be scanned is an error; everything else is
    /// collected in the report.
    pub fn run(self) -> Result<ConsolidationReport, ScanError> {
        let mut catalog = Catalog::build(&self.config.scan_config(&self.config.target))?;
        Ok(self.consolidate(&mut catalog))
    }

    /// Consolidate into an already built catalog, keeping it current.
    pub fn consolidate(mut self, catalog: &mut Catalog) -> ConsolidationReport {
        let start = Instant::now();
        let target = catalog.root().to_path_buf();
        let mut report = ConsolidationReport::new(&target);
        report.warnings = catalog.take_warnings();

        info!(
            target = %target.display(),
            files = catalog.len(),
            sources = self.config.sources.len(),
            "Consolidating"
        );

        let sources = self.config.sources.clone();
        'roots: for root in &sources {
            if self.cancelled(&mut report) {
                break;
            }
            let Some(listing) = self.scan_source(root, &target, &mut report) else {
                continue;
            };
            report.warnings.extend(listing.warnings);

            for entry in &listing.entries {
                if self.cancelled(&mut report) {
                    break 'roots;
                }
                report.stats.files_seen += 1;
                self.process(catalog, entry, &mut report);
            }
        }

        report.warnings.extend(catalog.take_warnings());
        report.duration = start.elapsed();

        let stats = &report.stats;
        info!(
            seen = stats.files_seen,
            moved = stats.moved,
            renamed = stats.renamed,
            overwritten = stats.overwritten,
            duplicates = stats.duplicates_skipped,
            discarded = stats.older_discarded,
            failed = stats.failed,
            denied = stats.denied,
            cancelled = report.cancelled,
            elapsed_ms = report.duration.as_millis() as u64,
            "Consolidation finished"
        );
        report
    }

    fn cancelled(&self, report: &mut ConsolidationReport) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            if !report.cancelled {
                warn!("Cancelled; stopping before the next file");
            }
            report.cancelled = true;
        }
        report.cancelled
    }

    /// List one source root, or explain why it is skipped.
    fn scan_source(
        &self,
        root: &Path,
        target: &Path,
        report: &mut ConsolidationReport,
    ) -> Option<FileListing> {
        let canonical = match root.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot open source root");
                report.fail(ScanError::io(root, e).into());
                return None;
            }
        };

        if canonical == target {
            warn!(root = %root.display(), "Source root is the target, skipping");
            report.warnings.push(ScanWarning::new(
                root,
                "source root is the target root",
                WarningKind::SkippedRoot,
            ));
            return None;
        }
        if canonical.starts_with(target) {
            warn!(root = %root.display(), "Source root lies inside the target, skipping");
            report.warnings.push(ScanWarning::new(
                root,
                "source root lies inside the target root",
                WarningKind::SkippedRoot,
            ));
            return None;
        }

        let mut scan = self.config.scan_config(&canonical);
        if target.starts_with(&canonical) {
            debug!(root = %canonical.display(), "Excluding nested target from source");
            scan.exclude_paths.push(target.to_path_buf());
        }

        match JwalkScanner::new().scan(&scan) {
            Ok(listing) => {
                debug!(root = %listing.root.display(), files = listing.len(), "Source scanned");
                Some(listing)
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot scan source root");
                report.fail(e.into());
                None
            }
        }
    }

    fn process(&mut self, catalog: &mut Catalog, entry: &FileEntry, report: &mut ConsolidationReport) {
        let decision = match classify(catalog, entry, self.config.name_conflicts) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "Skipping file");
                self.emit(report, ActionRecord::unclassified(&entry.path, e.to_string()));
                report.fail(e);
                return;
            }
        };
        debug!(path = %entry.path.display(), decision = %decision.kind(), "Classified");

        if let Some(request) = confirmation_for(catalog, entry, &decision) {
            if !self.confirm.confirm(&request) {
                self.emit(report, ActionRecord::new(&entry.path, &decision, Outcome::Denied));
                report.deny(&entry.path);
                return;
            }
        }

        let outcome = match self.apply(catalog, entry, &decision) {
            Ok(bytes) => {
                report.stats.record_applied(decision.kind(), bytes);
                Outcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                report.fail(e.into());
                Outcome::Failed { message }
            }
        };
        self.emit(report, ActionRecord::new(&entry.path, &decision, outcome));
    }

    /// Carry out a decision and bring the catalog up to date.
    fn apply(&self, catalog: &mut Catalog, entry: &FileEntry, decision: &Decision) -> Result<u64, ExecError> {
        match decision {
            Decision::MoveAsNew { dest } | Decision::RenameOnConflict { dest, .. } => {
                let result = self.executor.place_new(&entry.path, dest);
                settle(catalog, entry, dest, &result);
                result
            }
            Decision::OverwriteWithNewer { target } => {
                let result = self.executor.replace(&entry.path, target);
                settle(catalog, entry, target, &result);
                result
            }
            Decision::SkipDuplicate { .. } | Decision::KeepNewerTarget { .. } => {
                self.executor.discard(&entry.path)
            }
        }
    }

    fn emit(&mut self, report: &mut ConsolidationReport, record: ActionRecord) {
        match &record.outcome {
            Outcome::Applied | Outcome::Denied => info!("{record}"),
            Outcome::Failed { .. } => warn!("{record}"),
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(&record);
        }
        report.push(record);
    }
}

/// Catalog update after a placement attempt.
fn settle(catalog: &mut Catalog, entry: &FileEntry, dest: &Path, result: &Result<u64, ExecError>) {
    match result {
        Ok(_) => catalog.record_move(entry.relocated(dest)),
        Err(e) if e.destination_written() => catalog.record_move(entry.relocated(dest)),
        Err(_) => catalog.resync(dest),
    }
}

/// The question to ask before a destructive decision, if any.
fn confirmation_for(catalog: &Catalog, entry: &FileEntry, decision: &Decision) -> Option<ConfirmRequest> {
    let time_of = |path: &Path| {
        catalog
            .get(path)
            .map(|e| ConfirmRequest::format_time(e.modified))
            .unwrap_or_default()
    };

    match decision {
        Decision::MoveAsNew { .. } | Decision::RenameOnConflict { .. } => None,
        Decision::OverwriteWithNewer { target } => Some(ConfirmRequest::new(
            ConfirmAction::Overwrite,
            target,
            format!(
                "{}, with {} from {}",
                time_of(target),
                entry.path.display(),
                ConfirmRequest::format_time(entry.modified)
            ),
        )),
        Decision::SkipDuplicate { original } => Some(ConfirmRequest::new(
            ConfirmAction::DeleteDuplicate,
            &entry.path,
            format!("same content as {}", original.display()),
        )),
        Decision::KeepNewerTarget { target } => Some(ConfirmRequest::new(
            ConfirmAction::DiscardOlder,
            &entry.path,
            format!(
                "{}, keeping {} from {}",
                ConfirmRequest::format_time(entry.modified),
                target.display(),
                time_of(target)
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use treemerge_core::AutoConfirm;

    fn layout() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("X");
        let source = temp.path().join("Y1");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&source).unwrap();
        (temp, target, source)
    }

    #[test]
    fn test_source_equal_to_target_is_skipped() {
        let (_temp, target, _) = layout();
        fs::write(target.join("a.txt"), "hi").unwrap();
        let config = ConsolidateConfig::new(&target, vec![target.clone()]);

        let report = ConsolidationEngine::new(config, &mut AutoConfirm).run().unwrap();

        assert!(report.records.is_empty());
        assert!(report.warnings.iter().any(|w| w.kind == WarningKind::SkippedRoot));
        assert!(target.join("a.txt").exists());
    }

    #[test]
    fn test_nested_target_is_excluded() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("Y");
        let target = source.join("X");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("kept.txt"), "kept").unwrap();
        fs::create_dir(source.join("sub")).unwrap();
        fs::write(source.join("sub/a.txt"), "hi").unwrap();
        let config = ConsolidateConfig::new(&target, vec![source.clone()]);

        let report = ConsolidationEngine::new(config, &mut AutoConfirm).run().unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "hi");
        assert_eq!(fs::read_to_string(target.join("kept.txt")).unwrap(), "kept");
    }

    #[test]
    fn test_missing_source_root_is_reported() {
        let (temp, target, source) = layout();
        fs::write(source.join("a.txt"), "hi").unwrap();
        let config = ConsolidateConfig::new(&target, vec![temp.path().join("nope"), source]);

        let report = ConsolidationEngine::new(config, &mut AutoConfirm).run().unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.stats.moved, 1);
    }

    #[test]
    fn test_observer_sees_every_record() {
        let (_temp, target, source) = layout();
        fs::write(source.join("a.txt"), "a").unwrap();
        fs::write(source.join("b.txt"), "b").unwrap();
        let config = ConsolidateConfig::new(&target, vec![source]);

        let mut seen = Vec::new();
        let report = ConsolidationEngine::new(config, &mut AutoConfirm)
            .with_observer(|record| seen.push(record.source.clone()))
            .run()
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(report.records.len(), 2);
        assert!(seen[0] < seen[1]);
    }

    #[test]
    fn test_cancel_before_start() {
        let (_temp, target, source) = layout();
        fs::write(source.join("a.txt"), "a").unwrap();
        let config = ConsolidateConfig::new(&target, vec![source.clone()]);
        let cancel = Arc::new(AtomicBool::new(true));

        let report = ConsolidationEngine::new(config, &mut AutoConfirm)
            .with_cancel_flag(cancel)
            .run()
            .unwrap();

        assert!(report.cancelled);
        assert!(report.records.is_empty());
        assert!(source.join("a.txt").exists());
    }
}
