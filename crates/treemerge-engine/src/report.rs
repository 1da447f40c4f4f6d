//! Run errors, counters and the final report.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use treemerge_core::{FingerprintError, ScanError, ScanWarning};
use treemerge_ops::ExecError;

use crate::decision::{ActionRecord, DecisionKind};

/// A per-file (or per-source-root) failure. None of these stop a run.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error(transparent)]
    UnreadableFile(#[from] FingerprintError),

    #[error("Source root skipped: {0}")]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Io(#[from] ExecError),

    #[error("Confirmation denied: {}", path.display())]
    ConfirmationDenied { path: PathBuf },

    #[error("No free name next to {}", path.display())]
    NoFreeName { path: PathBuf },
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationStats {
    pub files_seen: u64,
    pub moved: u64,
    pub renamed: u64,
    pub overwritten: u64,
    pub duplicates_skipped: u64,
    pub older_discarded: u64,
    pub denied: u64,
    pub failed: u64,
    /// Bytes placed into the target.
    pub bytes_moved: u64,
    /// Bytes removed from the sources without being placed.
    pub bytes_reclaimed: u64,
}

impl ConsolidationStats {
    /// Count one applied decision.
    pub fn record_applied(&mut self, kind: DecisionKind, bytes: u64) {
        match kind {
            DecisionKind::MoveAsNew => self.moved += 1,
            DecisionKind::RenameOnConflict => self.renamed += 1,
            DecisionKind::OverwriteWithNewer => self.overwritten += 1,
            DecisionKind::SkipDuplicate => self.duplicates_skipped += 1,
            DecisionKind::KeepNewerTarget => self.older_discarded += 1,
        }
        match kind {
            DecisionKind::MoveAsNew
            | DecisionKind::RenameOnConflict
            | DecisionKind::OverwriteWithNewer => self.bytes_moved += bytes,
            DecisionKind::SkipDuplicate | DecisionKind::KeepNewerTarget => {
                self.bytes_reclaimed += bytes
            }
        }
    }

    /// Files that changed location or were removed.
    pub fn applied(&self) -> u64 {
        self.moved + self.renamed + self.overwritten + self.duplicates_skipped + self.older_discarded
    }
}

/// Everything a run did, in processing order.
#[derive(Debug, Default, Serialize)]
pub struct ConsolidationReport {
    pub target: PathBuf,
    pub records: Vec<ActionRecord>,
    #[serde(serialize_with = "errors_as_strings")]
    pub errors: Vec<ConsolidateError>,
    pub warnings: Vec<ScanWarning>,
    pub stats: ConsolidationStats,
    /// Set when the run stopped early on request.
    pub cancelled: bool,
    pub duration: Duration,
}

impl ConsolidationReport {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Whether any per-file error occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records of a given decision kind.
    pub fn records_of(&self, kind: DecisionKind) -> impl Iterator<Item = &ActionRecord> {
        self.records
            .iter()
            .filter(move |r| r.decision == Some(kind))
    }

    pub(crate) fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub(crate) fn fail(&mut self, error: ConsolidateError) {
        self.stats.failed += 1;
        self.errors.push(error);
    }

    pub(crate) fn deny(&mut self, path: impl Into<PathBuf>) {
        self.stats.denied += 1;
        self.errors
            .push(ConsolidateError::ConfirmationDenied { path: path.into() });
    }
}

fn errors_as_strings<S: Serializer>(
    errors: &[ConsolidateError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
