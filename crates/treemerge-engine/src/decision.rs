//! Per-file decisions and their records.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tracing::debug;

use treemerge_core::{FileEntry, NameConflictPolicy};
use treemerge_ops::auto_rename_path;

use crate::catalog::Catalog;
use crate::report::ConsolidateError;

/// What to do with one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No name or content match: move to `dest` in the target root.
    MoveAsNew { dest: PathBuf },
    /// Content already present at `original`: discard the source.
    SkipDuplicate { original: PathBuf },
    /// Same name, source strictly newer: replace `target` with the source.
    OverwriteWithNewer { target: PathBuf },
    /// Same name, target at least as new: discard the source.
    KeepNewerTarget { target: PathBuf },
    /// Same name, different content, renaming enabled: move to `dest`.
    RenameOnConflict { dest: PathBuf, conflict: PathBuf },
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Self::MoveAsNew { .. } => DecisionKind::MoveAsNew,
            Self::SkipDuplicate { .. } => DecisionKind::SkipDuplicate,
            Self::OverwriteWithNewer { .. } => DecisionKind::OverwriteWithNewer,
            Self::KeepNewerTarget { .. } => DecisionKind::KeepNewerTarget,
            Self::RenameOnConflict { .. } => DecisionKind::RenameOnConflict,
        }
    }

    /// Path the record reports for this decision.
    ///
    /// The destination for moves and overwrites, the existing copy for
    /// duplicates, nothing when the target simply wins.
    pub fn record_target(&self) -> Option<&Path> {
        match self {
            Self::MoveAsNew { dest } | Self::RenameOnConflict { dest, .. } => Some(dest),
            Self::OverwriteWithNewer { target } => Some(target),
            Self::SkipDuplicate { original } => Some(original),
            Self::KeepNewerTarget { .. } => None,
        }
    }
}

/// Fieldless form of [`Decision`], used in records and counters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DecisionKind {
    MoveAsNew,
    SkipDuplicate,
    OverwriteWithNewer,
    KeepNewerTarget,
    RenameOnConflict,
}

/// Result of applying a decision.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// The confirmation oracle said no; nothing was touched.
    Denied,
    #[strum(to_string = "failed: {message}")]
    Failed { message: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// One line of the run report: what happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub source: PathBuf,
    /// `None` when the file could not be classified at all.
    pub decision: Option<DecisionKind>,
    pub target: Option<PathBuf>,
    pub outcome: Outcome,
}

impl ActionRecord {
    pub fn new(source: impl Into<PathBuf>, decision: &Decision, outcome: Outcome) -> Self {
        Self {
            source: source.into(),
            decision: Some(decision.kind()),
            target: decision.record_target().map(Path::to_path_buf),
            outcome,
        }
    }

    /// Record for a file that failed before a decision was reached.
    pub fn unclassified(source: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            decision: None,
            target: None,
            outcome: Outcome::Failed {
                message: message.into(),
            },
        }
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.decision.as_ref().map_or("unclassified", |k| k.as_ref());
        write!(f, "{kind:<20} {}", self.source.display())?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target.display())?;
        }
        write!(f, " [{}]", self.outcome)
    }
}

/// Decide what happens to `source` given the current state of the target.
///
/// Content matches win over name matches. The source is only hashed when
/// the target holds a hashable file of the same size.
pub fn classify(
    catalog: &mut Catalog,
    source: &FileEntry,
    policy: NameConflictPolicy,
) -> Result<Decision, ConsolidateError> {
    if catalog.has_size(source.size) {
        catalog.ensure_fingerprints(source.size);
    }
    if catalog.has_size(source.size) {
        let hash = source.fingerprint()?;
        if let Some(original) = catalog.lookup_by_fingerprint(&hash).first() {
            debug!(
                source = %source.path.display(),
                original = %original.path.display(),
                hash = %hash.short(),
                "Content match"
            );
            return Ok(Decision::SkipDuplicate {
                original: original.path.clone(),
            });
        }
    }

    let name = source.file_name();
    let Some(existing) = catalog.lookup_by_name(name) else {
        return Ok(Decision::MoveAsNew {
            dest: catalog.root().join(name),
        });
    };

    match policy {
        NameConflictPolicy::KeepNewest if source.is_newer_than(existing) => {
            Ok(Decision::OverwriteWithNewer {
                target: existing.path.clone(),
            })
        }
        NameConflictPolicy::KeepNewest => Ok(Decision::KeepNewerTarget {
            target: existing.path.clone(),
        }),
        NameConflictPolicy::Rename => {
            let conflict = existing.path.clone();
            let wanted = catalog.root().join(name);
            let is_taken = |p: &Path| {
                p.file_name().is_some_and(|n| catalog.contains_name(n))
                    || std::fs::symlink_metadata(p).is_ok()
            };
            match auto_rename_path(&wanted, is_taken) {
                Some(dest) => Ok(Decision::RenameOnConflict { dest, conflict }),
                None => Err(ConsolidateError::NoFreeName { path: wanted }),
            }
        }
    }
}
