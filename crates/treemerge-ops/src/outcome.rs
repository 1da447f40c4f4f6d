//! Executor errors and cleanup pass summaries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Filesystem call an executor error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum FsOp {
    Move,
    Replace,
    Delete,
    Rename,
    Chmod,
}

/// Failure of a single executor call.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Nothing was changed for this file.
    #[error("{op} failed at {}: {source}", path.display())]
    Io {
        op: FsOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination of a new placement is already taken.
    #[error("{} is already taken", path.display())]
    AlreadyExists { path: PathBuf },

    /// The copy reached its destination but the source could not be removed.
    #[error("{} copied to {} but left behind: {source}", path.display(), destination.display())]
    SourceNotRemoved {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Moving to the platform trash failed.
    #[error("trash refused {}: {message}", path.display())]
    Trash { path: PathBuf, message: String },
}

impl ExecError {
    pub fn io(op: FsOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether the destination was written even though the call failed.
    pub fn destination_written(&self) -> bool {
        matches!(self, Self::SourceNotRemoved { .. })
    }
}

/// One path a cleanup pass could not handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFailure {
    pub path: PathBuf,
    pub message: String,
}

impl PathFailure {
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        let message = message.into();
        Self { path, message }
    }
}

impl std::fmt::Display for PathFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Counts for one cleanup pass over all roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub op: FsOp,
    pub succeeded: usize,
    pub failed: usize,
    /// Files left alone because the user said no.
    pub declined: usize,
    /// Bytes deleted by junk removal; zero for the other passes.
    pub bytes_processed: u64,
    pub errors: Vec<PathFailure>,
}

impl PassSummary {
    pub fn new(op: FsOp) -> Self {
        Self {
            op,
            succeeded: 0,
            failed: 0,
            declined: 0,
            bytes_processed: 0,
            errors: vec![],
        }
    }

    pub fn add_error(&mut self, error: PathFailure) {
        self.failed += 1;
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        self.failed > 0
    }

    /// Add the counts of another summary for the same pass.
    pub fn merge(&mut self, other: PassSummary) {
        let PassSummary {
            succeeded,
            failed,
            declined,
            bytes_processed,
            errors,
            ..
        } = other;
        self.succeeded += succeeded;
        self.failed += failed;
        self.declined += declined;
        self.bytes_processed += bytes_processed;
        self.errors.extend(errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_merge() {
        let mut a = PassSummary::new(FsOp::Delete);
        a.succeeded = 2;
        a.bytes_processed = 10;

        let mut b = PassSummary::new(FsOp::Delete);
        b.declined = 1;
        b.add_error(PathFailure::new(PathBuf::from("/y/x.tmp"), "busy"));

        a.merge(b);
        assert_eq!(a.succeeded, 2);
        assert_eq!(a.declined, 1);
        assert_eq!(a.failed, 1);
        assert!(a.has_errors());
        assert_eq!(a.errors[0].to_string(), "/y/x.tmp: busy");
    }

    #[test]
    fn test_exec_error_display() {
        let err = ExecError::io(
            FsOp::Move,
            "/y/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("Move failed at /y/a.txt"));
        assert!(!err.destination_written());
    }
}
