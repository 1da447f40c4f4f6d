//! Error types shared across treemerge crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A root that cannot be listed at all.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{} is not accessible", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("{} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot list {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is a file, expected a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// An ignore glob failed to compile.
    #[error("bad ignore pattern: {message}")]
    BadPattern { message: String },
}

impl ScanError {
    /// Classify an I/O failure on `path`; denied and missing get their own variants.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let path = path.into();
        match source.kind() {
            ErrorKind::NotFound => Self::NotFound { path },
            ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A file could not be read for hashing.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Open or read failed (permission denied, vanished, symlink loop...).
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FingerprintError {
    /// Create an unreadable-file error with path context.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// Path of the file that could not be read.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Unreadable { path, .. } => path,
        }
    }
}

/// Errors while loading the rule file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rule file exists but could not be read.
    #[error("Cannot read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key carried a value that does not parse.
    #[error("{path}:{line}: invalid value for {key}: {message}")]
    InvalidValue {
        path: PathBuf,
        line: usize,
        key: String,
        message: String,
    },
}

/// Why an entry was left out of a listing or the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    PermissionDenied,
    /// A directory could not be listed.
    ReadError,
    /// `lstat` failed on an entry.
    MetadataError,
    /// A target file could not be hashed and is excluded from content matching.
    Unhashable,
    /// Two target files share a base name; only one is addressable by name.
    ShadowedName,
    /// A source root was skipped entirely.
    SkippedRoot,
}

/// Something that went wrong for one path without stopping the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub message: String,
    pub kind: WarningKind,
}

impl ScanWarning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Warning for an entry the current user may not read.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::new(path, "not accessible", WarningKind::PermissionDenied)
    }

    /// Create a warning for a target file that could not be hashed.
    pub fn unhashable(error: &FingerprintError) -> Self {
        Self {
            path: error.path().to_path_buf(),
            message: error.to_string(),
            kind: WarningKind::Unhashable,
        }
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
