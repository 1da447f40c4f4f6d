//! Core types and traits for treemerge.
//!
//! This crate provides the data structures shared by every treemerge crate:
//! file entries with lazily cached content fingerprints, the rule file
//! loader, run configuration and the confirmation oracle consulted before
//! destructive actions.

mod config;
mod confirm;
mod entry;
mod error;
mod fingerprint;
mod rules;

pub use config::{
    ConsolidateConfig, ConsolidateConfigBuilder, DeleteMode, NameConflictPolicy, ScanConfig,
    ScanConfigBuilder,
};
pub use confirm::{AutoConfirm, Confirm, ConfirmAction, ConfirmRequest, DenyAll};
pub use entry::{ContentHash, FileEntry};
pub use error::{ConfigError, FingerprintError, ScanError, ScanWarning, WarningKind};
pub use fingerprint::{fingerprint_file, HASH_BUFFER_SIZE};
pub use rules::{RuleConfig, DEFAULT_RULES_FILE};
