//! File operations engine for treemerge.
//!
//! This crate performs the physical side of a run: moving, replacing and
//! discarding single files for the consolidation engine, plus the
//! stand-alone cleanup passes (junk removal, name sanitizing, permission
//! normalization). Every operation works on one file at a time and reports
//! failures per file instead of aborting.

mod cleanup;
mod conflict;
mod executor;
mod outcome;
mod permissions;
mod sanitize;

pub use cleanup::{remove_junk, JunkKind, JunkOptions};
pub use conflict::auto_rename_path;
pub use executor::ActionExecutor;
pub use outcome::{ExecError, PassSummary, PathFailure, FsOp};
pub use permissions::normalize_permissions;
pub use sanitize::sanitize_names;
