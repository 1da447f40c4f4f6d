//! Consolidation and deduplication engine for treemerge.
//!
//! The engine moves every file found under a list of source trees into one
//! target tree. Each source file is classified against a [`Catalog`] of the
//! target and exactly one [`Decision`] is applied:
//!
//! - **Duplicate content** anywhere in the target: the source is discarded
//!   and the target copy kept, whatever the timestamps say.
//! - **Same name, different content**: the strictly newer file survives under
//!   the name; equal timestamps keep the target. With
//!   [`NameConflictPolicy::Rename`] the source is moved in under a numbered
//!   name instead.
//! - **Otherwise** the source is moved into the target root.
//!
//! Decisions are applied one at a time in a fixed order (source roots in the
//! order given, files by path within a root) and the catalog is updated
//! after each one, so later files see earlier moves. Target fingerprints are
//! computed lazily, one size class at a time, in parallel.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use treemerge_core::{AutoConfirm, ConsolidateConfig};
//! use treemerge_engine::ConsolidationEngine;
//!
//! let config = ConsolidateConfig::new("X", vec![PathBuf::from("Y1"), PathBuf::from("Y2")]);
//! let mut confirm = AutoConfirm;
//! let report = ConsolidationEngine::new(config, &mut confirm).run().unwrap();
//!
//! for record in &report.records {
//!     println!("{record}");
//! }
//! ```

mod catalog;
mod decision;
mod engine;
mod report;

pub use catalog::Catalog;
pub use decision::{classify, ActionRecord, Decision, DecisionKind, Outcome};
pub use engine::ConsolidationEngine;
pub use report::{ConsolidateError, ConsolidationReport, ConsolidationStats};

// Re-export core types
pub use treemerge_core::{ConsolidateConfig, FileEntry, NameConflictPolicy};
