//! Directory tree enumeration for treemerge.
//!
//! `treemerge-scan` walks a directory tree with jwalk and produces a flat,
//! path-sorted listing of the regular files it contains. Problems below the
//! root (unreadable subdirectories, vanished files) become warnings on the
//! listing; only an unusable root fails the scan.
//!
//! # Example
//!
//! ```rust,no_run
//! use treemerge_scan::{JwalkScanner, ScanConfig};
//!
//! let listing = JwalkScanner::new().scan(&ScanConfig::new("/path/to/tree")).unwrap();
//!
//! for entry in &listing.entries {
//!     println!("{} ({} bytes)", entry.path.display(), entry.size);
//! }
//! println!("{} warning(s)", listing.warnings.len());
//! ```

mod filter;
mod listing;
mod scanner;

pub use filter::EntryFilter;
pub use listing::FileListing;
pub use scanner::JwalkScanner;

// Re-export core types for convenience
pub use treemerge_core::{FileEntry, ScanConfig, ScanError, ScanWarning, WarningKind};
