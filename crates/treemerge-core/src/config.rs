//! Scan and consolidation configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Options for listing the files under one root.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Directory to list.
    pub root: PathBuf,

    /// Descend into symlinked directories and list symlinked files.
    #[builder(default)]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Deepest level listed; 1 means direct children only.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Glob patterns matched against file and directory names.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Subtrees to leave out of the listing (absolute paths).
    #[builder(default)]
    #[serde(default)]
    pub exclude_paths: Vec<PathBuf>,

    /// Walker threads; 0 uses the shared rayon pool.
    #[builder(default)]
    #[serde(default)]
    pub threads: usize,

    /// List dot-files and descend into dot-directories.
    #[builder(default = "true")]
    #[serde(default = "listed")]
    pub include_hidden: bool,
}

fn listed() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root.as_ref() {
            None => Err("a scan root must be given".to_string()),
            Some(root) if root.as_os_str().is_empty() => Err("scan root is empty".to_string()),
            Some(_) => Ok(()),
        }
    }
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Defaults for `root`: everything listed, links not followed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: vec![],
            exclude_paths: vec![],
            threads: 0,
            include_hidden: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// What to do when a source file shares its name with a target file but
/// not its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameConflictPolicy {
    /// The strictly newer file wins; ties keep the target.
    #[default]
    KeepNewest,
    /// Never overwrite; move the source in under a disambiguated name.
    Rename,
}

/// How discarded files are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Unlink immediately.
    #[default]
    Permanent,
    /// Move to the platform trash.
    Trash,
}

/// Configuration for one consolidation run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ConsolidateConfig {
    /// Target root every source file is consolidated into.
    pub target: PathBuf,

    /// Source roots, processed in this order.
    #[builder(default)]
    pub sources: Vec<PathBuf>,

    /// Resolution of same-name, different-content pairs.
    #[builder(default)]
    #[serde(default)]
    pub name_conflicts: NameConflictPolicy,

    /// How discarded sources and overwritten targets are removed.
    #[builder(default)]
    #[serde(default)]
    pub delete_mode: DeleteMode,

    /// Follow symbolic links while scanning.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Glob patterns for names that are never consolidated.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl ConsolidateConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.target.as_ref() {
            None => Err("a target directory must be given".to_string()),
            Some(target) if target.as_os_str().is_empty() => {
                Err("target directory is empty".to_string())
            }
            Some(_) => Ok(()),
        }
    }
}

impl ConsolidateConfig {
    /// Create a new consolidation config builder.
    pub fn builder() -> ConsolidateConfigBuilder {
        ConsolidateConfigBuilder::default()
    }

    /// Keep-newest on name clashes, permanent deletion, no ignore globs.
    pub fn new(target: impl Into<PathBuf>, sources: Vec<PathBuf>) -> Self {
        Self {
            target: target.into(),
            sources,
            name_conflicts: NameConflictPolicy::default(),
            delete_mode: DeleteMode::default(),
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
        }
    }

    /// Scan configuration for one of the roots of this run.
    pub fn scan_config(&self, root: impl Into<PathBuf>) -> ScanConfig {
        ScanConfig {
            follow_symlinks: self.follow_symlinks,
            ignore_patterns: self.ignore_patterns.clone(),
            ..ScanConfig::new(root)
        }
    }
}
