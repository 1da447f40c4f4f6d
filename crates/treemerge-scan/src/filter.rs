//! Name and subtree filtering applied while walking.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use treemerge_core::{ScanConfig, ScanError};

/// Decides which directory entries are left out of a scan.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    globs: GlobSet,
    exclude_paths: Vec<PathBuf>,
    include_hidden: bool,
}

impl EntryFilter {
    /// Compile the filter for a scan configuration.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| ScanError::BadPattern {
                message: format!("bad ignore pattern '{pattern}': {e}"),
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| ScanError::BadPattern {
            message: e.to_string(),
        })?;

        // Paths coming out of the walker are built from the canonical root,
        // so exclusions have to be canonical too.
        let exclude_paths = config
            .exclude_paths
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();

        Ok(Self {
            globs,
            exclude_paths,
            include_hidden: config.include_hidden,
        })
    }

    /// Whether an entry (file or directory) is left out.
    pub fn rejects(&self, name: impl AsRef<OsStr>, path: &Path) -> bool {
        let name = name.as_ref();
        if !self.include_hidden && name.as_encoded_bytes().starts_with(b".") {
            return true;
        }
        if self.globs.is_match(name) {
            return true;
        }
        self.exclude_paths.iter().any(|ex| path.starts_with(ex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_patterns() {
        let config = ScanConfig::builder()
            .root("/test")
            .ignore_patterns(vec!["node_modules".to_string(), "*.log".to_string()])
            .build()
            .unwrap();
        let filter = EntryFilter::new(&config).unwrap();

        assert!(filter.rejects("node_modules", Path::new("/test/node_modules")));
        assert!(filter.rejects("test.log", Path::new("/test/test.log")));
        assert!(!filter.rejects("src", Path::new("/test/src")));
    }

    #[test]
    fn test_excluded_subtree() {
        let config = ScanConfig::builder()
            .root("/nonexistent-root")
            .exclude_paths(vec![PathBuf::from("/nonexistent-root/target")])
            .build()
            .unwrap();
        let filter = EntryFilter::new(&config).unwrap();

        assert!(filter.rejects("target", Path::new("/nonexistent-root/target")));
        assert!(filter.rejects("a.txt", Path::new("/nonexistent-root/target/a.txt")));
        assert!(!filter.rejects("targets", Path::new("/nonexistent-root/targets")));
    }

    #[test]
    fn test_hidden() {
        let mut config = ScanConfig::new("/test");
        config.include_hidden = false;
        let filter = EntryFilter::new(&config).unwrap();

        assert!(filter.rejects(".git", Path::new("/test/.git")));
        assert!(!filter.rejects("git", Path::new("/test/git")));
    }

    #[test]
    fn test_bad_pattern() {
        let config = ScanConfig::builder()
            .root("/test")
            .ignore_patterns(vec!["[".to_string()])
            .build()
            .unwrap();
        assert!(matches!(
            EntryFilter::new(&config),
            Err(ScanError::BadPattern { .. })
        ));
    }
}
