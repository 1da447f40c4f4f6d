//! In-memory index of the target tree.

use std::collections::{BTreeSet, HashMap};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use treemerge_core::{
    ContentHash, FileEntry, FingerprintError, ScanConfig, ScanError, ScanWarning, WarningKind,
};
use treemerge_scan::JwalkScanner;

/// Index of the files currently in the target tree.
///
/// Entries are reachable by path, by base name and by content fingerprint.
/// Base names are compared as raw [`OsStr`]s, so two names that only decode
/// to the same text are still different names.
/// Two target files in different directories may share a base name; the
/// name index then resolves to one *primary* entry: a file directly under
/// the root wins, otherwise the smallest path. When the primary goes away
/// the next one takes over.
///
/// Fingerprints are computed lazily per size class with
/// [`Catalog::ensure_fingerprints`]. Files that cannot be hashed stay
/// addressable by name but drop out of content matching.
///
/// Every mutation goes through `&mut self` and updates all indexes before
/// returning.
#[derive(Debug, Default)]
pub struct Catalog {
    root: PathBuf,
    entries: HashMap<PathBuf, FileEntry>,
    by_name: HashMap<OsString, BTreeSet<PathBuf>>,
    /// Entries that can take part in content matching, grouped by size.
    by_size: HashMap<u64, BTreeSet<PathBuf>>,
    by_fingerprint: HashMap<ContentHash, BTreeSet<PathBuf>>,
    warnings: Vec<ScanWarning>,
}

impl Catalog {
    /// Create an empty catalog for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Scan the target tree and index every file in it.
    ///
    /// Fails if the root cannot be enumerated at all. Subtrees that cannot be
    /// read leave the catalog partial; they show up in [`Catalog::warnings`].
    pub fn build(config: &ScanConfig) -> Result<Self, ScanError> {
        let listing = JwalkScanner::new().scan(config)?;

        let mut catalog = Self::new(listing.root);
        catalog.warnings = listing.warnings;
        for entry in listing.entries {
            catalog.insert(entry);
        }

        let shadowed: Vec<ScanWarning> = catalog
            .by_name
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .filter_map(|(name, paths)| {
                let primary = catalog.primary(paths)?;
                Some(ScanWarning::new(
                    primary,
                    format!(
                        "{} files named '{}'; name matches resolve to this one",
                        paths.len(),
                        name.to_string_lossy()
                    ),
                    WarningKind::ShadowedName,
                ))
            })
            .collect();
        for warning in &shadowed {
            warn!(path = %warning.path.display(), "{}", warning.message);
        }
        catalog.warnings.extend(shadowed);

        debug!(
            root = %catalog.root.display(),
            files = catalog.len(),
            warnings = catalog.warnings.len(),
            "Catalog built"
        );
        Ok(catalog)
    }

    /// Root of the target tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the target holds no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Warnings gathered while building and hashing.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Drain the gathered warnings.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// All indexed entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    /// Entry at an exact path.
    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Whether a path is indexed.
    pub fn contains_path(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Whether any indexed file has this base name.
    pub fn contains_name(&self, name: impl AsRef<OsStr>) -> bool {
        self.by_name.contains_key(name.as_ref())
    }

    /// The primary entry for a base name.
    pub fn lookup_by_name(&self, name: impl AsRef<OsStr>) -> Option<&FileEntry> {
        let paths = self.by_name.get(name.as_ref())?;
        self.primary(paths).and_then(|p| self.entries.get(p))
    }

    /// Every entry whose content hashes to `hash`, ordered by path.
    ///
    /// Only entries whose fingerprint has been computed are found; call
    /// [`Catalog::ensure_fingerprints`] for the size class first.
    pub fn lookup_by_fingerprint(&self, hash: &ContentHash) -> Vec<&FileEntry> {
        self.by_fingerprint
            .get(hash)
            .map(|paths| paths.iter().filter_map(|p| self.entries.get(p)).collect())
            .unwrap_or_default()
    }

    /// Whether some entry of this size can take part in content matching.
    pub fn has_size(&self, size: u64) -> bool {
        self.by_size.get(&size).is_some_and(|paths| !paths.is_empty())
    }

    /// Hash every not yet hashed entry of one size, in parallel.
    ///
    /// Entries that cannot be read are removed from content matching and
    /// reported as [`WarningKind::Unhashable`] warnings.
    pub fn ensure_fingerprints(&mut self, size: u64) {
        let Some(paths) = self.by_size.get(&size) else {
            return;
        };

        let pending: Vec<&FileEntry> = paths
            .iter()
            .filter_map(|p| self.entries.get(p))
            .filter(|e| e.cached_fingerprint().is_none())
            .collect();
        if pending.is_empty() {
            return;
        }

        debug!(size, count = pending.len(), "Hashing target size class");
        let results: Vec<(PathBuf, Result<ContentHash, FingerprintError>)> = pending
            .par_iter()
            .map(|entry| (entry.path.clone(), entry.fingerprint()))
            .collect();

        for (path, result) in results {
            match result {
                Ok(hash) => {
                    self.by_fingerprint.entry(hash).or_default().insert(path);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Target file excluded from content matching");
                    self.warnings.push(ScanWarning::unhashable(&err));
                    remove_from(&mut self.by_size, &size, &path);
                }
            }
        }
    }

    /// Index a file that now exists at `entry.path`.
    ///
    /// An entry already indexed at the same path is replaced.
    pub fn record_move(&mut self, entry: FileEntry) {
        if self.entries.contains_key(&entry.path) {
            self.record_removal(&entry.path.clone());
        }
        self.insert(entry);
    }

    /// Forget the file at `path`. Returns the removed entry, if any.
    pub fn record_removal(&mut self, path: &Path) -> Option<FileEntry> {
        let entry = self.entries.remove(path)?;

        remove_from(&mut self.by_name, entry.file_name(), path);
        remove_from(&mut self.by_size, &entry.size, path);
        if let Some(hash) = entry.cached_fingerprint() {
            remove_from(&mut self.by_fingerprint, &hash, path);
        }

        Some(entry)
    }

    /// Bring the entry for `path` back in line with the filesystem.
    ///
    /// Used after a failed operation left the state of a path uncertain.
    pub fn resync(&mut self, path: &Path) {
        let on_disk = std::fs::metadata(path).ok().filter(|m| m.is_file());

        match (self.entries.get(path), on_disk) {
            (Some(_), None) => {
                debug!(path = %path.display(), "Dropping vanished catalog entry");
                self.record_removal(path);
            }
            (Some(entry), Some(meta)) => {
                let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
                if entry.size != meta.len() || entry.modified != modified {
                    self.record_removal(path);
                    self.insert_from_disk(path);
                }
            }
            (None, Some(_)) if path.starts_with(&self.root) => self.insert_from_disk(path),
            _ => {}
        }
    }

    /// Check that all indexes agree with each other and with the disk.
    pub fn verify(&self) -> Result<(), String> {
        for (path, entry) in &self.entries {
            if path != &entry.path {
                return Err(format!("entry key {} holds {}", path.display(), entry.path.display()));
            }
            if !path.is_file() {
                return Err(format!("{} is indexed but not on disk", path.display()));
            }
            if !self.by_name.get(entry.file_name()).is_some_and(|s| s.contains(path)) {
                return Err(format!("{} missing from name index", path.display()));
            }
            if let Some(hash) = entry.cached_fingerprint() {
                if !self.by_fingerprint.get(&hash).is_some_and(|s| s.contains(path)) {
                    return Err(format!("{} missing from fingerprint index", path.display()));
                }
            }
        }

        for (name, paths) in &self.by_name {
            if paths.is_empty() {
                return Err(format!("empty name bucket '{}'", name.to_string_lossy()));
            }
            for path in paths {
                match self.entries.get(path) {
                    Some(entry) if entry.file_name() == name.as_os_str() => {}
                    _ => return Err(format!("stale name index entry {}", path.display())),
                }
            }
        }

        for (hash, paths) in &self.by_fingerprint {
            for path in paths {
                match self.entries.get(path) {
                    Some(entry) if entry.cached_fingerprint() == Some(*hash) => {}
                    _ => return Err(format!("stale fingerprint index entry {}", path.display())),
                }
            }
        }

        for (size, paths) in &self.by_size {
            for path in paths {
                match self.entries.get(path) {
                    Some(entry) if entry.size == *size => {}
                    _ => return Err(format!("stale size index entry {}", path.display())),
                }
            }
        }

        Ok(())
    }

    fn insert(&mut self, entry: FileEntry) {
        let path = entry.path.clone();

        self.by_name
            .entry(entry.file_name().to_os_string())
            .or_default()
            .insert(path.clone());
        self.by_size.entry(entry.size).or_default().insert(path.clone());
        if let Some(hash) = entry.cached_fingerprint() {
            self.by_fingerprint.entry(hash).or_default().insert(path.clone());
        }

        self.entries.insert(path, entry);
    }

    fn insert_from_disk(&mut self, path: &Path) {
        match FileEntry::from_path(path) {
            Ok(entry) => self.insert(entry),
            Err(e) => debug!(path = %path.display(), error = %e, "Cannot re-read path"),
        }
    }

    /// Primary path among files sharing a name.
    fn primary<'a>(&self, paths: &'a BTreeSet<PathBuf>) -> Option<&'a PathBuf> {
        // BTreeSet iterates in path order, so min_by_key keeps the smallest
        // path among equally ranked ones.
        paths
            .iter()
            .min_by_key(|p| p.parent() != Some(self.root.as_path()))
    }
}

fn remove_from<K, Q>(index: &mut HashMap<K, BTreeSet<PathBuf>>, key: &Q, path: &Path)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(paths) = index.get_mut(key) {
        paths.remove(path);
        if paths.is_empty() {
            index.remove(key);
        }
    }
}
