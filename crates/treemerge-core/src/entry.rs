//! File entry and content hash types.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;
use crate::fingerprint::fingerprint_file;

/// BLAKE3 digest of a file's bytes. Equal digests are treated as equal content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex_prefix(&self.0)
    }

    /// First twelve hex digits, enough to tell files apart in logs.
    pub fn short(&self) -> String {
        hex_prefix(&self.0[..6])
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A single regular file discovered during a scan.
///
/// The content fingerprint is computed at most once per entry and only when
/// somebody asks for it; hashing is by far the most expensive thing the
/// engine does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path.
    pub path: PathBuf,
    /// Last path component, lossily decoded. For display only; use
    /// [`FileEntry::file_name`] wherever names are compared or joined.
    pub name: CompactString,
    pub size: u64,
    pub modified: SystemTime,

    #[serde(skip)]
    fingerprint: OnceLock<ContentHash>,
}

impl FileEntry {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<CompactString>,
        size: u64,
        modified: SystemTime,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            modified,
            fingerprint: OnceLock::new(),
        }
    }

    /// Stat a path and build an entry for it.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self::new(
            path,
            name,
            metadata.len(),
            metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
        ))
    }

    /// Content fingerprint, hashing the file on first use.
    pub fn fingerprint(&self) -> Result<ContentHash, FingerprintError> {
        if let Some(hash) = self.fingerprint.get() {
            return Ok(*hash);
        }

        let hash = fingerprint_file(&self.path)?;
        Ok(*self.fingerprint.get_or_init(|| hash))
    }

    /// Fingerprint if it has already been computed.
    pub fn cached_fingerprint(&self) -> Option<ContentHash> {
        self.fingerprint.get().copied()
    }

    /// Attach a fingerprint computed elsewhere (e.g. in a parallel batch).
    ///
    /// Has no effect if the entry already carries one.
    pub fn set_fingerprint(&self, hash: ContentHash) {
        let _ = self.fingerprint.set(hash);
    }

    /// Builder-style variant of [`FileEntry::set_fingerprint`].
    pub fn with_fingerprint(self, hash: ContentHash) -> Self {
        self.set_fingerprint(hash);
        self
    }

    /// The same file after it has been placed at `path`.
    ///
    /// Size, modification time and any cached fingerprint carry over; the
    /// name is taken from the new path, never from the old display name.
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| self.name.clone());

        Self {
            path,
            name,
            size: self.size,
            modified: self.modified,
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Raw last path component, exactly as the filesystem spells it.
    pub fn file_name(&self) -> &OsStr {
        self.path
            .file_name()
            .unwrap_or_else(|| OsStr::new(self.name.as_str()))
    }

    /// Strictly newer than `other`. Equal timestamps are not newer.
    pub fn is_newer_than(&self, other: &FileEntry) -> bool {
        self.modified > other.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_hex().starts_with("abab"));
        assert_eq!(hash.short(), "abababababab");
    }

    #[test]
    fn test_strictly_newer() {
        let now = SystemTime::now();
        let a = FileEntry::new("/x/a.txt", "a.txt", 1, now);
        let b = FileEntry::new("/y/a.txt", "a.txt", 1, now);
        let c = FileEntry::new("/y/a.txt", "a.txt", 1, now + Duration::from_nanos(1));

        assert!(!a.is_newer_than(&b));
        assert!(!b.is_newer_than(&a));
        assert!(c.is_newer_than(&a));
        assert!(!a.is_newer_than(&c));
    }

    #[test]
    fn test_relocated_keeps_fingerprint() {
        let entry = FileEntry::new("/y/deep/a.txt", "a.txt", 3, SystemTime::now())
            .with_fingerprint(ContentHash::new([1; 32]));
        let moved = entry.relocated("/x/a (1).txt");

        assert_eq!(moved.name.as_str(), "a (1).txt");
        assert_eq!(moved.size, 3);
        assert_eq!(moved.modified, entry.modified);
        assert_eq!(moved.cached_fingerprint(), Some(ContentHash::new([1; 32])));
    }

    #[test]
    fn test_set_fingerprint_is_first_write_wins() {
        let entry = FileEntry::new("/x/a", "a", 0, SystemTime::now());
        assert!(entry.cached_fingerprint().is_none());

        entry.set_fingerprint(ContentHash::new([1; 32]));
        entry.set_fingerprint(ContentHash::new([2; 32]));
        assert_eq!(entry.cached_fingerprint(), Some(ContentHash::new([1; 32])));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_name_is_raw() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"a\xff.txt");
        let entry = FileEntry::new(Path::new("/x").join(raw), "a\u{fffd}.txt", 1, SystemTime::now());
        assert_eq!(entry.file_name(), raw);

        let moved = entry.relocated(Path::new("/z").join(OsStr::from_bytes(b"b\xfe.txt")));
        assert_eq!(moved.file_name().as_bytes(), b"b\xfe.txt");
        assert_ne!(moved.file_name(), entry.file_name());
    }
}
