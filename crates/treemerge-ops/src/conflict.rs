//! Collision-free name generation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Generate a sibling path that `is_taken` does not reject.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc. The caller
/// decides what "taken" means (on disk, in an index, or both). Returns
/// `None` if every candidate up to 9999 is taken. Stem and extension keep
/// their raw bytes, so names that are not valid UTF-8 survive unchanged.
pub fn auto_rename_path(path: &Path, is_taken: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    // Dotfiles like ".profile" have no extension to preserve.
    let stem = path.file_stem()?;
    let extension = path.extension();

    (1..10_000).find_map(|i| {
        let mut new_name = OsString::from(stem);
        new_name.push(format!(" ({i})"));
        if let Some(ext) = extension {
            new_name.push(".");
            new_name.push(ext);
        }
        let candidate = path.with_file_name(new_name);
        (!is_taken(&candidate)).then_some(candidate)
    })
}
