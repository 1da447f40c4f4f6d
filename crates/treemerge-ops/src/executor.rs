//! Single-file move, replace and discard.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::debug;

use treemerge_core::DeleteMode;

use crate::outcome::{ExecError, FsOp};

/// Performs the filesystem side of one consolidation decision.
///
/// Moves try `rename(2)` first and fall back to copy-then-delete. In the
/// fallback the copy is written to a temporary sibling of the destination,
/// flushed and renamed into place before the source is removed, so an
/// interrupted move never loses the only copy of a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor {
    /// How discarded files are removed.
    pub delete_mode: DeleteMode,
}

impl ActionExecutor {
    /// Create an executor that unlinks discarded files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor that sends discarded files to the trash.
    pub fn with_trash() -> Self {
        Self {
            delete_mode: DeleteMode::Trash,
        }
    }

    /// Set the delete mode.
    pub fn with_delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }

    /// Move `source` to `dest`, which must not exist yet.
    ///
    /// Missing parent directories of `dest` are created. Returns the number
    /// of bytes moved.
    pub fn place_new(&self, source: &Path, dest: &Path) -> Result<u64, ExecError> {
        if fs::symlink_metadata(dest).is_ok() {
            return Err(ExecError::AlreadyExists {
                path: dest.to_path_buf(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecError::io(FsOp::Move, parent, e))?;
        }
        move_item(source, dest, FsOp::Move)
    }

    /// Move `source` over the existing file at `dest`.
    ///
    /// With permanent deletion the old file is replaced atomically. In trash
    /// mode the old file is trashed first and `source` placed afterwards.
    pub fn replace(&self, source: &Path, dest: &Path) -> Result<u64, ExecError> {
        match self.delete_mode {
            DeleteMode::Permanent => move_item(source, dest, FsOp::Replace),
            DeleteMode::Trash => {
                // Read the source before touching the target so a vanished
                // source leaves the target alone.
                fs::metadata(source).map_err(|e| ExecError::io(FsOp::Replace, source, e))?;
                self.discard(dest)?;
                move_item(source, dest, FsOp::Replace)
            }
        }
    }

    /// Remove a file according to the delete mode. Returns its size.
    pub fn discard(&self, path: &Path) -> Result<u64, ExecError> {
        let size = fs::metadata(path)
            .map_err(|e| ExecError::io(FsOp::Delete, path, e))?
            .len();

        match self.delete_mode {
            DeleteMode::Permanent => {
                fs::remove_file(path).map_err(|e| ExecError::io(FsOp::Delete, path, e))?
            }
            DeleteMode::Trash => trash::delete(path).map_err(|e| ExecError::Trash {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        }

        debug!(path = %path.display(), mode = ?self.delete_mode, "Discarded");
        Ok(size)
    }

    /// Rename a file inside its directory without clobbering.
    pub fn rename(&self, source: &Path, dest: &Path) -> Result<(), ExecError> {
        if fs::symlink_metadata(dest).is_ok() {
            return Err(ExecError::AlreadyExists {
                path: dest.to_path_buf(),
            });
        }
        fs::rename(source, dest).map_err(|e| ExecError::io(FsOp::Rename, source, e))
    }
}

/// Move a single file, falling back to copy + delete across filesystems.
fn move_item(source: &Path, dest: &Path, op: FsOp) -> Result<u64, ExecError> {
    let metadata = fs::metadata(source).map_err(|e| ExecError::io(op, source, e))?;
    let size = metadata.len();

    // Try rename first (fast path for same filesystem)
    match fs::rename(source, dest) {
        Ok(()) => return Ok(size),
        Err(e) => debug!(
            source = %source.display(),
            dest = %dest.display(),
            error = %e,
            "Rename failed, falling back to copy"
        ),
    }

    copy_into_place(source, dest, &metadata).map_err(|e| ExecError::io(op, source, e))?;

    fs::remove_file(source).map_err(|e| ExecError::SourceNotRemoved {
        path: source.to_path_buf(),
        destination: dest.to_path_buf(),
        source: e,
    })?;

    Ok(size)
}

/// Copy `source` to a temporary sibling of `dest`, flush it, restore the
/// modification time and rename it over `dest`.
fn copy_into_place(source: &Path, dest: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    let temp = partial_path(dest);

    let result = (|| {
        fs::copy(source, &temp)?;
        File::open(&temp)?.sync_all()?;
        filetime::set_file_mtime(&temp, FileTime::from_last_modification_time(metadata))?;
        fs::rename(&temp, dest)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".treemerge-partial");
    dest.with_file_name(name)
}
