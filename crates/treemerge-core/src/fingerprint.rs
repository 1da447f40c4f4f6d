//! Streaming BLAKE3 content fingerprints.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use blake3::Hasher;

use crate::entry::ContentHash;
use crate::error::FingerprintError;

/// Read buffer size used while hashing.
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the full BLAKE3 hash of a file.
///
/// The file is streamed through a fixed buffer, so memory use does not grow
/// with file size.
pub fn fingerprint_file(path: &Path) -> Result<ContentHash, FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::unreadable(path, e))?;

    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FingerprintError::unreadable(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}
