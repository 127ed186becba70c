//! SHA-256 digest helpers.
//!
//! Content hashes are the identity key for every local resource: they are
//! matched against the remote catalog, memoized in the cache database, and
//! truncated into generation metadata.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Read buffer size used when digesting files.
const FILE_READ_BUF: usize = 1024 * 1024;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compute a lowercase SHA-256 hex digest of a file's contents.
///
/// Reads in 1 MiB chunks so multi-gigabyte checkpoint files are never held
/// in memory whole.
pub fn sha256_file(path: &Path) -> Result<String, CoreError> {
    let mut file = File::open(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; FILE_READ_BUF];
    loop {
        let n = file.read(&mut buf).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let hash = hasher.finalize();
    Ok(format!("{hash:x}"))
}
