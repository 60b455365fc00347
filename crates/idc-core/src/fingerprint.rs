//! Chained content fingerprints over ordered file lists.
//!
//! ```text
//! fp([])         = None
//! fp([f1])       = H(f1)
//! fp([f1..fn])   = H(fp([f1..fn-1]) ++ H(fn))     (hex strings concatenated)
//! ```
//!
//! Missing files are skipped. The order of the input list is part of the
//! fingerprint.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::store::KeyValueStore;

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-computed digest, e.g. one read back from the store.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compute the chained fingerprint of `files`, in the given order.
///
/// Returns `Ok(None)` when none of the files exist.
pub fn fingerprint<P: AsRef<Path>>(files: &[P]) -> crate::Result<Option<Fingerprint>> {
    let mut chain: Option<String> = None;

    for file in files {
        let path = file.as_ref();
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read(path).map_err(|e| crate::Error::FingerprintRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        chain = Some(match chain {
            None => hex_digest(&content),
            Some(prev) => {
                let mut link = prev;
                link.push_str(&hex_digest(&content));
                hex_digest(link.as_bytes())
            }
        });
    }

    Ok(chain.map(Fingerprint))
}

/// Recompute the fingerprint of `files` and compare it with the value
/// stored under `key`.
///
/// Returns `None` when nothing changed; otherwise the new fingerprint.
/// An empty store always reports a change as long as one file exists.
/// The store is not written.
pub fn new_fingerprint_if_changed<P: AsRef<Path>>(
    store: &KeyValueStore,
    key: &str,
    files: &[P],
) -> crate::Result<Option<Fingerprint>> {
    let current = fingerprint(files)?;
    match current {
        Some(fp) if store.get(key) == Some(fp.as_str()) => Ok(None),
        other => Ok(other),
    }
}

/// Every regular file under `dir`, recursively, sorted by path.
///
/// A missing directory yields an empty list.
pub fn directory_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| crate::Error::DirectoryWalk {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
