//! Flat-file key/value state store.
//!
//! One file per identity under `<state_dir>/db/<identity>.db`. Each line is
//! `KEY|=|VALUE`. A value equal to `null` reads back as absent, and absent
//! values are never written, so every persisted key has a value.
//!
//! The store is a single-writer store: there is no file locking, and two
//! processes writing the same identity concurrently will lose updates.
//! Every mutation rewrites the whole file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Delimiter between key and value on one line.
pub const SEPARATOR: &str = "|=|";

/// Value text that reads back as "absent".
pub const NULL_SENTINEL: &str = "null";

/// Identity of the store shared by every application.
pub const GLOBAL_IDENTITY: &str = "global";

#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KeyValueStore {
    /// Open the store for `identity` under `state_dir`.
    ///
    /// A missing or unreadable backing file yields an empty store.
    /// Lines without a separator are skipped.
    pub fn open(state_dir: &Path, identity: &str) -> Self {
        let path = Self::path_for(state_dir, identity);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => parse(&content),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "state file not readable, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// Open the store shared by all applications. `global_dir` must not
    /// depend on the application.
    pub fn open_global(global_dir: &Path) -> Self {
        Self::open(global_dir, GLOBAL_IDENTITY)
    }

    pub fn path_for(state_dir: &Path, identity: &str) -> PathBuf {
        state_dir.join("db").join(format!("{identity}.db"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// `true` when `key` holds the literal `true`.
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite, then persist the whole map.
    ///
    /// `None` (or the null sentinel) removes the key.
    pub fn put(&mut self, key: &str, value: Option<&str>) -> crate::Result<()> {
        match value {
            Some(v) if v != NULL_SENTINEL => {
                self.entries.insert(key.to_owned(), v.to_owned());
            }
            _ => {
                self.entries.remove(key);
            }
        }
        self.persist()
    }

    pub fn set(&mut self, key: &str, value: &str) -> crate::Result<()> {
        self.put(key, Some(value))
    }

    pub fn set_flag(&mut self, key: &str, value: bool) -> crate::Result<()> {
        self.put(key, Some(if value { "true" } else { "false" }))
    }

    pub fn remove(&mut self, key: &str) -> crate::Result<()> {
        self.put(key, None)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete the backing file and forget every entry.
    pub fn delete(&mut self) -> crate::Result<()> {
        self.entries.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(crate::Error::StoreDelete {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn persist(&self) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| crate::Error::StoreWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut content = String::new();
        for (key, value) in &self.entries {
            content.push_str(key);
            content.push_str(SEPARATOR);
            content.push_str(value);
            content.push('\n');
        }

        std::fs::write(&self.path, content).map_err(|e| crate::Error::StoreWrite {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "state persisted");
        Ok(())
    }
}

fn parse(content: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(SEPARATOR) else {
            if !line.is_empty() {
                debug!(line, "skipping malformed state line");
            }
            continue;
        };
        if value == NULL_SENTINEL {
            continue;
        }
        entries.insert(key.to_owned(), value.to_owned());
    }
    entries
}
