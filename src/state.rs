//! Persisted dedup state: the set of messages already answered.
//!
//! The set is stored as a JSON array of keys and rewritten after every
//! successful reply, so an interrupted run loses at most the in-flight
//! message.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ApproveError, Result};

/// Dedup keys of handled messages (see [`crate::model::message::ParsedMessage::dedup_key`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    keys: BTreeSet<String>,
}

impl ProcessedSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the set from `path`. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No dedup state yet");
                return Ok(Self::new());
            }
            Err(e) => return Err(ApproveError::io(path, e)),
        };

        let keys: Vec<String> = serde_json::from_str(&data).map_err(|e| ApproveError::State {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), count = keys.len(), "Loaded dedup state");
        Ok(Self {
            keys: keys.into_iter().collect(),
        })
    }

    /// Like [`ProcessedSet::load`], but a broken state file is logged and
    /// treated as empty.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "Dedup state unusable, starting empty");
            Self::new()
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Add a key; returns false if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Atomically replace the state file with the current set.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let keys: Vec<&str> = self.iter().collect();
        let json = serde_json::to_vec_pretty(&keys).map_err(|e| ApproveError::State {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &json)
    }

    /// Insert `key` and persist right away.
    pub fn insert_and_persist(&mut self, key: impl Into<String>, path: &Path) -> Result<()> {
        self.insert(key);
        self.persist(path)
    }
}

/// Write `contents` to a temporary file next to `path`, then rename it over `path`.
///
/// Readers see either the old or the new file, never a partial one.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| ApproveError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ApproveError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ApproveError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ApproveError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let set = ProcessedSet::load(&tmp.path().join("processed.json")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state").join("processed.json");

        let mut set = ProcessedSet::new();
        set.insert_and_persist("<1@sn>", &path).unwrap();
        set.insert_and_persist("Subject|sn@example.com", &path).unwrap();
        assert!(!set.insert("<1@sn>"));

        let loaded = ProcessedSet::load(&path).unwrap();
        assert_eq!(loaded, set);
        assert!(loaded.contains("Subject|sn@example.com"));

        let raw: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_corrupt_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            ProcessedSet::load(&path),
            Err(ApproveError::State { .. })
        ));
        assert!(ProcessedSet::load_or_default(&path).is_empty());
    }
}
