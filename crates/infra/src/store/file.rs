use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError, validate_key};

/// One `{key}.json` file per key under a data directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        std::fs::create_dir_all(&self.root).map_err(io_error(key))?;

        let target = self.path_for(key);
        let tmp = self.root.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value).map_err(io_error(key))?;
        std::fs::rename(&tmp, &target).map_err(io_error(key))?;

        tracing::debug!(key, path = %target.display(), bytes = value.len(), "store slot written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get("DB").unwrap(), None);

        store.set("DB", "{\"a\":1}").unwrap();
        let reopened = FileStore::new(dir.path().join("nested"));
        assert_eq!(reopened.get("DB").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(!dir.path().join("nested").join("DB.json.tmp").exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("SESSION", "x").unwrap();
        store.remove("SESSION").unwrap();
        store.remove("SESSION").unwrap();
        assert_eq!(store.get("SESSION").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.set("../x", "v"), Err(StoreError::InvalidKey(_))));
    }
}
