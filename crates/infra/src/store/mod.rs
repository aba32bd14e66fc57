//! Key-value persistence slots.
//!
//! The book keeps its whole state in a single JSON document under one key and
//! the logged-in holder under another. Implementations only move strings.

mod file;
mod in_memory;

use std::sync::Arc;

use thiserror::Error;

pub use file::FileStore;
pub use in_memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("io error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

/// String slots addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Keys double as file names, so only a conservative character set is allowed.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
