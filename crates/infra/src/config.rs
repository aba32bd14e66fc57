//! Configuration loading and representation.

use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "CASHFLOW_DATA_DIR";
pub const DATABASE_KEY_ENV: &str = "CASHFLOW_DB_KEY";
pub const SESSION_KEY_ENV: &str = "CASHFLOW_SESSION_KEY";

pub const DEFAULT_DATABASE_KEY: &str = "CASHFLOW_PRO_DB_V1";
pub const DEFAULT_SESSION_KEY: &str = "CASHFLOW_PRO_SESSION_V1";

/// Where and under which keys the book is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookConfig {
    /// Directory used by the file-backed store.
    pub data_dir: PathBuf,
    /// Store key of the database document.
    pub database_key: String,
    /// Store key of the logged-in holder.
    pub session_key: String,
}

impl BookConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            data_dir: var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            database_key: var(DATABASE_KEY_ENV).unwrap_or_else(|| DEFAULT_DATABASE_KEY.to_string()),
            session_key: var(SESSION_KEY_ENV).unwrap_or_else(|| DEFAULT_SESSION_KEY.to_string()),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// `{app_data_dir}/cashflow`, falling back to `~/.local/share/cashflow` and
/// finally to a relative `./cashflow`.
pub fn default_data_dir() -> PathBuf {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("cashflow")
}
