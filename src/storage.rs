use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

/// Credential map (`address → credential`).
pub const USER_INFO_KEY: &str = "userInfo";
/// Cached `/sys/info` payload.
pub const SYS_CONFIG_KEY: &str = "sysConfig";
/// UI language preference.
pub const LANG_KEY: &str = "lang";

/// JSON key-value store persisted to a single file.
///
/// The file is read once on open; every `set` / `remove` writes the whole
/// object back synchronously. Reads never fail: a missing key or a value of
/// the wrong shape yields `None`.
pub struct Storage {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl Storage {
    /// Open the store at `path`. A missing or unparseable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    warn!("storage file {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
                Err(e) => {
                    warn!("storage file {} is corrupt ({e}), starting empty", path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let value = entries.get(key)?.clone();
        drop(entries);
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("ignoring malformed storage entry {key}: {e}");
                None
            }
        }
    }

    /// Write `value` under `key`. The in-memory entry changes only once the
    /// file write succeeded.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize storage entry {key}"))?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn flush(&self, entries: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents =
            serde_json::to_vec_pretty(entries).context("failed to serialize storage")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
