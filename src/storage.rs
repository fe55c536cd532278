//! Key-value persistence seam
//!
//! The progress store reads and writes two string keys. Failures are
//! non-fatal for this class of data: a missing or corrupt value loads as
//! default, a failed write is logged and dropped.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Coarse local key-value storage
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    /// Best-effort write; errors are swallowed by the implementation
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Volatile store for tests and previews
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: BTreeMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Store backed by a single JSON file holding a string map.
///
/// The whole map is rewritten on every `set`/`remove`; with two keys of a
/// few kilobytes this is cheaper than doing anything cleverer.
#[derive(Debug)]
pub struct FileKv {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKv {
    /// Open (or lazily create) the file at `path`. A missing or
    /// undecodable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    log::info!("loaded {} storage entries from {:?}", map.len(), path);
                    map
                }
                Err(err) => {
                    log::warn!("storage file {:?} undecodable, starting fresh: {err}", path);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    fn flush(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("storage encode failed, dropping write: {err}");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, json) {
            log::warn!("storage write to {:?} failed, dropping: {err}", self.path);
        }
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }
}
