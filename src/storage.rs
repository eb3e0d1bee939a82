use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key of the serialized task collection.
pub const TASKS_KEY: &str = "tasks";
/// Key of the serialized tag collection.
pub const TAGS_KEY: &str = "tags";
/// Key of the premium flag.
pub const PREMIUM_KEY: &str = "premium";

/// Every key the repository owns.
pub const ALL_KEYS: [&str; 3] = [TASKS_KEY, TAGS_KEY, PREMIUM_KEY];

/// An opaque key-value store holding whole serialized values.
///
/// `set` replaces a value atomically as perceived by readers.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn remove(&mut self, keys: &[&str]) -> Result<(), StoreError>;

    /// Writes several values as one update. Stores that cannot do better
    /// write them in order.
    fn set_many(&mut self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Returns the directory holding remindust's data files.
///
/// The path is determined in the following order:
/// 1. `REMINDUST_DIR` environment variable.
/// 2. `~/.local/share/remindust` (on Linux).
/// 3. `./remindust` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var("REMINDUST_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("remindust");
        p
    })
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(FileBlobStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn staging_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", key))
    }

    /// Writes the value next to its final location; `commit` renames it into place.
    fn stage(&self, key: &str, value: &[u8]) -> Result<PathBuf, StoreError> {
        let staging = self.staging_path_for(key);
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&staging)?;
        f.write_all(value)?;
        f.sync_all()?;
        Ok(staging)
    }

    fn commit(&self, key: &str, staging: &Path) -> Result<(), StoreError> {
        fs::rename(staging, self.path_for(key))?;
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&path)?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let staging = self.stage(key, value)?;
        self.commit(key, &staging)
    }

    fn remove(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            let path = self.path_for(key);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        // Stage everything first so a failed write leaves every key untouched.
        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match self.stage(key, value) {
                Ok(path) => staged.push((*key, path)),
                Err(e) => {
                    for (_, path) in &staged {
                        let _ = fs::remove_file(path);
                    }
                    return Err(e);
                }
            }
        }
        for (key, path) in &staged {
            self.commit(key, path)?;
        }
        Ok(())
    }
}

/// Keeps values in memory. Writes can be switched to fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    values: HashMap<String, Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `set`/`remove` is rejected.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful write calls (`set_many` counts once).
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            Err(StoreError::Rejected("store is read-only".to_string()))
        } else {
            Ok(())
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.values.insert(key.to_string(), value.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        self.check_writable()?;
        for key in keys {
            self.values.remove(*key);
        }
        self.writes += 1;
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, Vec<u8>)]) -> Result<(), StoreError> {
        self.check_writable()?;
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        self.writes += 1;
        Ok(())
    }
}
