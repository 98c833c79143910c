//! Durable key-value storage.
//!
//! Containers store one JSON blob per fixed key. Two back-ends are provided:
//! an in-process map and a directory of files.

mod error;

pub use error::StorageError;

use async_trait::async_trait;
use log::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;

pub const COUNTER_KEY: &str = "counter-storage";
pub const TODO_KEY: &str = "todo-storage";
pub const USER_KEY: &str = "user-storage";
pub const SESSION_KEY: &str = "auth-session";

/// Asynchronous string key-value store.
///
#[async_trait]
pub trait KvStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same map.
///
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
    reject_writes: Arc<Mutex<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Make subsequent writes and removals fail with
    /// [`StorageError::WriteRejected`].
    ///
    pub fn fail_writes(&self, fail: bool) {
        *self.reject_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if *self.reject_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Storage backed by one `<key>.json` file per key in a directory.
///
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Return a store rooted at `dir`. The directory is created on first
    /// write.
    ///
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl KvStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        let path = self.path_for(key);
        trace!("Writing {} bytes to {}", value.len(), path.display());
        fs::write(&path, value).await.map_err(io_error)?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}
