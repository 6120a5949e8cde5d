/*!
Storage adapters for archive partitions.

This module defines the storage abstraction (port) and its adapters. The
archive manager only deals in partition file names; where and how the bytes
land is up to the adapter.
*/

pub mod local;

use std::path::PathBuf;

use crate::Result;

pub use local::LocalFileStorage;

/// Storage abstraction for saving and loading partition data
///
/// Paths passed to the adapter are partition file names relative to the
/// adapter's own location.
pub trait StorageAdapter {
    /// Make sure the storage location exists
    ///
    /// Must be idempotent: preparing an already prepared location succeeds.
    fn prepare(&self) -> Result<()>;

    /// Save data under `path`, replacing any previous content
    ///
    /// # Arguments
    /// * `data` - The compressed partition data to save
    /// * `path` - The partition file name
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load the data stored under `path`
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether `path` holds data
    fn exists(&self, path: &str) -> bool;

    /// Delete `path`
    ///
    /// # Returns
    /// `true` if something was removed, `false` if nothing was stored there
    fn delete(&self, path: &str) -> Result<bool>;

    /// Names of everything currently stored
    fn list(&self) -> Result<Vec<String>>;

    /// Full location of `path`, for reporting
    fn locate(&self, path: &str) -> PathBuf;
}

impl<S: StorageAdapter + ?Sized> StorageAdapter for Box<S> {
    fn prepare(&self) -> Result<()> {
        (**self).prepare()
    }

    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        (**self).save(data, path)
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        (**self).load(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn delete(&self, path: &str) -> Result<bool> {
        (**self).delete(path)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }

    fn locate(&self, path: &str) -> PathBuf {
        (**self).locate(path)
    }
}

/// Memory-based storage adapter for testing
///
/// This implementation stores partitions in memory using a HashMap.
/// Useful for unit testing without touching the filesystem.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: std::sync::Arc<std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite stored bytes directly, bypassing the archive manager
    pub fn tamper(&self, path: &str, data: Vec<u8>) {
        self.data.lock().unwrap().insert(path.to_string(), data);
    }
}

#[cfg(test)]
impl StorageAdapter for MemoryStorage {
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let mut storage = self.data.lock().unwrap();
        storage.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let storage = self.data.lock().unwrap();
        storage
            .get(path)
            .cloned()
            .ok_or_else(|| crate::AuditError::storage(format!("Partition not found: {path}")))
    }

    fn exists(&self, path: &str) -> bool {
        let storage = self.data.lock().unwrap();
        storage.contains_key(path)
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let mut storage = self.data.lock().unwrap();
        Ok(storage.remove(path).is_some())
    }

    fn list(&self) -> Result<Vec<String>> {
        let storage = self.data.lock().unwrap();
        Ok(storage.keys().cloned().collect())
    }

    fn locate(&self, path: &str) -> PathBuf {
        PathBuf::from("memory").join(path)
    }
}
