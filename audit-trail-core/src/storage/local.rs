/*!
Local filesystem storage adapter implementation.
*/

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::StorageAdapter;
use crate::{AuditError, Result};

/// Local filesystem storage adapter
///
/// Stores each partition as one file inside a base directory (the history
/// directory). Writes go to a temporary file in the same directory which is
/// then renamed over the target, so readers never see a partial partition.
///
/// # Example
/// ```rust
/// use audit_trail_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let dir = tempfile::tempdir()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path().join("archive_hist"));
/// storage.prepare()?;
/// storage.save(b"compressed partition", "2021-11_archive_ledger.bin")?;
/// assert!(storage.exists("2021-11_archive_ledger.bin"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    /// Create a new local file storage adapter rooted at `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve the full path for a given storage path
    fn resolve_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl StorageAdapter for LocalFileStorage {
    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            AuditError::storage(format!(
                "Failed to create directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })
    }

    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        let write_err = |e: std::io::Error| {
            AuditError::storage(format!(
                "Failed to write partition to {}: {}",
                full_path.display(),
                e
            ))
        };

        let mut staged = NamedTempFile::new_in(&self.base_dir).map_err(write_err)?;
        staged.write_all(data).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(&full_path).map_err(|e| write_err(e.error))?;

        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| {
            AuditError::storage(format!(
                "Failed to read partition from {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).is_file()
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve_path(path);

        match fs::remove_file(&full_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AuditError::storage(format!(
                "Failed to delete partition {}: {}",
                full_path.display(),
                e
            ))),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AuditError::storage(format!(
                    "Failed to list {}: {}",
                    self.base_dir.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn locate(&self, path: &str) -> PathBuf {
        self.resolve_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prepared(temp_dir: &TempDir) -> LocalFileStorage {
        let storage = LocalFileStorage::with_base_dir(temp_dir.path().join("archive_hist"));
        storage.prepare().unwrap();
        storage
    }

    #[test]
    fn test_local_file_storage_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let storage = prepared(&temp_dir);

        let test_data = b"test partition data";
        let path = "2021-11_archive_test.bin";

        assert!(storage.save(test_data, path).is_ok());
        assert!(storage.exists(path));
        assert_eq!(storage.load(path).unwrap(), test_data);

        assert!(storage.delete(path).unwrap());
        assert!(!storage.exists(path));
        assert!(!storage.delete(path).unwrap());
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path().join("archive_hist"));

        storage.prepare().unwrap();
        storage.prepare().unwrap();
        assert!(storage.base_dir().is_dir());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_staging_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = prepared(&temp_dir);
        let path = "2021-11_archive_test.bin";

        storage.save(b"first", path).unwrap();
        storage.save(b"second", path).unwrap();

        assert_eq!(storage.load(path).unwrap(), b"second");
        assert_eq!(storage.list().unwrap(), vec![path.to_string()]);
    }

    #[test]
    fn test_list_is_sorted_and_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = prepared(&temp_dir);

        storage.save(b"b", "2021-12_archive_x.bin").unwrap();
        storage.save(b"a", "2021-11_archive_x.bin").unwrap();
        fs::create_dir(storage.base_dir().join("nested")).unwrap();

        assert_eq!(
            storage.list().unwrap(),
            vec![
                "2021-11_archive_x.bin".to_string(),
                "2021-12_archive_x.bin".to_string()
            ]
        );
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path().join("never_created"));
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = prepared(&temp_dir);

        let result = storage.load("nonexistent.bin");
        assert!(matches!(result, Err(AuditError::Storage(_))));
    }

    #[test]
    fn test_save_without_prepare_fails() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::with_base_dir(temp_dir.path().join("missing"));

        assert!(storage.save(b"data", "p.bin").is_err());
    }
}
