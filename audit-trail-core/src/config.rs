//! Configuration for archive managers
//!
//! Where the history directory lives and how partitions are compressed are
//! passed in explicitly instead of being read from the process working
//! directory, so several managers (and tests) can use separate roots.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::compression::{CompressionAdapter, CompressionKind};
use crate::storage::LocalFileStorage;
use crate::{AuditError, Result};

/// Default name of the history directory under the root
pub const DEFAULT_HISTORY_DIR: &str = "archive_hist";

/// Environment variable overriding the root directory
pub const ENV_ROOT: &str = "AUDIT_TRAIL_ROOT";

/// Environment variable overriding the history directory name
pub const ENV_HISTORY_DIR: &str = "AUDIT_TRAIL_HISTORY_DIR";

/// Environment variable overriding the compression algorithm
pub const ENV_COMPRESSION: &str = "AUDIT_TRAIL_COMPRESSION";

/// Configuration structure for archive storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory the history directory is created in
    pub root: PathBuf,
    /// Name of the history directory, a single path component
    pub history_dir: String,
    /// Codec for partition payloads
    pub compression: CompressionKind,
    /// Codec level; the codec default when unset
    pub compression_level: Option<u32>,
}

impl ArchiveConfig {
    /// Configuration rooted at the current directory with default settings
    pub fn default_local() -> Self {
        ArchiveConfig {
            root: PathBuf::from("."),
            history_dir: DEFAULT_HISTORY_DIR.to_string(),
            compression: CompressionKind::Bzip2,
            compression_level: None,
        }
    }

    /// Default configuration rooted at `root`
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        ArchiveConfig {
            root: root.as_ref().to_path_buf(),
            ..Self::default_local()
        }
    }

    pub fn history_dir<S: Into<String>>(mut self, history_dir: S) -> Self {
        self.history_dir = history_dir.into();
        self
    }

    pub fn compression(mut self, kind: CompressionKind, level: Option<u32>) -> Self {
        self.compression = kind;
        self.compression_level = level;
        self
    }

    /// Defaults overlaid with `AUDIT_TRAIL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default_local();
        if let Some(root) = lookup(ENV_ROOT) {
            config.root = PathBuf::from(root);
        }
        if let Some(history_dir) = lookup(ENV_HISTORY_DIR) {
            config.history_dir = history_dir;
        }
        if let Some(compression) = lookup(ENV_COMPRESSION) {
            config.compression = compression.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Full path of the history directory
    pub fn history_path(&self) -> PathBuf {
        self.root.join(&self.history_dir)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut components = Path::new(&self.history_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(AuditError::validation(format!(
                    "history directory must be a single directory name, got '{}'",
                    self.history_dir
                )))
            }
        }

        if let Some(level) = self.compression_level {
            let range = self.compression.level_range();
            if !range.contains(&level) {
                return Err(AuditError::validation(format!(
                    "{} compression level must be within {}..={}, got {}",
                    self.compression,
                    range.start(),
                    range.end(),
                    level
                )));
            }
        }
        Ok(())
    }

    /// Storage adapter for the configured history directory
    pub fn build_storage(&self) -> LocalFileStorage {
        LocalFileStorage::with_base_dir(self.history_path())
    }

    /// Compression adapter for the configured codec
    pub fn build_compressor(&self) -> Box<dyn CompressionAdapter> {
        self.compression.build(self.compression_level)
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::default_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_local_config() {
        let config = ArchiveConfig::default_local();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.history_dir, "archive_hist");
        assert_eq!(config.compression, CompressionKind::Bzip2);
        assert_eq!(config.history_path(), PathBuf::from("./archive_hist"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ArchiveConfig::with_root("/var/audit")
            .history_dir("monthly")
            .compression(CompressionKind::Gzip, Some(9));

        assert_eq!(config.history_path(), PathBuf::from("/var/audit/monthly"));
        assert_eq!(config.build_compressor().algorithm_name(), "gzip");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_history_dir() {
        for bad in ["", "..", ".", "a/b", "/abs"] {
            let config = ArchiveConfig::default_local().history_dir(bad);
            assert!(config.validate().is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_validate_compression_level() {
        let config = ArchiveConfig::default_local().compression(CompressionKind::Bzip2, Some(0));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("1..=9"));

        let config = ArchiveConfig::default_local().compression(CompressionKind::Gzip, Some(0));
        assert!(config.validate().is_ok());

        let config = ArchiveConfig::default_local().compression(CompressionKind::Gzip, Some(10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_ROOT, "/data"),
            (ENV_HISTORY_DIR, "hist"),
            (ENV_COMPRESSION, "gzip"),
        ]
        .into_iter()
        .collect();

        let config = ArchiveConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.history_path(), PathBuf::from("/data/hist"));
        assert_eq!(config.compression, CompressionKind::Gzip);
    }

    #[test]
    fn test_from_lookup_rejects_unknown_codec() {
        let result = ArchiveConfig::from_lookup(|k| (k == ENV_COMPRESSION).then(|| "lz4".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ArchiveConfig = serde_json::from_str(r#"{"root": "/srv"}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv"));
        assert_eq!(config.history_dir, DEFAULT_HISTORY_DIR);
    }
}
