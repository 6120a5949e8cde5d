/*!
Archive metadata stored alongside every partition's dataset.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AuditError, Dataset, PartitionKey, Result};

/// Current metadata format version for compatibility tracking
pub const METADATA_FORMAT_VERSION: u8 = 1;

/// Traceability and integrity information for one archived partition
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchiveMetadata {
    /// Archive identity the partition belongs to
    pub identity: String,

    /// Partition label, `{year}-{month}`
    pub partition: String,

    /// When the partition was written
    pub timestamp: DateTime<Utc>,

    /// Unique identifier for this specific write
    pub archive_id: String,

    /// SHA-256 hash of the serialized dataset
    pub content_hash: String,

    /// Format version for compatibility (current: 1)
    pub format_version: u8,

    pub row_count: usize,

    pub column_count: usize,

    /// Size of the serialized dataset in bytes
    pub uncompressed_size: usize,

    /// Compression algorithm used
    pub compression_algorithm: String,
}

impl ArchiveMetadata {
    /// Create metadata for a partition about to be written
    ///
    /// # Example
    /// ```rust
    /// use audit_trail_core::{ArchiveMetadata, Dataset, PartitionKey};
    ///
    /// let dataset = Dataset::from_rows(vec!["a"], vec![vec![1.into()]])?;
    /// let metadata = ArchiveMetadata::new("ledger", &PartitionKey::new("2021", "11"), &dataset);
    /// assert_eq!(metadata.partition, "2021-11");
    /// assert_eq!(metadata.row_count, 1);
    /// # Ok::<(), audit_trail_core::AuditError>(())
    /// ```
    pub fn new<S: Into<String>>(identity: S, key: &PartitionKey, dataset: &Dataset) -> Self {
        Self {
            identity: identity.into(),
            partition: key.label(),
            timestamp: Utc::now(),
            archive_id: Uuid::new_v4().to_string(),
            content_hash: String::new(),
            format_version: METADATA_FORMAT_VERSION,
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            uncompressed_size: 0,
            compression_algorithm: "bzip2".to_string(),
        }
    }

    /// Set the content hash and size from the serialized dataset
    pub fn with_content_hash(mut self, dataset_bytes: &[u8]) -> Self {
        self.content_hash = Self::compute_hash(dataset_bytes);
        self.uncompressed_size = dataset_bytes.len();
        self
    }

    /// Set the compression algorithm
    pub fn with_compression_algorithm<S: Into<String>>(mut self, algorithm: S) -> Self {
        self.compression_algorithm = algorithm.into();
        self
    }

    /// Compute SHA-256 hash of the provided data as lowercase hex
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Verify serialized dataset bytes against the stored hash
    pub fn verify_integrity(&self, dataset_bytes: &[u8]) -> Result<()> {
        let computed_hash = Self::compute_hash(dataset_bytes);
        if computed_hash == self.content_hash {
            Ok(())
        } else {
            Err(AuditError::IntegrityCheckFailed {
                expected: self.content_hash.clone(),
                actual: computed_hash,
            })
        }
    }

    /// Validate that all required fields are properly set
    pub fn validate(&self) -> Result<()> {
        if self.identity.is_empty() {
            return Err(AuditError::validation("identity cannot be empty"));
        }
        if self.partition.is_empty() {
            return Err(AuditError::validation("partition cannot be empty"));
        }
        if self.content_hash.is_empty() {
            return Err(AuditError::validation("content_hash cannot be empty"));
        }
        if self.archive_id.is_empty() {
            return Err(AuditError::validation("archive_id cannot be empty"));
        }
        Ok(())
    }

    /// Check if this metadata is compatible with the current format version
    pub fn is_compatible(&self) -> bool {
        self.format_version <= METADATA_FORMAT_VERSION
    }
}
