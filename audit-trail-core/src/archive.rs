/*!
Archive manager: the serialize-compress-store and
retrieve-decompress-deserialize pipelines for one archive identity.

Every archive call writes the partition of the current calendar month;
retrieval addresses any partition by caller-supplied year and month. The
serialized intermediate form only ever lives in memory.
*/

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::compression::CompressionAdapter;
use crate::config::ArchiveConfig;
use crate::metadata::{ArchiveMetadata, METADATA_FORMAT_VERSION};
use crate::observability::record;
use crate::partition::{validate_identity, PartitionKey};
use crate::storage::{LocalFileStorage, StorageAdapter};
use crate::{AuditError, Dataset, Result};

/// Serialized form written into every partition (before compression)
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    metadata: &'a ArchiveMetadata,
    dataset: &'a Dataset,
}

/// Owned counterpart of [`EnvelopeRef`], read back on retrieval
#[derive(Deserialize, Debug)]
struct ArchiveEnvelope {
    metadata: ArchiveMetadata,
    dataset: Dataset,
}

/// Result of [`ArchiveManager::archive`]
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveOutcome {
    /// The current month's partition was written (or overwritten)
    Archived {
        partition: PartitionKey,
        path: PathBuf,
        metadata: ArchiveMetadata,
        compressed_size: usize,
    },
    /// No dataset, or a dataset with zero rows; nothing was written
    RejectedEmpty,
}

impl ArchiveOutcome {
    pub fn is_archived(&self) -> bool {
        matches!(self, ArchiveOutcome::Archived { .. })
    }
}

/// Result of [`ArchiveManager::extract`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The partition was decompressed and is held for deserialization
    Extracted {
        partition: PartitionKey,
        path: PathBuf,
        size: usize,
    },
    /// No partition exists for the requested period
    NotFound { partition: PartitionKey, path: PathBuf },
}

impl ExtractOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, ExtractOutcome::Extracted { .. })
    }
}

/// Monthly archive of one dataset identity
///
/// # Example
/// ```rust
/// use audit_trail_core::{ArchiveConfig, ArchiveManager, ArchiveOutcome, Dataset};
///
/// let root = tempfile::tempdir()?;
/// let dataset = Dataset::from_rows(
///     vec!["a", "b", "c"],
///     vec![vec![1.into(), 2.into(), 3.into()]],
/// )?;
///
/// let mut manager = ArchiveManager::with_config(
///     "accounting_file",
///     Some(dataset.clone()),
///     &ArchiveConfig::with_root(root.path()),
/// )?;
/// let ArchiveOutcome::Archived { partition, .. } = manager.archive()? else {
///     unreachable!("dataset has rows");
/// };
///
/// let restored = manager.get_extracted_data(partition.year(), partition.month())?;
/// assert_eq!(restored, dataset);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ArchiveManager<S = LocalFileStorage, C = Box<dyn CompressionAdapter>>
where
    S: StorageAdapter,
    C: CompressionAdapter,
{
    identity: String,
    pending: Option<Dataset>,
    storage: S,
    compressor: C,
    /// Decompressed partition bytes awaiting deserialization
    extracted: Option<Vec<u8>>,
}

impl ArchiveManager {
    /// Create a manager with the default configuration: history directory
    /// `archive_hist` under the current directory, bzip2 compression
    pub fn new<I: Into<String>>(identity: I, dataset: Option<Dataset>) -> Result<Self> {
        Self::with_config(identity, dataset, &ArchiveConfig::default_local())
    }

    /// Create a manager for the given configuration
    ///
    /// # Errors
    /// * `AuditError::Validation` - If the configuration or identity is invalid
    /// * `AuditError::Storage` - If the history directory cannot be created
    pub fn with_config<I: Into<String>>(
        identity: I,
        dataset: Option<Dataset>,
        config: &ArchiveConfig,
    ) -> Result<Self> {
        config.validate()?;
        Self::with_adapters(
            identity,
            dataset,
            config.build_storage(),
            config.build_compressor(),
        )
    }
}

impl<S, C> ArchiveManager<S, C>
where
    S: StorageAdapter,
    C: CompressionAdapter,
{
    /// Create a manager over explicit storage and compression adapters
    ///
    /// Prepares the storage location; preparing an existing location is not
    /// an error.
    pub fn with_adapters<I: Into<String>>(
        identity: I,
        dataset: Option<Dataset>,
        storage: S,
        compressor: C,
    ) -> Result<Self> {
        let identity = identity.into();
        validate_identity(&identity)?;
        storage.prepare()?;

        info!(
            identity = %identity,
            history = %storage.locate("").display(),
            compression = compressor.algorithm_name(),
            "archive manager initialized"
        );

        Ok(Self {
            identity,
            pending: dataset,
            storage,
            compressor,
            extracted: None,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn pending_dataset(&self) -> Option<&Dataset> {
        self.pending.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the dataset to archive; validation happens on [`archive`](Self::archive)
    pub fn set_pending_dataset(&mut self, dataset: Dataset) {
        self.pending = Some(dataset);
    }

    /// Whether extracted bytes are waiting to be deserialized
    pub fn has_extracted_data(&self) -> bool {
        self.extracted.is_some()
    }

    /// Archive the pending dataset as the current month's partition
    ///
    /// A missing or zero-row dataset is not an error: it is logged and
    /// reported as [`ArchiveOutcome::RejectedEmpty`], and nothing is written.
    /// An existing partition for the current month is overwritten.
    ///
    /// # Errors
    /// * `AuditError::Json` - If the dataset cannot be serialized
    /// * `AuditError::Compression` - If compression fails
    /// * `AuditError::Storage` - If the partition cannot be written
    #[tracing::instrument(level = "info", skip(self), fields(identity = %self.identity))]
    pub fn archive(&self) -> Result<ArchiveOutcome> {
        self.archive_into(PartitionKey::current())
    }

    fn archive_into(&self, key: PartitionKey) -> Result<ArchiveOutcome> {
        let dataset = match &self.pending {
            Some(dataset) if !dataset.is_empty() => dataset,
            _ => {
                warn!(partition = %key, "dataset has no rows, nothing archived");
                record::rejected_empty();
                return Ok(ArchiveOutcome::RejectedEmpty);
            }
        };

        let dataset_bytes = serde_json::to_vec(dataset)?;
        let metadata = ArchiveMetadata::new(&self.identity, &key, dataset)
            .with_content_hash(&dataset_bytes)
            .with_compression_algorithm(self.compressor.algorithm_name());
        metadata.validate()?;

        let intermediate = serde_json::to_vec(&EnvelopeRef {
            metadata: &metadata,
            dataset,
        })?;
        let compressed = self.compressor.compress(&intermediate)?;

        let file_name = key.file_name(&self.identity);
        self.storage.save(&compressed, &file_name)?;
        let path = self.storage.locate(&file_name);

        record::archived(dataset_bytes.len());
        info!(
            partition = %key,
            path = %path.display(),
            rows = metadata.row_count,
            compressed_size = compressed.len(),
            "dataset archived"
        );

        Ok(ArchiveOutcome::Archived {
            partition: key,
            path,
            metadata,
            compressed_size: compressed.len(),
        })
    }

    /// Decompress the partition for `year`/`month` and hold it for
    /// deserialization
    ///
    /// `year` and `month` are used verbatim in the file name. A missing
    /// partition is logged and reported as [`ExtractOutcome::NotFound`];
    /// nothing is written and no extracted data is held afterwards.
    ///
    /// # Errors
    /// * `AuditError::Storage` - If the partition exists but cannot be read
    /// * `AuditError::Compression` - If the partition is not a valid stream
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(identity = %self.identity, year = %year, month = %month)
    )]
    pub fn extract(&mut self, year: impl Display, month: impl Display) -> Result<ExtractOutcome> {
        self.extract_key(PartitionKey::new(year, month))
    }

    fn extract_key(&mut self, key: PartitionKey) -> Result<ExtractOutcome> {
        self.extracted = None;

        let file_name = key.file_name(&self.identity);
        let path = self.storage.locate(&file_name);

        if key.is_ambiguous() || !self.storage.exists(&file_name) {
            warn!(partition = %key, path = %path.display(), "archive not available for period");
            record::period_missing();
            return Ok(ExtractOutcome::NotFound {
                partition: key,
                path,
            });
        }

        let compressed = self.storage.load(&file_name)?;
        let decompressed = self.compressor.decompress(&compressed)?;
        let size = decompressed.len();
        self.extracted = Some(decompressed);

        debug!(partition = %key, size, "partition extracted");
        Ok(ExtractOutcome::Extracted {
            partition: key,
            path,
            size,
        })
    }

    /// Deserialize the data held by the last successful [`extract`](Self::extract)
    ///
    /// The held bytes are consumed whether or not deserialization succeeds.
    ///
    /// # Errors
    /// * `AuditError::MissingIntermediate` - If nothing was extracted
    /// * `AuditError::Json` / `AuditError::InvalidFormat` - If the payload is malformed
    /// * `AuditError::IntegrityCheckFailed` - If the dataset does not match its hash
    pub fn take_extracted_data(&mut self) -> Result<Dataset> {
        let Some(bytes) = self.extracted.take() else {
            error!(identity = %self.identity, "no extracted data to deserialize");
            return Err(AuditError::missing_intermediate(&self.identity));
        };

        let envelope = self.decode(&bytes)?;
        record::extracted();
        info!(
            identity = %self.identity,
            partition = %envelope.metadata.partition,
            rows = envelope.metadata.row_count,
            "dataset extracted"
        );
        Ok(envelope.dataset)
    }

    /// Retrieve the dataset archived for `year`/`month`
    ///
    /// Runs [`extract`](Self::extract) followed by
    /// [`take_extracted_data`](Self::take_extracted_data). A missing period,
    /// soft at the `extract` level, surfaces here as
    /// `AuditError::MissingIntermediate`.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(identity = %self.identity, year = %year, month = %month)
    )]
    pub fn get_extracted_data(&mut self, year: impl Display, month: impl Display) -> Result<Dataset> {
        self.extract_key(PartitionKey::new(year, month))?;
        self.take_extracted_data()
    }

    /// Check if a partition exists for `year`/`month`
    pub fn partition_exists(&self, year: impl Display, month: impl Display) -> bool {
        let key = PartitionKey::new(year, month);
        !key.is_ambiguous() && self.storage.exists(&key.file_name(&self.identity))
    }

    /// All partitions stored for this identity, oldest first
    pub fn list_partitions(&self) -> Result<Vec<PartitionKey>> {
        let mut keys: Vec<PartitionKey> = self
            .storage
            .list()?
            .iter()
            .filter_map(|name| PartitionKey::parse_file_name(name, &self.identity))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Metadata of a stored partition, `None` if the period has no partition
    ///
    /// Does not touch data held by [`extract`](Self::extract).
    pub fn partition_metadata(
        &self,
        year: impl Display,
        month: impl Display,
    ) -> Result<Option<ArchiveMetadata>> {
        let key = PartitionKey::new(year, month);
        Ok(self.read_partition(&key)?.map(|envelope| envelope.metadata))
    }

    /// Fully decode a partition and check its integrity
    ///
    /// # Errors
    /// * `AuditError::Storage` - If the period has no partition
    /// * any decoding error [`get_extracted_data`](Self::get_extracted_data) would raise
    pub fn verify_partition(&self, year: impl Display, month: impl Display) -> Result<()> {
        let key = PartitionKey::new(year, month);
        match self.read_partition(&key)? {
            Some(_) => Ok(()),
            None => Err(AuditError::storage(format!(
                "no partition for period {key} of archive '{}'",
                self.identity
            ))),
        }
    }

    /// Remove the partition for `year`/`month`
    ///
    /// # Returns
    /// `true` if a partition was deleted, `false` if none existed
    ///
    /// # Errors
    /// * `AuditError::InvalidFormat` - If the stored partition was written by another identity
    pub fn delete_partition(&self, year: impl Display, month: impl Display) -> Result<bool> {
        let key = PartitionKey::new(year, month);
        if key.is_ambiguous() {
            return Ok(false);
        }

        let file_name = key.file_name(&self.identity);
        if let Some(owner) = self.foreign_owner(&file_name) {
            return Err(AuditError::invalid_format(format!(
                "partition {key} belongs to archive '{owner}', expected '{}'",
                self.identity
            )));
        }

        let deleted = self.storage.delete(&file_name)?;
        if deleted {
            info!(identity = %self.identity, partition = %key, "partition deleted");
        }
        Ok(deleted)
    }

    /// Identity recorded in a readable partition, if it is not ours
    ///
    /// Unreadable partitions report no owner so they stay deletable.
    fn foreign_owner(&self, file_name: &str) -> Option<String> {
        if !self.storage.exists(file_name) {
            return None;
        }
        let compressed = self.storage.load(file_name).ok()?;
        let decompressed = self.compressor.decompress(&compressed).ok()?;
        let envelope: ArchiveEnvelope = serde_json::from_slice(&decompressed).ok()?;
        let owner = envelope.metadata.identity;
        (owner != self.identity).then_some(owner)
    }

    fn read_partition(&self, key: &PartitionKey) -> Result<Option<ArchiveEnvelope>> {
        let file_name = key.file_name(&self.identity);
        if key.is_ambiguous() || !self.storage.exists(&file_name) {
            return Ok(None);
        }
        let compressed = self.storage.load(&file_name)?;
        let decompressed = self.compressor.decompress(&compressed)?;
        self.decode(&decompressed).map(Some)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ArchiveEnvelope> {
        let envelope: ArchiveEnvelope = serde_json::from_slice(bytes)?;
        let metadata = &envelope.metadata;

        if !metadata.is_compatible() {
            return Err(AuditError::invalid_format(format!(
                "Incompatible archive format version: {} (current: {})",
                metadata.format_version, METADATA_FORMAT_VERSION
            )));
        }
        if metadata.identity != self.identity {
            return Err(AuditError::invalid_format(format!(
                "partition belongs to archive '{}', expected '{}'",
                metadata.identity, self.identity
            )));
        }

        let dataset_bytes = serde_json::to_vec(&envelope.dataset)?;
        metadata.verify_integrity(&dataset_bytes)?;

        Ok(envelope)
    }
}
