/*!
# Audit Trail Core

Monthly archival of tabular dataset snapshots for audit trail processes.

An [`ArchiveManager`] owns one archive identity. Each call to
[`ArchiveManager::archive`] serializes the pending [`Dataset`], compresses it
(bzip2 by default) and stores it as the partition of the current calendar
month:

```text
<root>/archive_hist/{YYYY}-{MM}_archive_{identity}.bin
```

Any stored month can later be restored exactly with
[`ArchiveManager::get_extracted_data`].

## Architecture

- Storage and compression are adapters behind the [`StorageAdapter`] and
  [`CompressionAdapter`] traits
- Each partition carries [`ArchiveMetadata`] with a content hash that is
  verified on retrieval
- Expected conditions (empty dataset, missing period) are reported as
  outcome values; everything else is an [`AuditError`]

## Usage

```rust
use audit_trail_core::{ArchiveConfig, ArchiveManager, ArchiveOutcome, Dataset};

let root = tempfile::tempdir()?;
let config = ArchiveConfig::with_root(root.path());

let mut manager = ArchiveManager::with_config("test_archive", None, &config)?;
manager.set_pending_dataset(Dataset::new(["a", "b"]));

// zero rows: rejected, nothing written
assert_eq!(manager.archive()?, ArchiveOutcome::RejectedEmpty);

// no partition for the period: soft at the extract level...
assert!(!manager.extract(2020, "01")?.is_extracted());
// ...fatal for retrieval
assert!(manager.get_extracted_data(2020, "01").is_err());
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod archive;
pub mod compression;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metadata;
pub mod observability;
pub mod partition;
pub mod storage;


pub use archive::{ArchiveManager, ArchiveOutcome, ExtractOutcome};
pub use compression::{
    Bzip2Compressor, CompressionAdapter, CompressionKind, GzipCompressor, NoCompression,
};
pub use config::ArchiveConfig;
pub use dataset::{Dataset, Value};
pub use error::{AuditError, Result};
pub use metadata::ArchiveMetadata;
pub use observability::init_logging;
pub use partition::PartitionKey;
pub use storage::{LocalFileStorage, StorageAdapter};
