/*!
End-to-end tests for archive managers over the local filesystem.
*/

use audit_trail_core::{
    ArchiveConfig, ArchiveManager, ArchiveOutcome, AuditError, CompressionKind, Dataset,
    ExtractOutcome, PartitionKey, Value,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn abc_dataset() -> Dataset {
    Dataset::from_rows(
        vec!["a", "b", "c"],
        vec![
            vec![1.into(), 2.into(), 3.into()],
            vec![4.into(), 5.into(), 6.into()],
            vec![7.into(), 8.into(), 9.into()],
        ],
    )
    .unwrap()
}

/// Partition written by a successful archive call
fn archived_key(outcome: ArchiveOutcome) -> PartitionKey {
    match outcome {
        ArchiveOutcome::Archived { partition, .. } => partition,
        ArchiveOutcome::RejectedEmpty => panic!("expected archive to be written"),
    }
}

/// Every file under `dir`, recursively, relative to `dir`
fn files_under(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(
                    path.strip_prefix(dir)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                );
            }
        }
    }
    found.sort();
    found
}

#[test]
fn test_accounting_file_scenario() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let mut manager =
        ArchiveManager::with_config("accounting_file", Some(abc_dataset()), &config).unwrap();
    let now = archived_key(manager.archive().unwrap());

    let expected = format!("archive_hist/{}_archive_accounting_file.bin", now.label());
    assert_eq!(files_under(root.path()), vec![expected.clone()]);

    // stored bytes are a bzip2 stream
    let stored = fs::read(root.path().join(&expected)).unwrap();
    assert!(stored.starts_with(b"BZh"));

    let restored = manager.get_extracted_data(now.year(), now.month()).unwrap();
    assert_eq!(restored, abc_dataset());
    assert_eq!(restored.columns(), &["a", "b", "c"]);

    // retrieval leaves nothing behind
    assert_eq!(files_under(root.path()), vec![expected]);
    assert!(!manager.has_extracted_data());
}

#[test]
fn test_empty_archive_scenario() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let mut manager =
        ArchiveManager::with_config("test_archive", Some(Dataset::default()), &config).unwrap();

    assert_eq!(manager.archive().unwrap(), ArchiveOutcome::RejectedEmpty);
    assert!(files_under(root.path()).is_empty());
    assert!(root.path().join("archive_hist").is_dir());

    let outcome = manager.extract(2020, "01").unwrap();
    assert!(matches!(outcome, ExtractOutcome::NotFound { .. }));
    assert!(files_under(root.path()).is_empty());

    let err = manager.take_extracted_data().unwrap_err();
    assert!(matches!(err, AuditError::MissingIntermediate { .. }));

    let now = PartitionKey::current();
    let err = manager
        .get_extracted_data(now.year(), now.month())
        .unwrap_err();
    assert!(matches!(err, AuditError::MissingIntermediate { .. }));
}

#[test]
fn test_wrong_extract_info_is_not_found() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());
    let mut manager = ArchiveManager::with_config("test_archive", None, &config).unwrap();

    let outcome = manager.extract("wrong_year", "wrong_month").unwrap();
    let ExtractOutcome::NotFound { partition, path } = outcome else {
        panic!("expected NotFound");
    };
    assert_eq!(partition.label(), "wrong_year-wrong_month");
    assert!(path.ends_with("wrong_year-wrong_month_archive_test_archive.bin"));
    assert!(!path.exists());
}

#[test]
fn test_out_of_range_month_is_simply_missing() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());
    let mut manager =
        ArchiveManager::with_config("ledger", Some(abc_dataset()), &config).unwrap();
    manager.archive().unwrap();

    assert!(!manager.extract(2021, 13).unwrap().is_extracted());
    assert!(!manager.extract(2021, 0).unwrap().is_extracted());
}

#[test]
fn test_second_archive_in_month_overwrites() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let mut manager =
        ArchiveManager::with_config("ledger", Some(abc_dataset()), &config).unwrap();
    manager.archive().unwrap();

    let latest = Dataset::from_rows(
        vec!["a", "b", "c"],
        vec![vec![10.into(), 20.into(), 30.into()]],
    )
    .unwrap();
    manager.set_pending_dataset(latest.clone());
    let now = archived_key(manager.archive().unwrap());

    assert_eq!(files_under(root.path()).len(), 1);
    assert_eq!(manager.list_partitions().unwrap(), vec![now.clone()]);
    assert_eq!(
        manager.get_extracted_data(now.year(), now.month()).unwrap(),
        latest
    );
}

#[test]
fn test_history_directory_creation_is_idempotent() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let managers: Vec<_> = ["ledger", "ledger", "payroll", "inventory"]
        .into_iter()
        .map(|identity| ArchiveManager::with_config(identity, None, &config))
        .collect();

    assert!(managers.iter().all(Result::is_ok));
    assert!(root.path().join("archive_hist").is_dir());
}

#[test]
fn test_separate_managers_share_history() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let writer = ArchiveManager::with_config("ledger", Some(abc_dataset()), &config).unwrap();
    let now = archived_key(writer.archive().unwrap());
    drop(writer);

    let mut reader = ArchiveManager::with_config("ledger", None, &config).unwrap();
    assert!(reader.partition_exists(now.year(), now.month()));
    assert_eq!(
        reader.get_extracted_data(now.year(), now.month()).unwrap(),
        abc_dataset()
    );

    let mut stranger = ArchiveManager::with_config("payroll", None, &config).unwrap();
    assert!(stranger.list_partitions().unwrap().is_empty());
    assert!(stranger.get_extracted_data(now.year(), now.month()).is_err());
}

#[test]
fn test_custom_history_dir_and_gzip() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path())
        .history_dir("monthly")
        .compression(CompressionKind::Gzip, Some(9));

    let mut manager =
        ArchiveManager::with_config("ledger", Some(abc_dataset()), &config).unwrap();
    let ArchiveOutcome::Archived {
        partition: now,
        path,
        metadata,
        ..
    } = manager.archive().unwrap()
    else {
        panic!("expected archive to be written");
    };

    assert!(path.starts_with(root.path().join("monthly")));
    assert_eq!(metadata.compression_algorithm, "gzip");
    // gzip magic
    assert!(fs::read(&path).unwrap().starts_with(&[0x1f, 0x8b]));
    assert_eq!(
        manager.get_extracted_data(now.year(), now.month()).unwrap(),
        abc_dataset()
    );
}

#[test]
fn test_codec_mismatch_is_fatal() {
    let root = TempDir::new().unwrap();

    let gzip = ArchiveConfig::with_root(root.path()).compression(CompressionKind::Gzip, None);
    let now = archived_key(
        ArchiveManager::with_config("ledger", Some(abc_dataset()), &gzip)
            .unwrap()
            .archive()
            .unwrap(),
    );

    let bzip2 = ArchiveConfig::with_root(root.path());
    let mut manager = ArchiveManager::with_config("ledger", None, &bzip2).unwrap();
    let err = manager.get_extracted_data(now.year(), now.month()).unwrap_err();
    assert!(matches!(err, AuditError::Compression(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path()).history_dir("../outside");

    let result = ArchiveManager::with_config("ledger", None, &config);
    assert!(matches!(result, Err(AuditError::Validation(_))));
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_wide_dataset_precision_roundtrip() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let columns: Vec<String> = (0..12).map(|i| format!("col_{i:02}")).collect();
    let rows: Vec<Vec<Value>> = (0..500)
        .map(|r| {
            (0..12)
                .map(|c| match c % 4 {
                    0 => Value::Int(r * 1_000_003 + c),
                    1 => Value::Float((r as f64 + 0.1) / (c as f64 + 3.0)),
                    2 => Value::Text(format!("row {r} col {c}")),
                    _ if r % 7 == 0 => Value::Null,
                    _ => Value::Bool(r % 2 == 0),
                })
                .collect()
        })
        .collect();
    let dataset = Dataset::from_rows(columns, rows).unwrap();

    let mut manager =
        ArchiveManager::with_config("wide", Some(dataset.clone()), &config).unwrap();
    let now = archived_key(manager.archive().unwrap());

    let restored = manager.get_extracted_data(now.year(), now.month()).unwrap();
    assert_eq!(restored.shape(), (500, 12));
    assert_eq!(restored, dataset);
}

#[test]
fn test_partition_management() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let manager = ArchiveManager::with_config("ledger", Some(abc_dataset()), &config).unwrap();
    let now = archived_key(manager.archive().unwrap());

    let metadata = manager
        .partition_metadata(now.year(), now.month())
        .unwrap()
        .expect("partition metadata");
    assert_eq!(metadata.identity, "ledger");
    assert_eq!(metadata.partition, now.label());
    assert_eq!((metadata.row_count, metadata.column_count), (3, 3));

    manager.verify_partition(now.year(), now.month()).unwrap();
    assert!(manager.delete_partition(now.year(), now.month()).unwrap());
    assert!(manager.list_partitions().unwrap().is_empty());
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_identity_suffix_does_not_expose_other_archive() {
    let root = TempDir::new().unwrap();
    let config = ArchiveConfig::with_root(root.path());

    let other =
        ArchiveManager::with_config("x_archive_file", Some(abc_dataset()), &config).unwrap();
    let written = archived_key(other.archive().unwrap());

    let file = ArchiveManager::with_config("file", None, &config).unwrap();
    assert!(file.list_partitions().unwrap().is_empty());

    // the other archive's file name, reached through a crafted month
    let crafted_month = format!("{}_archive_x", written.month());
    assert!(!file.partition_exists(written.year(), &crafted_month));
    assert!(!file.delete_partition(written.year(), &crafted_month).unwrap());

    assert!(other.partition_exists(written.year(), written.month()));
    assert_eq!(other.list_partitions().unwrap(), vec![written]);
}
