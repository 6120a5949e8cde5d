/*!
Audit Trail CLI - command-line interface for the monthly dataset archive.

Archives JSON datasets as the current month's partition and restores,
inspects, verifies or deletes stored partitions.
*/

use anyhow::{bail, Context};
use audit_trail_core::{
    init_logging, ArchiveConfig, ArchiveManager, ArchiveOutcome, AuditError, CompressionKind,
    Dataset, ExtractOutcome, PartitionKey, StorageAdapter,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "audit-trail")]
#[command(about = "Monthly archive of tabular dataset snapshots")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Directory containing the history directory [env: AUDIT_TRAIL_ROOT]
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Name of the history directory [env: AUDIT_TRAIL_HISTORY_DIR]
    #[arg(long, global = true)]
    history_dir: Option<String>,

    /// Compression codec, bzip2 or gzip [env: AUDIT_TRAIL_COMPRESSION]
    #[arg(short, long, global = true)]
    compression: Option<CompressionKind>,

    /// Compression level for the codec
    #[arg(long, global = true)]
    level: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Archive a JSON dataset as the current month's partition
    Archive {
        /// Archive identity
        identity: String,
        /// Dataset file, `-` for stdin
        ///
        /// `{"columns": ["a"], "rows": [[{"int": 1}], ["null"]]}`; cells are
        /// `{"int": ..}`, `{"float": ..}`, `{"bool": ..}`, `{"text": ..}` or `"null"`
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },
    /// Restore the dataset archived for a period
    Restore {
        identity: String,
        year: String,
        month: String,
        /// Write the dataset here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List stored partitions of an archive
    List { identity: String },
    /// Show metadata of a partition
    Show {
        identity: String,
        year: String,
        month: String,
    },
    /// Verify integrity of a partition
    Verify {
        identity: String,
        year: String,
        month: String,
    },
    /// Delete a partition
    Delete {
        identity: String,
        year: String,
        month: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct PartitionInfo {
    #[tabled(rename = "Partition")]
    partition: String,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "Columns")]
    columns: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Codec")]
    codec: String,
    #[tabled(rename = "Size")]
    size: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let config = build_config(&cli)?;

    match cli.command {
        Commands::Archive { identity, input } => archive_dataset(&config, identity, &input)?,
        Commands::Restore {
            identity,
            year,
            month,
            output,
            pretty,
        } => restore_dataset(&config, identity, &year, &month, output.as_deref(), pretty)?,
        Commands::List { identity } => list_partitions(&config, identity)?,
        Commands::Show {
            identity,
            year,
            month,
        } => show_partition(&config, identity, &year, &month)?,
        Commands::Verify {
            identity,
            year,
            month,
        } => verify_partition(&config, identity, &year, &month)?,
        Commands::Delete {
            identity,
            year,
            month,
            force,
        } => delete_partition(&config, identity, &year, &month, force)?,
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied on top
fn build_config(cli: &Cli) -> Result<ArchiveConfig, anyhow::Error> {
    let mut config = ArchiveConfig::from_env()?;

    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(history_dir) = &cli.history_dir {
        config.history_dir = history_dir.clone();
    }
    if let Some(kind) = cli.compression {
        config.compression = kind;
    }
    if cli.level.is_some() {
        config.compression_level = cli.level;
    }

    config.validate()?;
    Ok(config)
}

fn read_dataset(input: &std::path::Path) -> Result<Dataset, anyhow::Error> {
    let mut raw = String::new();
    if input.as_os_str() == "-" {
        io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
    }

    let dataset: Dataset = serde_json::from_str(&raw).context("input is not a valid dataset")?;
    Ok(dataset)
}

fn archive_dataset(
    config: &ArchiveConfig,
    identity: String,
    input: &std::path::Path,
) -> Result<(), anyhow::Error> {
    let dataset = read_dataset(input)?;
    info!(identity = %identity, rows = dataset.row_count(), "archiving dataset");

    let manager = ArchiveManager::with_config(identity, Some(dataset), config)?;

    match manager.archive()? {
        ArchiveOutcome::Archived {
            partition,
            path,
            metadata,
            compressed_size,
        } => {
            println!("✓ Archived partition {partition}");
            println!("  Path: {}", path.display());
            println!(
                "  Shape: {} rows x {} columns",
                metadata.row_count, metadata.column_count
            );
            println!(
                "  Size: {} ({} uncompressed)",
                format_size(compressed_size as u64),
                format_size(metadata.uncompressed_size as u64)
            );
        }
        ArchiveOutcome::RejectedEmpty => {
            println!("Dataset has no rows, nothing archived");
        }
    }

    Ok(())
}

fn restore_dataset(
    config: &ArchiveConfig,
    identity: String,
    year: &str,
    month: &str,
    output: Option<&std::path::Path>,
    pretty: bool,
) -> Result<(), anyhow::Error> {
    let mut manager = ArchiveManager::with_config(identity, None, config)?;

    if let ExtractOutcome::NotFound { partition, path } = manager.extract(year, month)? {
        bail!(
            "no archive of '{}' for period {partition} (expected {})",
            manager.identity(),
            path.display()
        );
    }
    let dataset = manager.take_extracted_data()?;

    let json = if pretty {
        serde_json::to_string_pretty(&dataset)?
    } else {
        serde_json::to_string(&dataset)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "✓ Restored {} rows to {}",
                dataset.row_count(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn list_partitions(config: &ArchiveConfig, identity: String) -> Result<(), anyhow::Error> {
    let manager = ArchiveManager::with_config(identity, None, config)?;
    info!(identity = %manager.identity(), "listing partitions");

    let mut rows = Vec::new();
    for key in manager.list_partitions()? {
        rows.push(partition_info(&manager, &key));
    }

    if rows.is_empty() {
        println!("No partitions found for '{}'", manager.identity());
    } else {
        println!("{}", Table::new(rows));
    }

    Ok(())
}

fn partition_info(manager: &ArchiveManager, key: &PartitionKey) -> PartitionInfo {
    let path = manager.storage().locate(&key.file_name(manager.identity()));
    let size = match std::fs::metadata(&path) {
        Ok(meta) => format_size(meta.len()),
        Err(_) => "Unknown".to_string(),
    };

    match manager.partition_metadata(key.year(), key.month()) {
        Ok(Some(metadata)) => PartitionInfo {
            partition: key.label(),
            rows: metadata.row_count.to_string(),
            columns: metadata.column_count.to_string(),
            created: format_timestamp(&metadata.timestamp),
            codec: metadata.compression_algorithm,
            size,
        },
        Ok(None) | Err(_) => {
            warn!(partition = %key, "failed to read partition metadata");
            PartitionInfo {
                partition: key.label(),
                rows: "?".to_string(),
                columns: "?".to_string(),
                created: "unreadable".to_string(),
                codec: "?".to_string(),
                size,
            }
        }
    }
}

fn show_partition(
    config: &ArchiveConfig,
    identity: String,
    year: &str,
    month: &str,
) -> Result<(), anyhow::Error> {
    let manager = ArchiveManager::with_config(identity, None, config)?;

    let Some(metadata) = manager.partition_metadata(year, month)? else {
        bail!(
            "no archive of '{}' for period {year}-{month}",
            manager.identity()
        );
    };

    println!("Partition Details:");
    println!("  Identity: {}", metadata.identity);
    println!("  Partition: {}", metadata.partition);
    println!("  Archive ID: {}", metadata.archive_id);
    println!("  Created: {}", format_timestamp(&metadata.timestamp));
    println!(
        "  Shape: {} rows x {} columns",
        metadata.row_count, metadata.column_count
    );
    println!(
        "  Uncompressed: {}",
        format_size(metadata.uncompressed_size as u64)
    );
    println!("  Compression: {}", metadata.compression_algorithm);
    println!("  Format Version: {}", metadata.format_version);
    println!("  Content Hash: {}", metadata.content_hash);

    Ok(())
}

fn verify_partition(
    config: &ArchiveConfig,
    identity: String,
    year: &str,
    month: &str,
) -> Result<(), anyhow::Error> {
    let manager = ArchiveManager::with_config(identity, None, config)?;
    info!(identity = %manager.identity(), year, month, "verifying partition");

    match manager.verify_partition(year, month) {
        Ok(()) => {
            println!("✓ Partition is valid and integrity check passed");
        }
        Err(AuditError::IntegrityCheckFailed { expected, actual }) => {
            error!("✗ Integrity check failed:");
            error!("  Expected hash: {}", expected);
            error!("  Actual hash: {}", actual);
            bail!("Integrity check failed");
        }
        Err(e) => {
            error!("✗ Failed to verify partition: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

fn delete_partition(
    config: &ArchiveConfig,
    identity: String,
    year: &str,
    month: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    let manager = ArchiveManager::with_config(identity, None, config)?;

    if !force {
        print!(
            "Are you sure you want to delete partition {year}-{month} of '{}'? (y/N): ",
            manager.identity()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    if manager.delete_partition(year, month)? {
        println!("✓ Partition deleted successfully");
    } else {
        println!("No partition {year}-{month} for '{}'", manager.identity());
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
