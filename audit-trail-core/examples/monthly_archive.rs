/*!
Archive this month's ledger snapshot and read it back.

Run with `RUST_LOG=info cargo run --example monthly_archive`.
*/

use audit_trail_core::observability::init_logging;
use audit_trail_core::{ArchiveConfig, ArchiveManager, ArchiveOutcome, Dataset, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(false, false)?;

    let root = tempfile::TempDir::new()?;
    let config = ArchiveConfig::with_root(root.path());

    let mut ledger = Dataset::new(["date", "account", "description", "amount"]);
    for day in 1..=28 {
        ledger.push_row(vec![
            format!("2021-11-{day:02}").into(),
            Value::Int(4000 + i64::from(day % 4) * 10),
            format!("entry {day}").into(),
            (f64::from(day) * 12.75).into(),
        ])?;
    }

    let manager = ArchiveManager::with_config("accounting_file", Some(ledger.clone()), &config)?;
    let outcome = manager.archive()?;
    println!("{outcome:?}");
    let ArchiveOutcome::Archived { partition: now, .. } = outcome else {
        return Err("ledger was not archived".into());
    };

    let mut reader = ArchiveManager::with_config("accounting_file", None, &config)?;
    let restored = reader.get_extracted_data(now.year(), now.month())?;

    assert_eq!(restored, ledger);
    println!(
        "restored {} rows x {} columns from {}",
        restored.row_count(),
        restored.column_count(),
        now
    );
    Ok(())
}
