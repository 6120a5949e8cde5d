/*!
Monthly partition keys and the archive file naming scheme.

Partition files are named `{year}-{month}_archive_{identity}.bin`. Keys built
from the clock always render as a four-digit year and a zero-padded month;
keys supplied by callers for retrieval are used verbatim.
*/

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AuditError, Result};

/// Infix between the partition label and the archive identity
pub const ARCHIVE_INFIX: &str = "_archive_";

/// Extension carried by every partition file
pub const ARCHIVE_EXTENSION: &str = ".bin";

/// Year/month pair selecting one partition
///
/// Components are opaque strings: `PartitionKey::new(2020, 1)` and
/// `PartitionKey::new("2020", "01")` name different files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    year: String,
    month: String,
}

impl PartitionKey {
    /// Build a key from caller-supplied components, used as-is
    pub fn new(year: impl fmt::Display, month: impl fmt::Display) -> Self {
        Self {
            year: year.to_string(),
            month: month.to_string(),
        }
    }

    /// Key for the current calendar month of the local clock
    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// Key for the calendar month containing `date`
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
        }
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    /// `{year}-{month}`
    pub fn label(&self) -> String {
        format!("{}-{}", self.year, self.month)
    }

    /// Partition file name for an archive identity
    pub fn file_name(&self, identity: &str) -> String {
        format!(
            "{}-{}{ARCHIVE_INFIX}{identity}{ARCHIVE_EXTENSION}",
            self.year, self.month
        )
    }

    /// Whether the label contains the archive infix
    ///
    /// The file name of such a key for identity `file` can coincide with a
    /// clock key's file name for a longer identity: `("2026", "10_archive_x")`
    /// under `file` and `("2026", "10")` under `x_archive_file` both name
    /// `2026-10_archive_x_archive_file.bin`. Clock keys are never ambiguous.
    pub fn is_ambiguous(&self) -> bool {
        self.label().contains(ARCHIVE_INFIX)
    }

    /// Recover the key from a partition file name belonging to `identity`
    ///
    /// Returns `None` for files of other identities or foreign names.
    pub fn parse_file_name(file_name: &str, identity: &str) -> Option<Self> {
        let label = file_name
            .strip_suffix(ARCHIVE_EXTENSION)?
            .strip_suffix(identity)?
            .strip_suffix(ARCHIVE_INFIX)?;
        let (year, month) = label.split_once('-')?;
        if year.is_empty() || month.is_empty() {
            return None;
        }
        let key = Self::new(year, month);
        (!key.is_ambiguous()).then_some(key)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

/// Check that an archive identity can be embedded in a file name
pub fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(AuditError::validation("archive identity cannot be empty"));
    }
    if identity == "." || identity == ".." {
        return Err(AuditError::validation(format!(
            "archive identity '{identity}' is reserved"
        )));
    }
    if identity.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(AuditError::validation(format!(
            "archive identity '{identity}' contains a path separator"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_layout() {
        let key = PartitionKey::new("2021", "11");
        assert_eq!(
            key.file_name("accounting_file"),
            "2021-11_archive_accounting_file.bin"
        );
        assert_eq!(key.label(), "2021-11");
        assert_eq!(key.to_string(), "2021-11");
    }

    #[test]
    fn test_clock_keys_are_zero_padded() {
        let key = PartitionKey::for_date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(key.year(), "2024");
        assert_eq!(key.month(), "03");

        let current = PartitionKey::current();
        assert_eq!(current.year().len(), 4);
        assert_eq!(current.month().len(), 2);
    }

    #[test]
    fn test_caller_components_are_opaque() {
        assert_eq!(PartitionKey::new(2020, 1).label(), "2020-1");
        assert_ne!(PartitionKey::new(2020, 1), PartitionKey::new("2020", "01"));
        assert_eq!(
            PartitionKey::new("wrong_year", "wrong_month").file_name("x"),
            "wrong_year-wrong_month_archive_x.bin"
        );
        assert_eq!(PartitionKey::new(2020, 13).month(), "13");
    }

    #[test]
    fn test_parse_file_name() {
        let key = PartitionKey::parse_file_name("2021-11_archive_accounting_file.bin", "accounting_file");
        assert_eq!(key, Some(PartitionKey::new("2021", "11")));

        // identity that is a suffix of another identity
        assert_eq!(
            PartitionKey::parse_file_name("2021-11_archive_old_file.bin", "file"),
            None
        );
        assert_eq!(
            PartitionKey::parse_file_name("2021-11_archive_accounting_file.bin", "payroll"),
            None
        );
        assert_eq!(
            PartitionKey::parse_file_name("accounting_file", "accounting_file"),
            None
        );
        assert_eq!(
            PartitionKey::parse_file_name("202111_archive_accounting_file.bin", "accounting_file"),
            None
        );
    }

    #[test]
    fn test_parse_file_name_skips_longer_identity_with_infix() {
        let name = PartitionKey::new("2026", "10").file_name("x_archive_file");
        assert_eq!(name, "2026-10_archive_x_archive_file.bin");

        assert_eq!(PartitionKey::parse_file_name(&name, "file"), None);
        assert_eq!(
            PartitionKey::parse_file_name(&name, "x_archive_file"),
            Some(PartitionKey::new("2026", "10"))
        );
    }

    #[test]
    fn test_ambiguous_keys() {
        assert!(PartitionKey::new("2026", "10_archive_x").is_ambiguous());
        assert!(PartitionKey::new("a_archive_b", "10").is_ambiguous());
        assert!(!PartitionKey::new("2026", "10").is_ambiguous());
        assert!(!PartitionKey::new("wrong_year", "wrong_month").is_ambiguous());
        assert!(!PartitionKey::current().is_ambiguous());
    }

    #[test]
    fn test_round_trip_through_file_name() {
        let key = PartitionKey::for_date(NaiveDate::from_ymd_opt(1999, 12, 1).unwrap());
        let name = key.file_name("ledger");
        assert_eq!(PartitionKey::parse_file_name(&name, "ledger"), Some(key));
    }

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity("accounting_file").is_ok());
        assert!(validate_identity("with space.v2").is_ok());
        assert!(validate_identity("").is_err());
        assert!(validate_identity("..").is_err());
        assert!(validate_identity("nested/name").is_err());
        assert!(validate_identity("nested\\name").is_err());
    }
}
