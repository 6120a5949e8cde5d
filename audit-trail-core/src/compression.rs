/*!
Compression adapters for archive partitions.

Partitions are bzip2 compressed by default. The adapter trait keeps the
archive manager independent of the codec, so gzip (or no compression, in
tests) can be swapped in through configuration.
*/

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::{read::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use crate::{AuditError, Result};

/// Compression abstraction for archive payloads
///
/// This trait defines the interface for all compression implementations.
pub trait CompressionAdapter {
    /// Compress the input data
    ///
    /// # Arguments
    /// * `data` - The data to compress
    ///
    /// # Returns
    /// The compressed data or an error
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the input data
    ///
    /// # Arguments
    /// * `compressed_data` - The compressed data to decompress
    ///
    /// # Returns
    /// The decompressed data or an error
    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of the compression algorithm
    fn algorithm_name(&self) -> &str;
}

impl<C: CompressionAdapter + ?Sized> CompressionAdapter for Box<C> {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).compress(data)
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        (**self).decompress(compressed_data)
    }

    fn algorithm_name(&self) -> &str {
        (**self).algorithm_name()
    }
}

/// Codec selector used by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    Bzip2,
    Gzip,
}

impl CompressionKind {
    /// Valid compression levels for this codec
    pub fn level_range(self) -> std::ops::RangeInclusive<u32> {
        match self {
            CompressionKind::Bzip2 => 1..=9,
            CompressionKind::Gzip => 0..=9,
        }
    }

    /// Build the adapter for this codec, with the codec's default level when
    /// `level` is `None`
    pub fn build(self, level: Option<u32>) -> Box<dyn CompressionAdapter> {
        match (self, level) {
            (CompressionKind::Bzip2, Some(level)) => Box::new(Bzip2Compressor::with_level(level)),
            (CompressionKind::Bzip2, None) => Box::new(Bzip2Compressor::new()),
            (CompressionKind::Gzip, Some(level)) => Box::new(GzipCompressor::with_level(level)),
            (CompressionKind::Gzip, None) => Box::new(GzipCompressor::new()),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::Bzip2 => f.write_str("bzip2"),
            CompressionKind::Gzip => f.write_str("gzip"),
        }
    }
}

impl FromStr for CompressionKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bzip2" | "bz2" => Ok(CompressionKind::Bzip2),
            "gzip" | "gz" => Ok(CompressionKind::Gzip),
            other => Err(AuditError::validation(format!(
                "unknown compression algorithm '{other}'"
            ))),
        }
    }
}

/// Bzip2 compression adapter
///
/// Output is a standard `.bz2` stream, readable by any bzip2 tool. Input made
/// of several concatenated streams decompresses as one.
///
/// # Example
/// ```rust
/// use audit_trail_core::{Bzip2Compressor, CompressionAdapter};
///
/// let compressor = Bzip2Compressor::new();
/// let data = b"month-end ledger rows";
/// let compressed = compressor.compress(data)?;
/// let decompressed = compressor.decompress(&compressed)?;
/// assert_eq!(data, &decompressed[..]);
/// # Ok::<(), audit_trail_core::AuditError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Bzip2Compressor {
    compression_level: bzip2::Compression,
}

impl Bzip2Compressor {
    /// Create a new bzip2 compressor with the maximum block size (level 9)
    pub fn new() -> Self {
        Self {
            compression_level: bzip2::Compression::best(),
        }
    }

    /// Create a new bzip2 compressor with the specified level
    ///
    /// # Arguments
    /// * `level` - Block size in 100k units, 1 to 9; clamped into that range
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: bzip2::Compression::new(level.clamp(1, 9)),
        }
    }

    /// Create a compressor for fast compression (level 1)
    pub fn fast() -> Self {
        Self::with_level(1)
    }
}

impl Default for Bzip2Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for Bzip2Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = BzEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            AuditError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| AuditError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = MultiBzDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| AuditError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "bzip2"
    }
}

/// Gzip compression adapter
///
/// Faster than bzip2 at the cost of a larger archive.
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    compression_level: flate2::Compression,
}

impl GzipCompressor {
    /// Create a new gzip compressor with default compression level (6)
    pub fn new() -> Self {
        Self {
            compression_level: flate2::Compression::default(),
        }
    }

    /// Create a new gzip compressor with the specified compression level
    ///
    /// # Arguments
    /// * `level` - Compression level (0-9, where 0 is no compression and 9 is maximum)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: flate2::Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            AuditError::compression(format!("Failed to write data for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| AuditError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| AuditError::compression(format!("Failed to decompress data: {e}")))?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }
}

/// Pass-through adapter, used in tests to inspect stored payloads
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

impl NoCompression {
    pub fn new() -> Self {
        Self
    }
}

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed_data.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}
