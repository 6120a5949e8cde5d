/*!
Observability infrastructure for the audit trail.

- Structured logging setup on top of `tracing-subscriber`
- Prometheus counters for archive outcomes (`metrics` feature)
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::{AuditError, Result};

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<ArchiveMetrics> = OnceLock::new();

/// Outcome counters for archive managers in this process
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct ArchiveMetrics {
    pub archived_total: IntCounter,
    pub rejected_empty_total: IntCounter,
    pub extracted_total: IntCounter,
    pub period_missing_total: IntCounter,
    /// Serialized (uncompressed) dataset sizes
    pub payload_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
impl ArchiveMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let counter = IntCounter::new(name, help).map_err(|e| {
                AuditError::storage(format!("Failed to create {name} metric: {e}"))
            })?;
            registry.register(Box::new(counter.clone())).map_err(|e| {
                AuditError::storage(format!("Failed to register {name}: {e}"))
            })?;
            Ok(counter)
        };

        let archived_total = counter(
            "audit_trail_archived_total",
            "Partitions written by archive managers",
        )?;
        let rejected_empty_total = counter(
            "audit_trail_rejected_empty_total",
            "Archive calls rejected because the dataset had no rows",
        )?;
        let extracted_total = counter(
            "audit_trail_extracted_total",
            "Partitions decompressed for retrieval",
        )?;
        let period_missing_total = counter(
            "audit_trail_period_missing_total",
            "Extractions that found no partition for the requested period",
        )?;

        let payload_size_bytes = Histogram::with_opts(HistogramOpts::new(
            "audit_trail_payload_size_bytes",
            "Size of serialized datasets in bytes",
        ))
        .map_err(|e| {
            AuditError::storage(format!("Failed to create payload_size_bytes metric: {e}"))
        })?;
        registry
            .register(Box::new(payload_size_bytes.clone()))
            .map_err(|e| {
                AuditError::storage(format!("Failed to register payload_size_bytes: {e}"))
            })?;

        Ok(Self {
            archived_total,
            rejected_empty_total,
            extracted_total,
            period_missing_total,
            payload_size_bytes,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static ArchiveMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize audit trail metrics"))
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AuditError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| AuditError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Outcome hooks called by the archive manager; no-ops without `metrics`
pub(crate) mod record {
    #[cfg(feature = "metrics")]
    use super::ArchiveMetrics;

    pub fn archived(_payload_bytes: usize) {
        #[cfg(feature = "metrics")]
        {
            let metrics = ArchiveMetrics::global();
            metrics.archived_total.inc();
            metrics.payload_size_bytes.observe(_payload_bytes as f64);
        }
    }

    pub fn rejected_empty() {
        #[cfg(feature = "metrics")]
        ArchiveMetrics::global().rejected_empty_total.inc();
    }

    pub fn extracted() {
        #[cfg(feature = "metrics")]
        ArchiveMetrics::global().extracted_total.inc();
    }

    pub fn period_missing() {
        #[cfg(feature = "metrics")]
        ArchiveMetrics::global().period_missing_total.inc();
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set. With `json` the output is one JSON object per
/// event.
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| {
        AuditError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("audit trail logging initialized");
    Ok(())
}
