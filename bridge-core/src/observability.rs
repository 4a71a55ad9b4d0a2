/*!
Observability for the bridge: structured logging setup and, behind the
`metrics` feature, Prometheus counters for store activity.
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{BridgeError, Result};

/// Default log directive applied when `RUST_LOG` does not mention the bridge
pub const DEFAULT_LOG_DIRECTIVE: &str = "bridge=info";

#[cfg(feature = "metrics")]
static METRICS: OnceLock<BridgeMetrics> = OnceLock::new();

/// Process-wide counters for bridge activity
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct BridgeMetrics {
    pub saves_total: IntCounter,
    pub restores_total: IntCounter,
    pub restore_misses_total: IntCounter,
    pub disk_write_failures_total: IntCounter,
    pub corrupt_entries_total: IntCounter,
    pub startup_wipes_total: IntCounter,
    pub blob_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)
        .map_err(|e| BridgeError::storage(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| BridgeError::storage(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl BridgeMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let saves_total = counter(&registry, "bridge_saves_total", "State blobs saved")?;
        let restores_total = counter(
            &registry,
            "bridge_restores_total",
            "Restores that delivered a state blob",
        )?;
        let restore_misses_total = counter(
            &registry,
            "bridge_restore_misses_total",
            "Restores that found no state blob",
        )?;
        let disk_write_failures_total = counter(
            &registry,
            "bridge_disk_write_failures_total",
            "State blobs kept in memory only after a failed write",
        )?;
        let corrupt_entries_total = counter(
            &registry,
            "bridge_corrupt_entries_total",
            "Persisted entries discarded as unreadable",
        )?;
        let startup_wipes_total = counter(
            &registry,
            "bridge_startup_wipes_total",
            "Wipes of persisted state on a fresh start",
        )?;

        let blob_size_bytes = Histogram::with_opts(
            HistogramOpts::new("bridge_blob_size_bytes", "Size of encoded state blobs in bytes")
                .buckets(prometheus::exponential_buckets(64.0, 4.0, 8).map_err(|e| {
                    BridgeError::storage(format!("Failed to build size buckets: {e}"))
                })?),
        )
        .map_err(|e| {
            BridgeError::storage(format!("Failed to create bridge_blob_size_bytes metric: {e}"))
        })?;
        registry
            .register(Box::new(blob_size_bytes.clone()))
            .map_err(|e| {
                BridgeError::storage(format!("Failed to register bridge_blob_size_bytes: {e}"))
            })?;

        Ok(Self {
            saves_total,
            restores_total,
            restore_misses_total,
            disk_write_failures_total,
            corrupt_entries_total,
            startup_wipes_total,
            blob_size_bytes,
            registry,
        })
    }

    /// Get or initialize the global metrics instance
    pub fn global() -> &'static BridgeMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize bridge metrics"))
    }

    pub fn record_save(&self) {
        self.saves_total.inc();
    }

    pub fn record_restore(&self, found: bool) {
        if found {
            self.restores_total.inc();
        } else {
            self.restore_misses_total.inc();
        }
    }

    pub fn record_disk_write_failure(&self) {
        self.disk_write_failures_total.inc();
    }

    pub fn record_corrupt_entry(&self) {
        self.corrupt_entries_total.inc();
    }

    pub fn record_startup_wipe(&self) {
        self.startup_wipes_total.inc();
    }

    pub fn record_blob_size(&self, size_bytes: usize) {
        self.blob_size_bytes.observe(size_bytes as f64);
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| BridgeError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| BridgeError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Install a JSON tracing subscriber for the whole process
///
/// Honours `RUST_LOG` and adds [`DEFAULT_LOG_DIRECTIVE`].
///
/// # Errors
/// `BridgeError::Storage` if a global subscriber is already installed
pub fn init_observability() -> Result<()> {
    #[cfg(feature = "metrics")]
    BridgeMetrics::global();

    let directive: Directive = DEFAULT_LOG_DIRECTIVE
        .parse()
        .map_err(|e| BridgeError::validation(format!("Invalid log directive: {e}")))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(false);

    let subscriber = TracingRegistry::default()
        .with(EnvFilter::from_default_env().add_directive(directive))
        .with(fmt_layer);

    set_global_default(subscriber).map_err(|e| {
        BridgeError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!("Bridge observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init_observability();
        assert!(init_observability().is_err());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_gathering() {
        let metrics = BridgeMetrics::global();
        metrics.record_save();
        metrics.record_restore(true);
        metrics.record_restore(false);
        metrics.record_blob_size(1024);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("bridge_saves_total"));
        assert!(text.contains("bridge_restore_misses_total"));
        assert!(text.contains("bridge_blob_size_bytes"));
    }
}
