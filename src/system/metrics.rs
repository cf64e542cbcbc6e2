//! Prometheus metrics for population runs
//!
//! Metrics are registered once in a crate-local registry. If registration
//! fails the populator keeps working and simply records nothing.

use std::time::Instant;
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, register_histogram_with_registry, register_int_counter_with_registry,
    Histogram, IntCounter, Registry,
};
use crate::types::Result;

/// Crate metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Counters and timings for deep population
pub struct PopulateMetrics {
    /// Resolutions started
    pub resolutions: IntCounter,
    /// Resolutions that returned an error
    pub resolutions_failed: IntCounter,
    /// Store fetches issued
    pub fetches: IntCounter,
    /// Store fetches (or attaches) that failed
    pub fetches_failed: IntCounter,
    /// Levels whose fetches all settled
    pub levels_joined: IntCounter,
    /// Duration of a whole resolution in seconds
    pub resolution_duration: Histogram,
}

impl PopulateMetrics {
    /// Register every metric in `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            resolutions: register_int_counter_with_registry!(
                "dp_resolutions_total",
                "Total deep population resolutions started",
                registry
            )?,
            resolutions_failed: register_int_counter_with_registry!(
                "dp_resolutions_failed_total",
                "Total deep population resolutions that failed",
                registry
            )?,
            fetches: register_int_counter_with_registry!(
                "dp_fetches_total",
                "Total store fetches issued",
                registry
            )?,
            fetches_failed: register_int_counter_with_registry!(
                "dp_fetches_failed_total",
                "Total store fetches or attaches that failed",
                registry
            )?,
            levels_joined: register_int_counter_with_registry!(
                "dp_levels_joined_total",
                "Total levels whose fetches all settled",
                registry
            )?,
            resolution_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "dp_resolution_duration_seconds",
                    "Duration of deep population resolutions in seconds",
                    vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
                ),
                registry
            )?,
        })
    }

    /// Global metrics instance, `None` if registration failed
    pub fn global() -> Option<&'static PopulateMetrics> {
        static INSTANCE: Lazy<Option<PopulateMetrics>> = Lazy::new(|| {
            PopulateMetrics::new(&REGISTRY)
                .map_err(|e| tracing::warn!(error = %e, "metrics registration failed"))
                .ok()
        });
        INSTANCE.as_ref()
    }
}

/// Timer recording into a histogram when finished
pub struct Timer {
    start: Instant,
    histogram: Histogram,
}

impl Timer {
    /// Start a new timer
    pub fn start(histogram: &Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram: histogram.clone(),
        }
    }

    /// Record the elapsed time and consume the timer
    pub fn finish(self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Run `f` against the global metrics when they are available
pub fn record(f: impl FnOnce(&PopulateMetrics)) {
    if let Some(metrics) = PopulateMetrics::global() {
        f(metrics);
    }
}

/// Register the global metrics eagerly
pub fn init_registry() {
    let _ = PopulateMetrics::global();
}

/// Registry holding the crate's metrics
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String> {
    let encoder = prometheus::TextEncoder::new();
    Ok(encoder.encode_to_string(&registry().gather())?)
}
