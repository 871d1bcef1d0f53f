//! Observability for scoring and training runs
//!
//! Provides:
//! - Prometheus metrics (studios scored, failures, cache hits, malformed records, latency)
//! - Structured logging of named scoring and training events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Encoder, Histogram, IntCounter,
    IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-studio scoring latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.0001, 0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScorerMetricsInner> = OnceLock::new();

struct ScorerMetricsInner {
    studios_scored: IntCounter,
    studio_failures: IntCounter,
    cache_hits: IntCounter,
    malformed_records: IntCounter,
    scoring_latency_seconds: Histogram,
    training_iterations: IntGauge,
}

impl ScorerMetricsInner {
    fn new() -> Self {
        Self {
            studios_scored: register_int_counter!(
                "crunch_studios_scored_total",
                "Total number of studios scored"
            )
            .expect("Failed to register studios_scored"),

            studio_failures: register_int_counter!(
                "crunch_studio_failures_total",
                "Total number of studios omitted because scoring failed"
            )
            .expect("Failed to register studio_failures"),

            cache_hits: register_int_counter!(
                "crunch_cache_hits_total",
                "Studios served from the local score cache"
            )
            .expect("Failed to register cache_hits"),

            malformed_records: register_int_counter!(
                "crunch_malformed_records_total",
                "Persisted lines skipped because they could not be parsed"
            )
            .expect("Failed to register malformed_records"),

            scoring_latency_seconds: register_histogram!(
                "crunch_scoring_latency_seconds",
                "Time spent scoring a single studio",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scoring_latency_seconds"),

            training_iterations: register_int_gauge!(
                "crunch_training_iterations",
                "IRLS iterations used by the last trained model"
            )
            .expect("Failed to register training_iterations"),
        }
    }
}

/// Handle to the process-wide scorer metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct ScorerMetrics {
    _private: (),
}

impl Default for ScorerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScorerMetrics {
    /// Create a handle, registering the metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScorerMetricsInner {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new)
    }

    pub fn inc_studios_scored(&self) {
        self.inner().studios_scored.inc();
    }

    pub fn inc_studio_failures(&self) {
        self.inner().studio_failures.inc();
    }

    pub fn inc_cache_hits(&self) {
        self.inner().cache_hits.inc();
    }

    pub fn add_malformed_records(&self, count: usize) {
        self.inner().malformed_records.inc_by(count as u64);
    }

    pub fn observe_scoring_latency(&self, duration_secs: f64) {
        self.inner().scoring_latency_seconds.observe(duration_secs);
    }

    pub fn set_training_iterations(&self, iterations: usize) {
        self.inner().training_iterations.set(iterations as i64);
    }

    pub fn studios_scored(&self) -> u64 {
        self.inner().studios_scored.get()
    }

    pub fn studio_failures(&self) -> u64 {
        self.inner().studio_failures.get()
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for scoring and training events
#[derive(Clone)]
pub struct StructuredLogger {
    run_name: String,
}

impl StructuredLogger {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
        }
    }

    pub fn log_studio_scored(&self, studio: &str, crunch: f64, genre: f64, review: f64, cached: bool) {
        info!(
            event = "studio_scored",
            run = %self.run_name,
            studio = %studio,
            crunch,
            genre,
            review,
            cached,
            "Scored studio"
        );
    }

    pub fn log_studio_failed(&self, studio: &str, error: &str) {
        warn!(
            event = "studio_failed",
            run = %self.run_name,
            studio = %studio,
            error = %error,
            "Studio omitted from report"
        );
    }

    pub fn log_model_trained(&self, model: &str, records: usize, iterations: usize, deviance: f64) {
        info!(
            event = "model_trained",
            run = %self.run_name,
            model = %model,
            records,
            iterations,
            deviance,
            "Trained logistic model"
        );
    }

    pub fn log_model_evaluated(&self, model: &str, accuracy: f64, false_positive_rate: f64) {
        info!(
            event = "model_evaluated",
            run = %self.run_name,
            model = %model,
            accuracy,
            false_positive_rate,
            "Evaluated model"
        );
    }

    pub fn log_multicollinearity(&self, column: usize, vif: f64) {
        warn!(
            event = "multicollinearity_detected",
            run = %self.run_name,
            column,
            vif,
            "Feature is highly collinear with the others"
        );
    }
}
