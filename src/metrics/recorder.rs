//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, Encoder, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording session metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a call to the identity endpoint ("me", "refresh", "logout").
    fn record_identity_call(&self, operation: &str, result: &str);

    /// Records the duration of an identity endpoint call.
    fn record_identity_duration(&self, operation: &str, duration_secs: f64);

    /// Records a refresh-and-replay decision ("success", "failure", "skipped").
    fn record_refresh_attempt(&self, result: &str);

    /// Records a replay of an intercepted request.
    fn record_replay(&self);

    /// Records a session forced back to unauthenticated.
    fn record_session_expired(&self);

    /// Records the duration of one outbound request attempt.
    fn record_request_duration(&self, credentials: &str, duration_secs: f64);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // Identity endpoint metrics
    identity_calls_total: CounterVec,
    identity_duration_seconds: HistogramVec,

    // Recovery metrics
    refresh_attempts_total: CounterVec,
    replays_total: Counter,
    expirations_total: Counter,

    // Transport metrics
    request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let identity_calls_total = register_counter_vec_with_registry!(
            Opts::new(
                "session_identity_calls_total",
                "Total calls to the identity endpoint"
            ),
            &["operation", "result"],
            registry.clone()
        )
        .expect("Failed to register session_identity_calls_total");

        let identity_duration_seconds = register_histogram_vec_with_registry!(
            "session_identity_duration_seconds",
            "Identity endpoint call duration in seconds",
            &["operation"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register session_identity_duration_seconds");

        let refresh_attempts_total = register_counter_vec_with_registry!(
            Opts::new(
                "session_refresh_attempts_total",
                "Session refresh attempts by outcome"
            ),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register session_refresh_attempts_total");

        let replays_total = register_counter_with_registry!(
            Opts::new(
                "session_request_replays_total",
                "Requests replayed after a successful refresh"
            ),
            registry.clone()
        )
        .expect("Failed to register session_request_replays_total");

        let expirations_total = register_counter_with_registry!(
            Opts::new(
                "session_expirations_total",
                "Sessions cleared because refresh failed"
            ),
            registry.clone()
        )
        .expect("Failed to register session_expirations_total");

        let request_duration_seconds = register_histogram_vec_with_registry!(
            "session_request_duration_seconds",
            "Outbound request attempt duration in seconds",
            &["credentials"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register session_request_duration_seconds");

        Metrics {
            registry,
            identity_calls_total,
            identity_duration_seconds,
            refresh_attempts_total,
            replays_total,
            expirations_total,
            request_duration_seconds,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Metrics encoding produced invalid UTF-8")
    }

    pub fn refresh_attempts(&self, result: &str) -> u64 {
        self.refresh_attempts_total
            .with_label_values(&[result])
            .get() as u64
    }

    pub fn replays(&self) -> u64 {
        self.replays_total.get() as u64
    }

    pub fn expirations(&self) -> u64 {
        self.expirations_total.get() as u64
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder for Metrics {
    fn record_identity_call(&self, operation: &str, result: &str) {
        self.identity_calls_total
            .with_label_values(&[operation, result])
            .inc();
    }

    fn record_identity_duration(&self, operation: &str, duration_secs: f64) {
        self.identity_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    fn record_refresh_attempt(&self, result: &str) {
        self.refresh_attempts_total
            .with_label_values(&[result])
            .inc();
    }

    fn record_replay(&self) {
        self.replays_total.inc();
    }

    fn record_session_expired(&self) {
        self.expirations_total.inc();
    }

    fn record_request_duration(&self, credentials: &str, duration_secs: f64) {
        self.request_duration_seconds
            .with_label_values(&[credentials])
            .observe(duration_secs);
    }
}
