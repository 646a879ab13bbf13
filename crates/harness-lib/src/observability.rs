//! Observability for the harness itself
//!
//! Provides:
//! - Prometheus metrics (check run latency, run/failure counters, assertion failures)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for check run latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static GLOBAL_METRICS: OnceLock<HarnessMetricsInner> = OnceLock::new();

struct HarnessMetricsInner {
    check_run_latency_seconds: Histogram,
    check_runs: IntCounterVec,
    instance_failures: IntCounterVec,
    observations_recorded: IntGauge,
    assertion_failures: IntCounter,
    scenarios_evaluated: IntCounter,
}

impl HarnessMetricsInner {
    fn new() -> Self {
        Self {
            check_run_latency_seconds: register_histogram!(
                "check_harness_check_run_latency_seconds",
                "Time spent running every instance of a check once",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register check_run_latency_seconds"),

            check_runs: register_int_counter_vec!(
                "check_harness_check_runs_total",
                "Number of check invocations by check name",
                &["check"]
            )
            .expect("Failed to register check_runs_total"),

            instance_failures: register_int_counter_vec!(
                "check_harness_instance_failures_total",
                "Number of check instances that returned an error",
                &["check"]
            )
            .expect("Failed to register instance_failures_total"),

            observations_recorded: register_int_gauge!(
                "check_harness_observations_recorded",
                "Observations held by the most recently used store"
            )
            .expect("Failed to register observations_recorded"),

            assertion_failures: register_int_counter!(
                "check_harness_assertion_failures_total",
                "Total number of failed expectations"
            )
            .expect("Failed to register assertion_failures_total"),

            scenarios_evaluated: register_int_counter!(
                "check_harness_scenarios_evaluated_total",
                "Total number of evaluated scenarios"
            )
            .expect("Failed to register scenarios_evaluated_total"),
        }
    }
}

/// Handle to the process-wide harness metrics
///
/// Clones share the same underlying Prometheus metrics.
#[derive(Clone)]
pub struct HarnessMetrics {
    _private: (),
}

impl Default for HarnessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(HarnessMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &HarnessMetricsInner {
        GLOBAL_METRICS.get_or_init(HarnessMetricsInner::new)
    }

    pub fn observe_check_run(&self, check: &str, duration_secs: f64) {
        self.inner().check_run_latency_seconds.observe(duration_secs);
        self.inner().check_runs.with_label_values(&[check]).inc();
    }

    pub fn inc_instance_failures(&self, check: &str) {
        self.inner().instance_failures.with_label_values(&[check]).inc();
    }

    pub fn set_observations_recorded(&self, count: i64) {
        self.inner().observations_recorded.set(count);
    }

    pub fn record_scenario(&self, failures: u64) {
        self.inner().scenarios_evaluated.inc();
        self.inner().assertion_failures.inc_by(failures);
    }

    pub fn check_runs(&self, check: &str) -> u64 {
        self.inner().check_runs.with_label_values(&[check]).get()
    }

    /// Prometheus text exposition of the default registry
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for harness events
#[derive(Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "harness_started",
            source = %self.source,
            version = %version,
            "Check harness started"
        );
    }

    pub fn log_check_run(
        &self,
        check: &str,
        run: u32,
        instances: usize,
        observations_added: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "check_run",
            source = %self.source,
            check = %check,
            run = run,
            instances = instances,
            observations_added = observations_added,
            elapsed_ms = elapsed_ms as u64,
            "Check run complete"
        );
    }

    pub fn log_instance_failure(&self, check: &str, instance: usize, error: &str) {
        warn!(
            event = "instance_failed",
            source = %self.source,
            check = %check,
            instance = instance,
            error = %error,
            "Check instance failed"
        );
    }

    pub fn log_scenario_report(&self, scenario: &str, mode: &str, total: usize, failed: usize) {
        if failed == 0 {
            info!(
                event = "scenario_evaluated",
                source = %self.source,
                scenario = %scenario,
                mode = %mode,
                expectations = total,
                failed = failed,
                "Scenario passed"
            );
        } else {
            warn!(
                event = "scenario_evaluated",
                source = %self.source,
                scenario = %scenario,
                mode = %mode,
                expectations = total,
                failed = failed,
                "Scenario failed"
            );
        }
    }

    pub fn log_teardown_failure(&self, entity: &str, error: &str) {
        warn!(
            event = "teardown_failed",
            source = %self.source,
            entity = %entity,
            error = %error,
            "Failed to tear down provisioned entity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_metrics_observations() {
        let metrics = HarnessMetrics::new();
        let before = metrics.check_runs("metrics_test_check");

        metrics.observe_check_run("metrics_test_check", 0.002);
        metrics.inc_instance_failures("metrics_test_check");
        metrics.set_observations_recorded(12);
        metrics.record_scenario(2);

        assert_eq!(metrics.check_runs("metrics_test_check"), before + 1);
        let text = metrics.render().unwrap();
        assert!(text.contains("check_harness_check_runs_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-runner");
        assert_eq!(logger.source, "test-runner");
    }
}
