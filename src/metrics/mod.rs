//! Prometheus metrics for the prediction service.
//!
//! # Example
//! ```no_run
//! use ticket_priority::metrics::PREDICTIONS_TOTAL;
//!
//! PREDICTIONS_TOTAL.with_label_values(&["high", "false"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "ticket_priority";

lazy_static! {
    /// Registry served by `GET /metrics`
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Predictions served
    ///
    /// Labels: priority, needs_review
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of priority predictions")
            .namespace(NAMESPACE),
        &["priority", "needs_review"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Time spent building features and scoring one ticket
    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Single-ticket prediction latency in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1]),
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Requests carrying a category value unseen in training
    ///
    /// Labels: column
    pub static ref UNKNOWN_CATEGORIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "unknown_categories_total",
            "Categorical values not seen during training"
        )
        .namespace(NAMESPACE),
        &["column"]
    ).expect("Failed to create UNKNOWN_CATEGORIES_TOTAL metric");

    /// Prediction failures
    ///
    /// Labels: code
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Failed prediction requests")
            .namespace(NAMESPACE),
        &["code"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// Loaded model identity, value is always 1
    ///
    /// Labels: model, run_id
    pub static ref MODEL_INFO: GaugeVec = GaugeVec::new(
        Opts::new("model_info", "Currently loaded model").namespace(NAMESPACE),
        &["model", "run_id"]
    ).expect("Failed to create MODEL_INFO metric");
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<(), prometheus::Error> {
    match PROMETHEUS_REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register every metric with the registry; calling it again is a no-op
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(Box::new(PREDICTIONS_TOTAL.clone()))?;
    register(Box::new(PREDICTION_DURATION_SECONDS.clone()))?;
    register(Box::new(UNKNOWN_CATEGORIES_TOTAL.clone()))?;
    register(Box::new(PREDICTION_ERRORS_TOTAL.clone()))?;
    register(Box::new(MODEL_INFO.clone()))?;

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

/// Encode the registry in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_prediction_counter() {
        init_metrics().unwrap();
        PREDICTIONS_TOTAL.with_label_values(&["low", "true"]).inc();
        let text = gather_metrics();
        assert!(text.contains("ticket_priority_predictions_total"));
    }
}
