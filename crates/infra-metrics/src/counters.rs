//! Job lifecycle counters backed by a private Prometheus registry

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use taskforge_core::port::{JobMetrics, ProcessOutcome};
use taskforge_core::AppError;

/// Metric namespace shared by every counter
pub const NAMESPACE: &str = "taskforge";

/// Prometheus implementation of `JobMetrics`.
///
/// Counters live in their own registry, so several instances (one per test,
/// for instance) never collide.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    enqueued: IntCounterVec,
    dequeued: IntCounterVec,
    processed: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let enqueued = counter(
            &registry,
            "task_enqueue",
            "Number of tasks enqueued, by task name",
            &["name"],
        )?;
        let dequeued = counter(
            &registry,
            "task_dequeue",
            "Number of tasks dequeued, by task name",
            &["name"],
        )?;
        let processed = counter(
            &registry,
            "task_processed",
            "Number of tasks processed, by task name and outcome",
            &["name", "outcome"],
        )?;

        Ok(Self {
            registry,
            enqueued,
            dequeued,
            processed,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current values in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, AppError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| AppError::Metrics(e.to_string()))
    }
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec, AppError> {
    let vec = IntCounterVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)
        .map_err(|e| AppError::Metrics(e.to_string()))?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|e| AppError::Metrics(e.to_string()))?;
    Ok(vec)
}

impl JobMetrics for PrometheusMetrics {
    fn record_enqueue(&self, queue: &str) {
        self.enqueued.with_label_values(&[queue]).inc();
    }

    fn record_dequeue(&self, queue: &str) {
        self.dequeued.with_label_values(&[queue]).inc();
    }

    fn record_processed(&self, queue: &str, outcome: ProcessOutcome) {
        self.processed
            .with_label_values(&[queue, outcome.as_str()])
            .inc();
    }
}
