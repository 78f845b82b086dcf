// Job Lifecycle Metrics Port

use std::fmt;

/// Outcome label of a processed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    Error,
}

impl ProcessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessOutcome::Success => "success",
            ProcessOutcome::Error => "error",
        }
    }
}

impl fmt::Display for ProcessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic job counters, labeled by queue/task name.
pub trait JobMetrics: Send + Sync {
    fn record_enqueue(&self, queue: &str);

    fn record_dequeue(&self, queue: &str);

    fn record_processed(&self, queue: &str, outcome: ProcessOutcome);
}
