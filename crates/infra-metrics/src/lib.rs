// Taskforge Infrastructure - Metrics Adapter
// Implements: JobMetrics (Prometheus counters) + HTTP scrape endpoint

pub mod counters;
pub mod server;

pub use counters::PrometheusMetrics;
pub use server::{router, MetricsServer, MetricsServerConfig};
