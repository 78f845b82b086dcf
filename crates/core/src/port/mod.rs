// Port Layer - Interfaces for external dependencies

pub mod connection;
pub mod fetcher;
pub mod metrics;

// Re-exports
pub use connection::{Dialer, StoreConnection, StoreError};
pub use fetcher::{Fetcher, FetcherFactory};
pub use metrics::{JobMetrics, ProcessOutcome};
