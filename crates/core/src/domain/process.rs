// Process Configuration (built once at bootstrap, read-only afterwards)

use crate::application::pool::ConnectionPool;
use crate::domain::options::{Namespace, ResolvedOptions};
use crate::port::{Fetcher, FetcherFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared runtime state of one worker process.
///
/// There is no global instance: the composition root builds exactly one and
/// hands `Arc<ProcessConfiguration>` to every consumer.
pub struct ProcessConfiguration {
    process_id: String,
    namespace: Namespace,
    poll_interval: Duration,
    pool: Arc<ConnectionPool>,
    fetch: Arc<dyn FetcherFactory>,
}

impl ProcessConfiguration {
    pub fn new(
        resolved: &ResolvedOptions,
        pool: Arc<ConnectionPool>,
        fetch: Arc<dyn FetcherFactory>,
    ) -> Self {
        Self {
            process_id: resolved.process_id.clone(),
            namespace: resolved.namespace.clone(),
            poll_interval: resolved.poll_interval,
            pool,
            fetch,
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Create a fetcher for a queue
    pub fn fetch(&self, queue: &str) -> Box<dyn Fetcher> {
        self.fetch.fetcher(queue, &self.namespace)
    }
}

impl fmt::Debug for ProcessConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfiguration")
            .field("process_id", &self.process_id)
            .field("namespace", &self.namespace)
            .field("poll_interval", &self.poll_interval)
            .field("pool", &self.pool.stats())
            .finish()
    }
}
