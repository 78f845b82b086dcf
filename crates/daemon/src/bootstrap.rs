//! Runtime bootstrap
//!
//! Wires the resolved options into a connection pool, the process-wide
//! configuration and the metrics registry. Nothing is returned unless every
//! step succeeded, so a failed bootstrap leaves no half-built state behind.

use std::collections::HashMap;
use std::sync::Arc;
use taskforge_core::application::{default_fetcher_factory, resolve, ConnectionPool};
use taskforge_core::domain::{Command, ProcessConfiguration};
use taskforge_core::AppError;
use taskforge_infra_metrics::PrometheusMetrics;
use taskforge_infra_redis::RedisDialer;
use tracing::info;

/// Everything a worker process shares after startup
#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<ProcessConfiguration>,
    pub metrics: Arc<PrometheusMetrics>,
}

/// Build the process configuration from raw options.
///
/// No connection is dialed here; the pool dials on first use.
///
/// # Errors
/// `AppError::Config` for missing options or unusable TLS material,
/// `AppError::Metrics` if the counters cannot be registered.
pub fn bootstrap(options: &HashMap<String, String>) -> Result<Runtime, AppError> {
    let resolved = resolve(options)?;
    info!(
        process_id = %resolved.process_id,
        options = %serde_json::to_string(&resolved)?,
        "Resolved worker options"
    );

    let dialer = RedisDialer::new(resolved.dial.clone())?;
    let pool = Arc::new(ConnectionPool::new(
        Arc::new(dialer),
        resolved.pool.clone(),
    ));

    let config = Arc::new(ProcessConfiguration::new(
        &resolved,
        pool,
        default_fetcher_factory(),
    ));
    let metrics = Arc::new(PrometheusMetrics::new()?);

    info!(
        process_id = config.process_id(),
        namespace = config.namespace().as_str(),
        poll_interval_secs = config.poll_interval().as_secs(),
        "Worker runtime configured"
    );
    Ok(Runtime { config, metrics })
}

/// Borrow one connection and PING the store through it
pub async fn check_connectivity(config: &ProcessConfiguration) -> Result<(), AppError> {
    let mut conn = config.pool().acquire().await?;
    let reply = conn.execute(Command::ping()).await?;
    conn.release();
    info!(reply = ?reply.as_str(), "Store reachable");
    Ok(())
}
