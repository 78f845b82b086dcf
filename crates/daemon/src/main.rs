//! Taskforge - worker process entry point

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use taskforge_core::application::shutdown_channel;
use taskforge_core::VERSION;
use taskforge_daemon::logging::init_logging;
use taskforge_daemon::settings::{load_options, Args};
use taskforge_daemon::{bootstrap, check_connectivity};
use taskforge_infra_metrics::MetricsServer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Initialize logging
    init_logging()?;
    info!("Taskforge v{} starting...", VERSION);

    // 2. Collect and resolve options
    let options = load_options(args.config.as_deref())?;
    let runtime = bootstrap(&options)?;
    let pool = runtime.config.pool().clone();

    if args.check {
        check_connectivity(&runtime.config).await?;
        pool.close().await;
        return Ok(());
    }

    // 3. Background tasks
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let reaper = pool.spawn_reaper(shutdown_tx.token());
    let metrics_server =
        MetricsServer::start(&args.metrics_config(), runtime.metrics.clone(), shutdown_rx)
            .await?;

    info!(
        process_id = runtime.config.process_id(),
        metrics = %metrics_server.local_addr(),
        "System ready. Press Ctrl+C to shutdown"
    );

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 5. Graceful shutdown
    shutdown_tx.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper).await;
    metrics_server.join().await;
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
