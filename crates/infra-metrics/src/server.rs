// Metrics scrape endpoint (GET /metrics, GET /health)

use crate::counters::PrometheusMetrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use taskforge_core::application::ShutdownToken;
use taskforge_core::AppError;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// Scrape server configuration
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9540,
        }
    }
}

impl MetricsServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Router exposing the counters of `metrics`
pub fn router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/health", get(health))
        .with_state(metrics)
}

async fn scrape(State(metrics): State<Arc<PrometheusMetrics>>) -> impl IntoResponse {
    debug!("Serving Prometheus metrics");
    match metrics.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Running scrape server
pub struct MetricsServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MetricsServer {
    /// Bind and start serving in the background until `shutdown` fires.
    pub async fn start(
        config: &MetricsServerConfig,
        metrics: Arc<PrometheusMetrics>,
        mut shutdown: ShutdownToken,
    ) -> Result<Self, AppError> {
        let bind_address = config.bind_address();
        let listener = TcpListener::bind(&bind_address).await.map_err(|e| {
            AppError::Metrics(format!("Failed to bind to {}: {}", bind_address, e))
        })?;
        let local_addr = listener.local_addr()?;

        let app = router(metrics);
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.wait().await });
            if let Err(e) = server.await {
                error!(error = %e, "Metrics server error");
            }
            info!("Metrics server stopped");
        });

        info!(address = %local_addr, "Metrics server listening");
        Ok(Self { local_addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the server task to finish (after shutdown)
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Metrics server task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_core::application::shutdown_channel;
    use taskforge_core::port::{JobMetrics, ProcessOutcome};

    fn ephemeral() -> MetricsServerConfig {
        MetricsServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    #[test]
    fn test_default_config() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:9540");
    }

    #[tokio::test]
    async fn test_scrape_returns_counters() {
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        metrics.record_dequeue("billing");
        metrics.record_processed("billing", ProcessOutcome::Error);

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let server = MetricsServer::start(&ephemeral(), metrics.clone(), shutdown_rx)
            .await
            .unwrap();

        let url = format!("http://{}/metrics", server.local_addr());
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains("taskforge_task_dequeue{name=\"billing\"} 1"));
        assert!(body.contains("taskforge_task_processed{name=\"billing\",outcome=\"error\"} 1"));

        shutdown_tx.shutdown();
        server.join().await;
    }

    #[tokio::test]
    async fn test_health_and_shutdown() {
        let metrics = Arc::new(PrometheusMetrics::new().unwrap());
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let server = MetricsServer::start(&ephemeral(), metrics, shutdown_rx)
            .await
            .unwrap();
        let addr = server.local_addr();

        let body = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");

        shutdown_tx.shutdown();
        server.join().await;
        assert!(reqwest::get(format!("http://{}/health", addr)).await.is_err());
    }
}
