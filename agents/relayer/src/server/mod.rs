use std::net::SocketAddr;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use derive_new::new;
use eyre::{Context, Result};
use tokio::net::TcpListener;

use crate::metrics::RelayerMetrics;

pub mod relay;
pub mod status;

/// HTTP server of the relayer
#[derive(new, Debug)]
pub struct Server {
    listen_port: u16,
    metrics: RelayerMetrics,
}

impl Server {
    /// Agent routes plus prometheus metrics on `/metrics`
    pub fn router(&self, custom_routes: Router) -> Router {
        let metrics = self.metrics.clone();
        Router::new()
            .route("/metrics", get(move || gather_metrics(metrics)))
            .merge(custom_routes)
    }

    /// Serve `router` on all interfaces until the listener fails
    pub async fn run(self, router: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.listen_port));
        tracing::info!(port = self.listen_port, "starting server on 0.0.0.0");
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        axum::serve(listener, router)
            .await
            .context("HTTP server failed")
    }
}

/// Gather available metrics into an encoded (plaintext, OpenMetrics format)
/// report.
async fn gather_metrics(metrics: RelayerMetrics) -> impl IntoResponse {
    tracing::debug!("Traversing route for /metrics endpoint for serving Prometheus metrics");
    match metrics.gather().map(String::from_utf8) {
        Ok(Ok(report)) => (StatusCode::OK, report),
        Ok(Err(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".into(),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to gather metrics".into(),
        ),
    }
}
