// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP endpoints for kubelet health checks and Prometheus scraping.
//!
//! - `/healthz` (liveness) answers as long as the process serves requests.
//! - `/readyz` (readiness) answers 200 only once the `ExternalDNS` cache has synced.
//! - `/metrics` serves [`Metrics::gather`] on its own listener.

use crate::constants::METRICS_SERVER_PATH;
use crate::metrics::Metrics;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Shared state for the health endpoints.
#[derive(Debug, Default)]
pub struct HealthState {
    started: AtomicBool,
}

impl HealthState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the operator as started and ready.
    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
        info!("Health check: operator marked as started");
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Serve `/healthz` and `/readyz` on `addr` until a fatal I/O error.
///
/// # Errors
///
/// Returns the error if binding or serving fails.
pub async fn run_health_server(state: Arc<HealthState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Health check server listening");

    axum::serve(listener, app).await
}

/// Serve Prometheus metrics on `addr` until a fatal I/O error.
///
/// # Errors
///
/// Returns the error if binding or serving fails.
pub async fn run_metrics_server(metrics: Metrics, addr: SocketAddr) -> std::io::Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(serve_metrics))
        .with_state(metrics);

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, path = METRICS_SERVER_PATH, "Metrics server listening");

    axum::serve(listener, app).await
}

async fn healthz() -> StatusCode {
    debug!("Liveness check: OK");
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_started() {
        debug!("Readiness check: OK");
        StatusCode::OK
    } else {
        debug!("Readiness check: NOT READY (cache not synced)");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn serve_metrics(State(metrics): State<Metrics>) -> (StatusCode, String) {
    match metrics.gather() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_liveness_always_ok() {
        assert_eq!(healthz().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_waits_for_startup() {
        let state = Arc::new(HealthState::new());
        assert_eq!(
            readyz(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.mark_started();
        assert_eq!(readyz(State(state)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_body() {
        let metrics = Metrics::new().unwrap();
        metrics.record_reconciliation("Secret", "updated", Duration::from_millis(3));

        let (status, body) = serve_metrics(State(metrics)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("external_dns_operator_reconciliations_total"));
    }
}
