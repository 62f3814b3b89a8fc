//! Minimal HTTP surface for serving issued certificates: `GET /cert/:domain`,
//! `GET /key/:domain`, `GET /healthz`. Authentication is explicitly out of
//! scope here - operators wanting one wrap this router in their own `tower`
//! layer.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::error::{AcmeError, Result};
use crate::metrics::MetricsRegistry;
use crate::orchestrator::IssuanceOrchestrator;
use crate::storage::StorageBackend;

#[derive(Clone)]
struct AppState<B: StorageBackend> {
    orchestrator: Arc<IssuanceOrchestrator<B>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router<B: StorageBackend + 'static>(orchestrator: Arc<IssuanceOrchestrator<B>>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/cert/:domain", get(get_cert::<B>))
        .route("/key/:domain", get(get_key::<B>))
        .with_state(state)
}

pub async fn serve<B: StorageBackend + 'static>(
    addr: SocketAddr,
    orchestrator: Arc<IssuanceOrchestrator<B>>,
) -> Result<()> {
    let app = router(orchestrator);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AcmeError::transport(format!("failed to bind {}: {}", addr, e)))?;

    tracing::info!(%addr, "certificate server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AcmeError::transport(format!("server error: {}", e)))?;

    Ok(())
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn get_cert<B: StorageBackend + 'static>(
    State(state): State<AppState<B>>,
    Path(domain): Path<String>,
) -> impl IntoResponse {
    respond_with(&state, &domain, |issued| issued.cert_pem.clone()).await
}

async fn get_key<B: StorageBackend + 'static>(
    State(state): State<AppState<B>>,
    Path(domain): Path<String>,
) -> impl IntoResponse {
    respond_with(&state, &domain, |issued| issued.key_pem.clone()).await
}

/// A standalone router exposing `GET /metrics` in the Prometheus text
/// exposition format, meant to be bound on its own `[metrics].bind_address`
/// rather than merged into the certificate-serving router.
pub fn metrics_router(metrics: Arc<MetricsRegistry>) -> Router {
    Router::new().route("/metrics", get(get_metrics)).with_state(metrics)
}

pub async fn serve_metrics(addr: SocketAddr, metrics: Arc<MetricsRegistry>) -> Result<()> {
    let app = metrics_router(metrics);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AcmeError::transport(format!("failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "metrics server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| AcmeError::transport(format!("metrics server error: {}", e)))?;
    Ok(())
}

async fn get_metrics(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    metrics.gather_text()
}

async fn respond_with<B: StorageBackend + 'static>(
    state: &AppState<B>,
    domain: &str,
    extract: impl FnOnce(&crate::orchestrator::IssuedCertificate) -> String,
) -> axum::response::Response {
    match state.orchestrator.obtain_or_renew(domain).await {
        Ok(issued) => (StatusCode::OK, extract(&issued)).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody { error: e.to_string() }),
        )
            .into_response(),
    }
}
