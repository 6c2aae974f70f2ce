//! Service metadata, health probes, and the manual reload endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use router::ReloadOutcome;

use super::app::AppState;

/// GET /: service metadata.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "agui-router",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-agent chat router: AG-UI ingress, semantic routing, A2A/AG-UI egress",
    }))
}

/// GET /health/live: always ok while the process is up.
pub async fn health_live() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /health/ready: 503 until the catalog is loaded and the semantic
/// index is built.
pub async fn health_ready(State(app): State<Arc<AppState>>) -> Response {
    if app.router_state.load().is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "reason": "configuration not loaded" })),
        )
            .into_response();
    }
    Json(json!({ "status": "ok" })).into_response()
}

/// POST /admin/reload-config: trigger an immediate reload without waiting
/// for a filesystem event.
pub async fn reload_config(State(app): State<Arc<AppState>>) -> Response {
    match app.reloader.reload().await {
        Ok(ReloadOutcome::Reloaded {
            reload_count,
            agent_count,
        }) => Json(json!({
            "status": "ok",
            "message": "Configuration reloaded successfully",
            "agent_count": agent_count,
            "reload_count": reload_count,
        }))
        .into_response(),
        Ok(ReloadOutcome::InFlight) => Json(json!({
            "status": "ok",
            "message": "Reload already in progress, skipped",
            "reload_count": app.reloader.reload_count(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("manual config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Failed to reload configuration. Check logs for details.",
                })),
            )
                .into_response()
        }
    }
}
