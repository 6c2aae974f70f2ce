//! Axum app: composed collaborators and the route table.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use config::Settings;
use router::routing::RoutingEngine;
use router::session::SessionStore;
use router::state::SharedRouterState;
use router::{AgentProxy, ConfigReloader};

use super::{admin, chat};

/// Everything a request handler needs, composed once at startup. No
/// globals: the binary builds this and hands it to the router.
pub struct AppState {
    pub settings: Settings,
    /// Current catalog + semantic index; `None` until the first load.
    pub router_state: SharedRouterState,
    pub engine: RoutingEngine,
    pub proxy: AgentProxy,
    /// Present iff sticky sessions are enabled.
    pub sessions: Option<Arc<SessionStore>>,
    pub reloader: Arc<ConfigReloader>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(admin::root))
        .route("/health/live", get(admin::health_live))
        .route("/health/ready", get(admin::health_ready))
        .route("/admin/reload-config", post(admin::reload_config))
        .route("/api/agui/chat", post(chat::chat))
        .with_state(state)
}
