//! Binary entry point: settings → tracing → embedder → catalog/index →
//! watcher → axum, with guaranteed teardown on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use config::Settings;
use router::catalog::load_catalog;
use router::embed::FastEmbedder;
use router::observability::AUDIT_TARGET;
use router::proxy::DEFAULT_UPSTREAM_TIMEOUT;
use router::routing::{RoutingEngine, SemanticIndex, SemanticMatcher};
use router::session::SessionStore;
use router::state::{new_shared_state, RouterState};
use router::{AgentProxy, ConfigReloader, ConfigWatcher, RetryConfig};

use serve::{router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("agui-router failed to start: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let settings = Settings::from_env()?;
    init_tracing(&settings);

    tracing::info!("starting agui-router v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("configuration path: {}", settings.config_path);

    // One embedding model for the process lifetime.
    let embedder = Arc::new(FastEmbedder::load(&settings.embedding_model)?);
    let matcher = SemanticMatcher::new(embedder);

    // One pooled outbound HTTP client, shared by the proxy and the LLM
    // fallback.
    let http = reqwest::Client::new();

    // Initial catalog + index. Failure is non-fatal: the process comes up
    // not-ready and a later reload (or fixed file) can bring it ready.
    let state = new_shared_state();
    match load_catalog(&settings.config_path) {
        Ok(catalog) => match SemanticIndex::build(matcher.embedder(), &catalog).await {
            Ok(index) => state.store(Some(Arc::new(RouterState { catalog, index }))),
            Err(e) => tracing::error!("failed to build semantic index: {}", e),
        },
        Err(e) => tracing::error!("failed to load configuration: {}", e),
    }

    let sessions = if settings.session_enabled {
        let timeout_minutes = state
            .load_full()
            .map(|s| s.catalog.session.timeout_minutes)
            .unwrap_or(settings.session_timeout_min);
        tracing::info!("session store initialized (timeout={} minutes)", timeout_minutes);
        Some(Arc::new(SessionStore::new(timeout_minutes)))
    } else {
        tracing::info!("sticky sessions disabled");
        None
    };

    let retry = RetryConfig::new(
        settings.retry_attempts,
        settings.retry_backoff_ms,
        RetryConfig::default().max_delay_ms,
    );
    let proxy = AgentProxy::new(http.clone(), retry, DEFAULT_UPSTREAM_TIMEOUT);
    let engine = RoutingEngine::new(matcher.clone(), http);

    let reloader = Arc::new(ConfigReloader::new(
        state.clone(),
        matcher,
        &settings.config_path,
    ));

    let watcher = if settings.hot_reload_enabled {
        let on_change_reloader = reloader.clone();
        let debounce = Duration::from_secs_f64(settings.hot_reload_debounce_seconds);
        match ConfigWatcher::start(&settings.config_path, debounce, move || {
            let reloader = on_change_reloader.clone();
            async move {
                let _ = reloader.reload().await;
            }
        }) {
            Ok(watcher) => {
                tracing::info!("config hot-reload enabled");
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!("config hot-reload unavailable: {}", e);
                None
            }
        }
    } else {
        tracing::info!("config hot-reload disabled");
        None
    };

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        router_state: state,
        engine,
        proxy,
        sessions,
        reloader,
    });

    let listener =
        tokio::net::TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(watcher) = watcher {
        watcher.stop();
    }
    tracing::info!("shutting down agui-router");
    Ok(())
}

/// Base log filter from settings, with the audit target pinned to its own
/// level so audit records survive (or stay quiet) independently of the
/// application level. `RUST_LOG` overrides everything.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let audit_level = if settings.audit_enabled {
            settings.audit_log_level.clone()
        } else {
            "off".to_string()
        };
        EnvFilter::new(format!(
            "{},{}={}",
            settings.log_level, AUDIT_TARGET, audit_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
