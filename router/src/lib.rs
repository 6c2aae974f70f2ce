//! Multi-agent chat router core.
//!
//! Accepts AG-UI chat requests, decides which configured backend agent
//! should serve them (mention override → sticky session → semantic match →
//! LLM fallback → default), forwards the request over the agent's protocol
//! (AG-UI or A2A), and translates the streamed response back into AG-UI
//! events. The HTTP surface lives in the `serve` crate; this crate is
//! transport-shaped but framework-free.

pub mod a2a;
pub mod agui;
pub mod catalog;
pub mod embed;
pub mod error;
pub mod headers;
pub mod observability;
pub mod proxy;
pub mod reload;
pub mod retry;
pub mod routing;
pub mod session;
pub mod state;

pub use catalog::{load_catalog, Agent, Catalog, CatalogError, Protocol};
pub use error::UpstreamError;
pub use headers::ForwardHeaders;
pub use proxy::{AgentProxy, AgentProxyError};
pub use reload::{ConfigReloader, ConfigWatcher, ReloadError, ReloadOutcome};
pub use retry::RetryConfig;
pub use routing::{RouteDecision, RoutingEngine, RoutingMethod, SemanticIndex, SemanticMatcher};
pub use session::{SessionState, SessionStore};
pub use state::{new_shared_state, RouterState, SharedRouterState};
