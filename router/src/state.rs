//! Shared router state: the catalog and its semantic index, swapped as one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::catalog::Catalog;
use crate::routing::SemanticIndex;

/// The catalog and the semantic index built from it. The two are immutable
/// and always swapped together so readers never see a catalog paired with a
/// stale index.
pub struct RouterState {
    pub catalog: Catalog,
    pub index: SemanticIndex,
}

/// Lock-free handle to the current [`RouterState`]. `None` until the first
/// successful load; readiness probes report 503 in that window.
pub type SharedRouterState = Arc<ArcSwapOption<RouterState>>;

/// Creates an empty shared state (no catalog loaded yet).
pub fn new_shared_state() -> SharedRouterState {
    Arc::new(ArcSwapOption::from(None))
}
