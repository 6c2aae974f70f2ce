//! Live reconfiguration: file watching with debounce, and the reload
//! orchestrator that swaps the catalog/index pair atomically.

mod reloader;
mod watcher;

pub use reloader::{ConfigReloader, ReloadError, ReloadOutcome};
pub use watcher::{ConfigWatcher, WatchError};
