//! Config file watcher with debounce.
//!
//! Watches the parent directory of the config path (recursively, to catch
//! the `..data` symlink swaps orchestrator ConfigMap mounts use) and runs
//! the reload callback once per burst of events.

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("config directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to start file watcher: {0}")]
    Notify(#[from] notify::Error),
}

/// A running config watcher. Dropping it releases the OS watch handle and
/// stops the debounce task.
pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl ConfigWatcher {
    /// Starts watching the parent directory of `config_path`. Relevant
    /// events are debounced: a burst within one `debounce` window triggers
    /// `on_change` once.
    pub fn start<F, Fut>(
        config_path: impl AsRef<Path>,
        debounce: Duration,
        on_change: F,
    ) -> Result<ConfigWatcher, WatchError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let config_path = config_path.as_ref().to_path_buf();
        let watch_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if !watch_dir.exists() {
            return Err(WatchError::MissingDirectory(watch_dir));
        }

        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<()>();
        let event_config_path = config_path.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                let Ok(event) = result else { return };
                if is_config_event(&event.kind, &event.paths, &event_config_path) {
                    tracing::debug!("config change event: {:?}", event.paths);
                    let _ = tick_tx.send(());
                }
            })?;
        watcher.watch(&watch_dir, RecursiveMode::Recursive)?;

        let task = tokio::spawn(async move {
            while tick_rx.recv().await.is_some() {
                tokio::time::sleep(debounce).await;
                // Coalesce the rest of the burst into this reload.
                while tick_rx.try_recv().is_ok() {}
                tracing::info!("config file change detected, triggering reload");
                on_change().await;
            }
        });

        tracing::info!(
            "config watcher started, monitoring: {} (debounce: {:?})",
            config_path.display(),
            debounce
        );
        Ok(ConfigWatcher {
            _watcher: watcher,
            task,
        })
    }

    /// Stops the watcher and its debounce task.
    pub fn stop(self) {
        tracing::info!("config watcher stopped");
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whether a filesystem event concerns the config file: a direct hit, a
/// path sharing its file name (symlink targets), or a `..data`-style hidden
/// timestamp path while the config file exists.
fn is_config_event(kind: &EventKind, paths: &[PathBuf], config_path: &Path) -> bool {
    if !matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
    ) {
        return false;
    }
    let config_name: &OsStr = config_path.file_name().unwrap_or_default();
    paths.iter().any(|path| {
        if path == config_path {
            return true;
        }
        if path.file_name() == Some(config_name) {
            return true;
        }
        let hidden_swap = path.to_string_lossy().contains("..data")
            || path
                .file_name()
                .and_then(OsStr::to_str)
                .map(|name| name.starts_with(".."))
                .unwrap_or(false);
        hidden_swap && config_path.exists()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// **Scenario**: direct path hits and same-file-name paths are
    /// relevant; unrelated files are not.
    #[test]
    fn relevance_by_path_and_name() {
        let config = PathBuf::from("/config/agents.yaml");
        let modify = EventKind::Modify(ModifyKind::Any);

        assert!(is_config_event(&modify, &[config.clone()], &config));
        assert!(is_config_event(
            &modify,
            &[PathBuf::from("/config/..4984_12_01/agents.yaml")],
            &config
        ));
        assert!(!is_config_event(
            &modify,
            &[PathBuf::from("/config/other.yaml")],
            &config
        ));
        assert!(!is_config_event(
            &EventKind::Remove(RemoveKind::Any),
            &[config.clone()],
            &config
        ));
    }

    /// **Scenario**: `..data` swap events count only while the config file
    /// exists on disk.
    #[test]
    fn data_swap_requires_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("agents.yaml");
        let swap = vec![dir.path().join("..data")];
        let create = EventKind::Create(CreateKind::Any);

        assert!(!is_config_event(&create, &swap, &config));
        std::fs::write(&config, "agents: []").unwrap();
        assert!(is_config_event(&create, &swap, &config));
    }

    /// **Scenario**: a burst of writes within the debounce window produces
    /// one callback invocation.
    #[tokio::test]
    async fn debounced_reload_fires_once_per_burst() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("agents.yaml");
        std::fs::write(&config, "one").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_callback = calls.clone();
        let watcher = ConfigWatcher::start(&config, Duration::from_millis(100), move || {
            let calls = calls_in_callback.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        // Rapid burst of writes.
        for i in 0..5 {
            std::fs::write(&config, format!("content {i}")).unwrap();
        }

        let mut waited = Duration::ZERO;
        while calls.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waited += Duration::from_millis(50);
        }
        // Let any stragglers land before asserting the count settled at one.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "burst coalesces into one reload");
        watcher.stop();
    }

    /// **Scenario**: a missing parent directory fails startup instead of
    /// silently watching nothing.
    #[test]
    fn missing_directory_errors() {
        let result = ConfigWatcher::start(
            "/definitely/not/a/real/dir/agents.yaml",
            Duration::from_millis(10),
            || async {},
        );
        assert!(matches!(result, Err(WatchError::MissingDirectory(_))));
    }
}
