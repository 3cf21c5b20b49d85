//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Watches the configuration file and emits validated reloads.
///
/// Only configurations that parse and pass validation are sent; a broken
/// edit is logged and the running configuration stays in effect. The
/// parent directory is watched rather than the file itself, because most
/// editors save by writing a temp file and renaming over the original,
/// which would orphan a file-level watch.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the channel reloads arrive on.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive; dropping it
    /// stops the watch thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let config_path = self.path.canonicalize().unwrap_or_else(|_| self.path.clone());
        let watch_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let tx = self.update_tx;
        let target = config_path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !reload_worthy(&event, &target) {
                    return;
                }

                tracing::info!(path = ?target, "Config file changed, reloading");
                match load_config(&target) {
                    Ok(config) => {
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Reload rejected, keeping current configuration"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?config_path, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether an event is a content change of the watched file.
fn reload_worthy(event: &Event, target: &Path) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {}
        _ => return false,
    }
    event
        .paths
        .iter()
        .any(|p| p == target || p.file_name() == target.file_name())
}
