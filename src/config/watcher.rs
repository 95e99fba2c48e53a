//! Configuration file watcher for hot reload.
//!
//! Editors usually emit several events for one save, so a reload is only
//! forwarded when the service table actually changed.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{DispatcherConfig, StaticServiceConfig};

/// Watches the configuration file and streams reloaded configurations.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<DispatcherConfig>,
    last_services: Mutex<Option<Vec<StaticServiceConfig>>>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DispatcherConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
            last_services: Mutex::new(None),
        };
        (watcher, update_rx)
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => self.reload(),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }

    /// Load the file and forward it if the service table differs from the last one sent.
    fn reload(&self) {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Config reload rejected, keeping current services");
                return;
            }
        };

        {
            let Ok(mut last) = self.last_services.lock() else {
                return;
            };
            if last.as_ref() == Some(&config.services) {
                tracing::debug!(path = ?self.path, "Config event without service changes");
                return;
            }
            *last = Some(config.services.clone());
        }

        tracing::info!(path = ?self.path, services = config.services.len(), "Config reloaded");
        let _ = self.update_tx.send(config);
    }
}
