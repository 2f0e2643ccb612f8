/// Service lifecycle: start, stop, and wait around the polling loop.
///
/// Startup order:
/// 1. Load the station config (fatal on failure)
/// 2. Start the config watcher (non-fatal; the loop still refreshes after
///    every sleep without it)
/// 3. Spawn the polling loop on its own thread
///
/// Shutdown signals the loop, joins it, then stops the watcher, which waits
/// for any reload in progress.

use std::io;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ConfigStore, SharedConfig};
use crate::daemon::{Daemon, StopSignal};
use crate::ingest::DataSource;
use crate::settings::Settings;
use crate::watcher::ConfigWatcher;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("initial config load failed: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn polling thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("polling loop panicked")]
    LoopPanicked,
}

pub struct Service {
    stop: StopSignal,
    shared: SharedConfig,
    worker: Option<JoinHandle<()>>,
    watcher: Option<ConfigWatcher>,
}

impl Service {
    /// Loads the config and starts the watcher and polling loop.
    ///
    /// `stop` is the signal the caller (Ctrl+C handler, service manager)
    /// uses to end the loop; `Service::stop` sets it too.
    pub fn start<S>(settings: &Settings, source: S, stop: StopSignal) -> Result<Self, ServiceError>
    where
        S: DataSource + Send + 'static,
    {
        let store = ConfigStore::with_retry(&settings.service.config_path, settings.retry_policy());

        info!(path = %store.path().display(), "loading initial config");
        let snapshot = store.load()?;
        info!(
            stations = snapshot.config.water_stations.len(),
            selected = snapshot.config.general_config.selected_stations.len(),
            poll_interval = ?snapshot.poll_interval(),
            "config loaded"
        );
        let shared = SharedConfig::new(snapshot);

        let watcher_store = store.clone();
        let watcher_shared = shared.clone();
        let mut watcher = ConfigWatcher::new(store.path(), settings.debounce(), move || {
            watcher_store.reload_into(&watcher_shared)?;
            info!("config updated");
            Ok(())
        });
        let watcher = match watcher.start() {
            Ok(()) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "config watcher not started, relying on per-cycle refresh");
                None
            }
        };

        let daemon = Daemon::with_config(settings.daemon_config(), store, shared.clone(), source);
        let loop_stop = stop.clone();
        let worker = thread::Builder::new()
            .name("polling-loop".to_string())
            .spawn(move || daemon.run(&loop_stop))?;

        Ok(Self {
            stop,
            shared,
            worker: Some(worker),
            watcher,
        })
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.shared
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|w| w.is_running())
    }

    /// Blocks until the polling loop ends, then stops the watcher.
    ///
    /// # Errors
    /// `ServiceError::LoopPanicked` if the loop thread ended by panicking.
    pub fn wait(&mut self) -> Result<(), ServiceError> {
        let mut result = Ok(());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("polling loop panicked");
                result = Err(ServiceError::LoopPanicked);
            }
        }
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        result
    }

    /// Signals the loop to stop and waits for everything to shut down.
    /// Safe to call more than once.
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        self.stop.stop();
        self.wait()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
