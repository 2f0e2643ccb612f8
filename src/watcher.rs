/// Config file watcher - hot reload on edit.
///
/// Watches the directory containing the configuration file (non-recursive)
/// and calls an update callback when the file itself changes. Editors and the
/// atomic save in `ConfigStore::save` produce several events per edit, so
/// events are debounced: after an accepted event, further events within the
/// debounce window are dropped.
///
/// Events from `notify` are forwarded over a channel to a dispatch thread
/// owned by the watcher. The callback runs on that thread, so `stop()` can
/// join it and return only once any in-flight reload has finished.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// How often the dispatch thread checks the stop flag while idle.
const STOP_POLL: Duration = Duration::from_millis(100);

pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type SharedCallback = Arc<Mutex<Box<dyn FnMut() -> CallbackResult + Send>>>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("config path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// Accepts at most one event per window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Returns true if an event at `now` should trigger a reload, and
    /// records it as the last accepted event.
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

struct Dispatch {
    file_name: OsString,
    debouncer: Debouncer,
    callback: SharedCallback,
}

impl Dispatch {
    fn is_config_change(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    /// Handles one event; returns true if the callback ran.
    fn on_event(&mut self, event: &Event, now: Instant) -> bool {
        if !self.is_config_change(event) {
            return false;
        }
        if !self.debouncer.accept(now) {
            debug!(kind = ?event.kind, "config change within debounce window, ignored");
            return false;
        }

        info!("config file changed, reloading");
        let mut guard = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        let callback: &mut (dyn FnMut() -> CallbackResult + Send) = &mut **guard;
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "config update failed"),
            Err(_) => error!("config update callback panicked"),
        }
        true
    }

    fn run(mut self, rx: Receiver<notify::Result<Event>>, stop: Arc<AtomicBool>) {
        while !stop.load(Ordering::SeqCst) {
            match rx.recv_timeout(STOP_POLL) {
                Ok(Ok(event)) => {
                    self.on_event(&event, Instant::now());
                }
                Ok(Err(e)) => warn!(error = %e, "file watch error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("config watcher dispatch thread exiting");
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

struct Running {
    // Dropped before the dispatcher is joined so no new events arrive.
    watcher: RecommendedWatcher,
    dispatcher: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

/// Watches one configuration file and calls back on change.
pub struct ConfigWatcher {
    config_path: PathBuf,
    debounce: Duration,
    callback: SharedCallback,
    running: Option<Running>,
}

impl ConfigWatcher {
    pub fn new<F>(config_path: impl Into<PathBuf>, debounce: Duration, callback: F) -> Self
    where
        F: FnMut() -> CallbackResult + Send + 'static,
    {
        Self {
            config_path: config_path.into(),
            debounce,
            callback: Arc::new(Mutex::new(Box::new(callback))),
            running: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts watching. Does nothing if already running.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.running.is_some() {
            return Ok(());
        }

        let file_name = self
            .config_path
            .file_name()
            .ok_or_else(|| WatchError::InvalidPath(self.config_path.clone()))?
            .to_owned();
        let dir = match self.config_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let notify_err = |source| WatchError::Notify {
            path: dir.clone(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(notify_err)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(notify_err)?;

        let stop = Arc::new(AtomicBool::new(false));
        let dispatch = Dispatch {
            file_name,
            debouncer: Debouncer::new(self.debounce),
            callback: Arc::clone(&self.callback),
        };
        let thread_stop = Arc::clone(&stop);
        let dispatcher = thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || dispatch.run(rx, thread_stop))?;

        info!(
            path = %self.config_path.display(),
            debounce = ?self.debounce,
            "watching config file"
        );
        self.running = Some(Running {
            watcher,
            dispatcher,
            stop,
        });
        Ok(())
    }

    /// Stops watching and waits for any in-flight callback to finish.
    /// Does nothing if not running. Must not be called from the callback.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.stop.store(true, Ordering::SeqCst);
        drop(running.watcher);
        if running.dispatcher.join().is_err() {
            error!("config watcher thread panicked");
        }
        info!(path = %self.config_path.display(), "config watcher stopped");
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
