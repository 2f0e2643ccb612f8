/// Core daemon implementation for gauge monitoring
///
/// This module implements the polling loop that:
/// 1. Takes the current configuration snapshot
/// 2. Fetches the gauge list for the selected stations
/// 3. Checks every reading against the station's HW100 threshold
/// 4. Sleeps for the configured poll interval (interruptible)
/// 5. Refreshes the configuration from disk before the next cycle
///
/// The file watcher may swap in a new snapshot at any point; each cycle works
/// on whichever snapshot was active when it started.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::alert::thresholds::{highest_exceeded, is_warning, parse_level, threshold};
use crate::config::{ConfigStore, SharedConfig};
use crate::ingest::DataSource;
use crate::model::{Reading, StationRow, ThresholdLabel, Thresholds};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Longest single wait while sleeping between polls (default: 5 seconds).
    /// Bounds how long a stop request can go unnoticed.
    pub sleep_slice: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sleep_slice: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Stop signal
// ---------------------------------------------------------------------------

/// Cancellation token shared between the loop and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits up to `timeout`. Returns true if a stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let (stopped, _) = cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
        *stopped
    }
}

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

/// Outcome of checking one station in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StationStatus {
    pub station_name: String,
    pub river_name: String,
    /// Parsed level in cm; `None` if the displayed value was not a number.
    pub level_cm: Option<i64>,
    pub timestamp: String,
    pub warning: bool,
    /// Most severe characteristic value reached, for display.
    pub exceeded: Option<ThresholdLabel>,
}

/// Summary of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub polled_at: DateTime<Utc>,
    /// How long to sleep before the next cycle.
    pub poll_interval: Duration,
    pub stations: Vec<StationStatus>,
    /// Set if the gauge list could not be fetched this cycle.
    pub fetch_error: Option<String>,
}

impl CycleReport {
    pub fn warnings(&self) -> impl Iterator<Item = &StationStatus> {
        self.stations.iter().filter(|s| s.warning)
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// The polling loop.
pub struct Daemon<S> {
    config: DaemonConfig,
    store: ConfigStore,
    shared: SharedConfig,
    source: S,
}

impl<S: DataSource> Daemon<S> {
    pub fn new(store: ConfigStore, shared: SharedConfig, source: S) -> Self {
        Self::with_config(DaemonConfig::default(), store, shared, source)
    }

    pub fn with_config(
        config: DaemonConfig,
        store: ConfigStore,
        shared: SharedConfig,
        source: S,
    ) -> Self {
        Self {
            config,
            store,
            shared,
            source,
        }
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.shared
    }

    /// Runs one fetch-and-evaluate pass and returns the sleep interval the
    /// active configuration asks for.
    pub fn poll_once(&self) -> CycleReport {
        // Clone the handle and let the lock go before any network I/O.
        let snapshot = self.shared.current();
        let general = &snapshot.config.general_config;
        let polled_at = Utc::now();

        let (rows, fetch_error) =
            match self.source.fetch(&general.data_url, &general.selected_stations) {
                Ok(rows) => (rows, None),
                Err(e) => {
                    error!(url = %general.data_url, error = %e, "failed to fetch gauge list");
                    (Vec::new(), Some(e.to_string()))
                }
            };

        let stations = rows
            .iter()
            .map(|row| self.evaluate(row, &snapshot.thresholds_for(&row.name)))
            .collect();

        CycleReport {
            polled_at,
            poll_interval: snapshot.poll_interval(),
            stations,
            fetch_error,
        }
    }

    fn evaluate(&self, row: &StationRow, thresholds: &Thresholds) -> StationStatus {
        let reading = Reading::from(row);
        let level_cm = match parse_level(&reading.raw_value_text) {
            Ok(level) => Some(level),
            Err(e) => {
                warn!(station = %reading.station_name, error = %e, "unreadable water level");
                None
            }
        };

        let warning = is_warning(level_cm, thresholds);
        let exceeded = level_cm.and_then(|v| highest_exceeded(v, thresholds));

        if warning {
            warn!(
                station = %reading.station_name,
                river = %row.river_name,
                level_cm = ?level_cm,
                hw100 = ?threshold(thresholds, ThresholdLabel::Hw100),
                measured_at = %reading.timestamp,
                "WARNING: water level at or above HW100"
            );
        } else {
            info!(
                station = %reading.station_name,
                level_cm = ?level_cm,
                exceeded = ?exceeded.map(|l| l.as_str()),
                measured_at = %reading.timestamp,
                "water level not critical"
            );
        }

        StationStatus {
            station_name: reading.station_name,
            river_name: row.river_name.clone(),
            level_cm,
            timestamp: reading.timestamp,
            warning,
            exceeded,
        }
    }

    /// Sleeps for `interval` in slices of `sleep_slice`, returning early if
    /// a stop is requested. Returns true if stopped.
    ///
    /// An interval too large to represent as a deadline sleeps until stopped.
    pub fn sleep(&self, interval: Duration, stop: &StopSignal) -> bool {
        let deadline = Instant::now().checked_add(interval);
        loop {
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return stop.is_stopped();
                    }
                    remaining.min(self.config.sleep_slice)
                }
                None => self.config.sleep_slice,
            };
            if stop.wait_timeout(slice) {
                return true;
            }
        }
    }

    /// Re-reads the config file and publishes it. Keeps the previous
    /// snapshot if the file cannot be loaded.
    pub fn refresh_config(&self) {
        match self.store.reload_into(&self.shared) {
            Ok(()) => debug!(path = %self.store.path().display(), "config refreshed"),
            Err(e) => error!(
                path = %self.store.path().display(),
                error = %e,
                "config refresh failed, keeping previous config"
            ),
        }
    }

    /// Main loop. Returns once `stop` is signalled.
    pub fn run(&self, stop: &StopSignal) {
        info!(path = %self.store.path().display(), "starting polling loop");

        while !stop.is_stopped() {
            let report = self.poll_once();
            info!(
                stations = report.stations.len(),
                warnings = report.warnings().count(),
                "poll complete, next poll in {:?}",
                report.poll_interval
            );

            if self.sleep(report.poll_interval, stop) {
                break;
            }
            self.refresh_config();
        }

        info!("polling loop stopped");
    }
}
