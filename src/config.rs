/// Station configuration store - loads and saves water_level_config.json
///
/// Separates station metadata and thresholds from code, so thresholds can be
/// edited, stations added, or the poll interval changed while the service is
/// running. The loaded configuration is published as an immutable
/// `ConfigSnapshot` through a `SharedConfig` handle that both reload paths
/// (cycle-end refresh and file watcher) write to.

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::Thresholds;

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 300;

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// Root of the persisted configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub water_stations: Vec<StationConfig>,
    pub general_config: GeneralConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    pub data_url: String,
    /// Station names to poll. Empty means all stations on the list.
    #[serde(default)]
    pub selected_stations: Vec<String>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

/// A single gauge and its characteristic water levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConfig {
    pub name: String,
    #[serde(default)]
    pub river_name: String,
    #[serde(default)]
    pub river_area_name: String,
    #[serde(default)]
    pub catchment_area: String,
    #[serde(default)]
    pub water_thresholds: Thresholds,
}

/// Station name → thresholds, derived from `water_stations`.
pub type ThresholdIndex = HashMap<String, Thresholds>;

/// Builds the lookup map used by the polling loop.
///
/// If two stations share a name the later entry wins and a warning is logged.
pub fn build_threshold_index(stations: &[StationConfig]) -> ThresholdIndex {
    let mut index = ThresholdIndex::with_capacity(stations.len());
    for station in stations {
        if index
            .insert(station.name.clone(), station.water_thresholds.clone())
            .is_some()
        {
            warn!(station = %station.name, "duplicate station name in config, last entry wins");
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A configuration together with its derived threshold index. Never mutated
/// once built; a reload produces a fresh snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub config: Configuration,
    pub thresholds: ThresholdIndex,
}

impl ConfigSnapshot {
    pub fn new(config: Configuration) -> Self {
        let thresholds = build_threshold_index(&config.water_stations);
        Self { config, thresholds }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.general_config.poll_interval_seconds)
    }

    /// Thresholds for a station, empty if the station is not configured.
    pub fn thresholds_for(&self, station: &str) -> Thresholds {
        self.thresholds.get(station).cloned().unwrap_or_default()
    }
}

/// Shared handle to the active snapshot.
///
/// The lock is held only to clone the `Arc` or to swap in a new one, never
/// across network or file I/O.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<Mutex<Arc<ConfigSnapshot>>>,
}

impl SharedConfig {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arc::new(snapshot))),
        }
    }

    /// Returns the snapshot that is active right now.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Publishes a new snapshot. Last writer wins.
    pub fn replace(&self, snapshot: ConfigSnapshot) {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to parse {} after {attempts} attempts: {source}", path.display())]
    Parse {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// How often to re-read a file that is present but not parseable, which
/// happens when an editor is in the middle of writing it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Owns all file I/O on the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    retry: RetryPolicy,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_retry(path, RetryPolicy::default())
    }

    pub fn with_retry(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            retry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration and builds its threshold index.
    ///
    /// # Errors
    /// - `ConfigError::NotFound` — immediately, without retrying.
    /// - `ConfigError::Parse` — the file stayed syntactically broken (or
    ///   truncated) for every attempt.
    /// - `ConfigError::Invalid` — immediately, for well-formed JSON that does
    ///   not match the schema, or a `poll_interval_seconds` of 0.
    pub fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        loop {
            let contents = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ConfigError::NotFound {
                    path: self.path.clone(),
                },
                _ => ConfigError::Io {
                    path: self.path.clone(),
                    source: e,
                },
            })?;

            match serde_json::from_str::<Configuration>(&contents) {
                Ok(config) => {
                    self.validate(&config)?;
                    debug!(
                        path = %self.path.display(),
                        stations = config.water_stations.len(),
                        "config loaded"
                    );
                    return Ok(ConfigSnapshot::new(config));
                }
                Err(e) if e.classify() == Category::Data => {
                    return Err(ConfigError::Invalid {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "config not parseable, retrying in {:?}",
                        self.retry.delay
                    );
                    thread::sleep(self.retry.delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ConfigError::Parse {
                        path: self.path.clone(),
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }

    fn validate(&self, config: &Configuration) -> Result<(), ConfigError> {
        if config.general_config.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                path: self.path.clone(),
                reason: "poll_interval_seconds must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Writes the configuration to a temporary sibling and renames it over
    /// the target, so readers never see a half-written file.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config.serialize(&mut ser)?;

        let tmp_path = self.temp_path();
        let io_err = |source| ConfigError::Io {
            path: tmp_path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(&buf).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Loads from disk and publishes the result. On failure the active
    /// snapshot is left untouched.
    pub fn reload_into(&self, shared: &SharedConfig) -> Result<(), ConfigError> {
        let snapshot = self.load()?;
        shared.replace(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::tempdir;

    fn sample_config() -> Configuration {
        Configuration {
            water_stations: vec![
                StationConfig {
                    name: "Odenbach".to_string(),
                    river_name: "Glan".to_string(),
                    river_area_name: "Nahe".to_string(),
                    catchment_area: "1.074 km²".to_string(),
                    water_thresholds: Thresholds::from([
                        ("HW100".to_string(), Some(150)),
                        ("HW50".to_string(), Some(140)),
                        ("HW20".to_string(), Some(130)),
                        ("HW2".to_string(), Some(95)),
                        ("MW".to_string(), Some(40)),
                    ]),
                },
                StationConfig {
                    name: "Abentheuer".to_string(),
                    river_name: "Traunbach".to_string(),
                    river_area_name: "Nahe".to_string(),
                    catchment_area: "20 km²".to_string(),
                    water_thresholds: Thresholds::from([("HW100".to_string(), None)]),
                },
            ],
            general_config: GeneralConfig {
                poll_interval_seconds: 300,
                data_url: "https://example.com/pegelliste".to_string(),
                selected_stations: vec!["Odenbach".to_string(), "Abentheuer".to_string()],
            },
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("water_level_config.json"));
        let config = sample_config();

        store.save(&config).unwrap();
        let snapshot = store.load().unwrap();

        assert_eq!(snapshot.config, config);
        assert_eq!(snapshot.thresholds, build_threshold_index(&config.water_stations));
        assert!(!store.temp_path().exists(), "temp file should be renamed away");
    }

    #[test]
    fn test_load_reads_camel_case_station_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "water_stations": [
                    {
                        "name": "Odenbach",
                        "riverName": "Glan",
                        "riverAreaName": "Nahe",
                        "catchmentArea": "1.074 km²",
                        "waterThresholds": {"HW100": 150, "HW50": 140, "HW20": 130, "HW2": 95, "MW": 40}
                    },
                    { "name": "Boos" }
                ],
                "general_config": {
                    "poll_interval_seconds": 60,
                    "data_url": "https://example.com/data",
                    "selected_stations": ["Odenbach"]
                }
            }"#,
        )
        .unwrap();

        let snapshot = ConfigStore::new(&path).load().unwrap();
        assert_eq!(snapshot.poll_interval(), Duration::from_secs(60));
        assert_eq!(snapshot.thresholds["Odenbach"].get("HW100"), Some(&Some(150)));
        assert!(snapshot.thresholds["Boos"].is_empty());
        assert!(snapshot.thresholds_for("Nowhere").is_empty());
    }

    #[test]
    fn test_general_config_defaults() {
        let config: Configuration = serde_json::from_str(
            r#"{ "general_config": { "data_url": "https://example.com" } }"#,
        )
        .unwrap();
        assert_eq!(config.general_config.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
        assert!(config.general_config.selected_stations.is_empty());
        assert!(config.water_stations.is_empty());
    }

    #[test]
    fn test_missing_file_fails_immediately() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::with_retry(
            dir.path().join("absent.json"),
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_secs(5),
            },
        );

        let start = Instant::now();
        let result = store.load();
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
        assert!(start.elapsed() < Duration::from_secs(1), "no retry delay expected");
    }

    #[test]
    fn test_invalid_json_exhausts_retries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"general_config\": ").unwrap();

        let result = ConfigStore::with_retry(&path, fast_retry()).load();
        match result {
            Err(ConfigError::Parse { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_succeeds_once_file_becomes_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::with_retry(
            &path,
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(300),
            },
        );

        // Fix the file between the second and third attempt.
        let writer_path = path.clone();
        let valid = serde_json::to_string(&sample_config()).unwrap();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(450));
            fs::write(writer_path, valid).unwrap();
        });

        let snapshot = store.load().unwrap();
        writer.join().unwrap();
        assert_eq!(snapshot.config, sample_config());
    }

    #[test]
    fn test_zero_poll_interval_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "general_config": { "poll_interval_seconds": 0, "data_url": "x" } }"#,
        )
        .unwrap();

        let result = ConfigStore::with_retry(&path, fast_retry()).load();
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_schema_mismatch_fails_without_retry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "general_config": { "poll_interval_seconds": -5, "data_url": "x" } }"#,
        )
        .unwrap();
        let store = ConfigStore::with_retry(
            &path,
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_secs(5),
            },
        );

        let start = Instant::now();
        let result = store.load();
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        assert!(start.elapsed() < Duration::from_secs(1), "no retry delay expected");

        fs::write(&path, r#"{ "general_config": { "data_url": 42 } }"#).unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_duplicate_station_last_wins() {
        let mut stations = sample_config().water_stations;
        let mut dup = stations[0].clone();
        dup.water_thresholds = Thresholds::from([("HW100".to_string(), Some(999))]);
        stations.push(dup);

        let index = build_threshold_index(&stations);
        assert_eq!(index.len(), 2);
        assert_eq!(index["Odenbach"].get("HW100"), Some(&Some(999)));
    }

    #[test]
    fn test_shared_config_replace_is_visible() {
        let shared = SharedConfig::new(ConfigSnapshot::new(sample_config()));
        let before = shared.current();

        let mut updated = sample_config();
        updated.general_config.poll_interval_seconds = 30;
        shared.replace(ConfigSnapshot::new(updated));

        assert_eq!(before.poll_interval(), Duration::from_secs(300));
        assert_eq!(shared.current().poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_reload_failure_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::with_retry(&path, fast_retry());
        store.save(&sample_config()).unwrap();

        let shared = SharedConfig::new(store.load().unwrap());
        fs::write(&path, "garbage").unwrap();

        assert!(store.reload_into(&shared).is_err());
        assert_eq!(shared.current().config, sample_config());
    }
}
