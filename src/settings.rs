/// Service settings loader - parses pegelmon.toml
///
/// Holds everything about how the service runs (where the station config
/// lives, log level, timing knobs) as opposed to what it monitors, which is
/// in the JSON station config. The file is optional: every key has a default,
/// and a missing file means all defaults.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::RetryPolicy;
use crate::daemon::DaemonConfig;

pub const DEFAULT_SETTINGS_PATH: &str = "pegelmon.toml";
pub const DEFAULT_CONFIG_PATH: &str = "config/water_level_config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root settings structure for TOML parsing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSection,
    pub polling: PollingSection,
    pub watcher: WatcherSection,
    pub config_load: ConfigLoadSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub config_path: PathBuf,
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub sleep_slice_seconds: u64,
    pub fetch_timeout_seconds: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            sleep_slice_seconds: 5,
            fetch_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    pub debounce_seconds: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self { debounce_seconds: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLoadSection {
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ConfigLoadSection {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::from_toml(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config_load.retries.max(1),
            delay: Duration::from_millis(self.config_load.retry_delay_ms),
        }
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            sleep_slice: Duration::from_secs(self.polling.sleep_slice_seconds.max(1)),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.watcher.debounce_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.polling.fetch_timeout_seconds.max(1))
    }
}
