/// pegelmon_service: river gauge water level monitoring service.
///
/// # Module structure
///
/// ```text
/// pegelmon_service
/// ├── model       — shared data types (StationRow, Reading, ThresholdLabel, FetchError, …)
/// ├── config      — station config store (water_level_config.json) + shared snapshot
/// ├── settings    — service settings loader (pegelmon.toml)
/// ├── watcher     — debounced config file watcher for hot reload
/// ├── daemon      — polling loop (fetch, evaluate, sleep, refresh)
/// ├── service     — lifecycle wrapper around the daemon and watcher
/// ├── logging     — tracing subscriber setup
/// ├── ingest
/// │   ├── pegel   — gauge list HTTP client + JSON parsing
/// │   └── fixtures (test only) — representative gauge list payloads
/// └── alert
///     └── thresholds — level parsing and HW100 evaluation
/// ```

/// Public modules
pub mod alert;
pub mod config;
pub mod daemon;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod service;
pub mod settings;
pub mod watcher;
