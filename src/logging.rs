/// Logging setup.
///
/// Console output via `tracing-subscriber`. The default filter comes from
/// the settings file; `RUST_LOG` overrides it when set. Rotation and log
/// files are left to the service manager.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
