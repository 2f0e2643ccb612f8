//! Station Config Generator
//!
//! Builds `water_level_config.json` from the current gauge list:
//! 1. Fetch the gauge list (optionally only the named stations)
//! 2. Create one station entry per gauge
//! 3. Carry over thresholds from an existing config file, if any
//! 4. Write the result atomically
//!
//! Threshold values are published on each gauge's detail page and are not
//! fetched here; new stations start with an empty `waterThresholds` object
//! to be filled in by hand.
//!
//! Usage:
//!   cargo run --bin create_config -- --url http://localhost:8080/pegelliste.json \
//!       --station Odenbach --station Abentheuer

use clap::Parser;
use pegelmon_service::config::{
    Configuration, ConfigError, ConfigStore, DEFAULT_POLL_INTERVAL_SECONDS, GeneralConfig,
    StationConfig,
};
use pegelmon_service::ingest::DataSource;
use pegelmon_service::ingest::pegel::{DEFAULT_TIMEOUT, PegelClient};
use pegelmon_service::logging;
use pegelmon_service::model::Thresholds;
use pegelmon_service::settings::DEFAULT_CONFIG_PATH;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Generate the station config from the gauge list")]
struct Args {
    /// Gauge list URL
    #[arg(long)]
    url: String,

    /// Station to include (repeatable); all stations if omitted
    #[arg(long = "station")]
    stations: Vec<String>,

    /// Output file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    output: PathBuf,

    /// Poll interval written to general_config
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECONDS)]
    poll_interval: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init("info");
    let args = Args::parse();

    println!("🌊 Station Config Generator");
    println!("================================\n");

    let store = ConfigStore::new(&args.output);
    let existing: HashMap<String, Thresholds> = match store.load() {
        Ok(snapshot) => {
            println!("✓ Keeping thresholds from {}", args.output.display());
            snapshot.thresholds
        }
        Err(ConfigError::NotFound { .. }) => HashMap::new(),
        Err(e) => return Err(e.into()),
    };

    println!("📥 Fetching gauge list...");
    let rows = PegelClient::new(DEFAULT_TIMEOUT)?.fetch(&args.url, &args.stations)?;
    println!("✓ {} stations\n", rows.len());

    let water_stations: Vec<StationConfig> = rows
        .into_iter()
        .map(|row| {
            let water_thresholds = existing.get(&row.name).cloned().unwrap_or_default();
            if water_thresholds.is_empty() {
                println!("   {} - no thresholds yet", row.name);
            }
            StationConfig {
                name: row.name,
                river_name: row.river_name,
                river_area_name: row.river_area_name,
                catchment_area: row.catchment_area,
                water_thresholds,
            }
        })
        .collect();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    store.save(&Configuration {
        water_stations,
        general_config: GeneralConfig {
            poll_interval_seconds: args.poll_interval.max(1),
            data_url: args.url,
            selected_stations: args.stations,
        },
    })?;

    println!("\n✓ Config written to {}", args.output.display());
    Ok(())
}
