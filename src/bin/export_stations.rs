//! Gauge List Export
//!
//! Writes the current gauge list (levels and timestamps included) to a JSON
//! file for inspection or import elsewhere.
//!
//! Usage:
//!   cargo run --bin export_stations -- --url http://localhost:8080/pegelliste.json \
//!       --output config/water_stations.json

use clap::Parser;
use pegelmon_service::ingest::DataSource;
use pegelmon_service::ingest::pegel::{DEFAULT_TIMEOUT, PegelClient};
use pegelmon_service::logging;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Export the current gauge list as JSON")]
struct Args {
    /// Gauge list URL
    #[arg(long)]
    url: String,

    /// Station to include (repeatable); all stations if omitted
    #[arg(long = "station")]
    stations: Vec<String>,

    /// Output file
    #[arg(long, default_value = "config/water_stations.json")]
    output: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedStation {
    name: String,
    river_name: String,
    river_area_name: String,
    y_last: String,
    x_last: String,
    catchment_area: String,
    href: String,
}

#[derive(Serialize)]
struct Export {
    water_stations: Vec<ExportedStation>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init("info");
    let args = Args::parse();

    println!("📥 Fetching gauge list...");
    let rows = PegelClient::new(DEFAULT_TIMEOUT)?.fetch(&args.url, &args.stations)?;

    let export = Export {
        water_stations: rows
            .into_iter()
            .map(|row| ExportedStation {
                name: row.name,
                river_name: row.river_name,
                river_area_name: row.river_area_name,
                y_last: row.last_value,
                x_last: row.last_timestamp,
                catchment_area: row.catchment_area,
                href: row.detail_link,
            })
            .collect(),
    };

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, serde_json::to_string_pretty(&export)?)?;

    println!(
        "✓ {} stations written to {}",
        export.water_stations.len(),
        args.output.display()
    );
    Ok(())
}
