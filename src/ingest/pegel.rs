/// Gauge list client.
///
/// Fetches the state-wide gauge list ("Pegelliste") as JSON and turns each
/// entry into a `StationRow`. The list carries one object per gauge with the
/// same fields the public table shows:
///
///   name, riverName, riverAreaName, yLast, xLast, catchmentArea, href
///
/// `yLast` (the last level) arrives either as a display string (`"143 cm"`)
/// or as a bare number depending on the endpoint; both are accepted and kept
/// as text so the threshold check does the unit handling in one place.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{DataSource, apply_filter};
use crate::model::{FetchError, StationRow};

// ---------------------------------------------------------------------------
// Serde structures for the gauge list
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct GaugeEntry {
    name: String,
    #[serde(rename = "riverName", default)]
    river_name: Option<String>,
    #[serde(rename = "riverAreaName", default)]
    river_area_name: Option<String>,
    #[serde(rename = "yLast", default)]
    y_last: Option<TextOrNumber>,
    #[serde(rename = "xLast", default)]
    x_last: Option<String>,
    #[serde(rename = "catchmentArea", default)]
    catchment_area: Option<TextOrNumber>,
    #[serde(default)]
    href: Option<String>,
}

impl From<GaugeEntry> for StationRow {
    fn from(entry: GaugeEntry) -> Self {
        StationRow {
            name: entry.name,
            river_name: entry.river_name.unwrap_or_default(),
            river_area_name: entry.river_area_name.unwrap_or_default(),
            last_value: entry.y_last.map(TextOrNumber::into_text).unwrap_or_default(),
            last_timestamp: entry.x_last.unwrap_or_default(),
            catchment_area: entry
                .catchment_area
                .map(TextOrNumber::into_text)
                .unwrap_or_default(),
            detail_link: entry.href.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a gauge list body into rows, in the order the list returns them.
///
/// # Errors
/// - `FetchError::Parse` — malformed JSON or an entry without a name.
pub fn parse_gauge_list(json: &str) -> Result<Vec<StationRow>, FetchError> {
    let entries: Vec<GaugeEntry> = serde_json::from_str(json)
        .map_err(|e| FetchError::Parse(format!("JSON deserialization failed: {}", e)))?;

    Ok(entries.into_iter().map(StationRow::from).collect())
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP data source for the gauge list.
pub struct PegelClient {
    client: reqwest::blocking::Client,
}

impl PegelClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pegelmon_service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

impl DataSource for PegelClient {
    fn fetch(&self, url: &str, filter_names: &[String]) -> Result<Vec<StationRow>, FetchError> {
        debug!(url, "fetching gauge list");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| classify(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().map_err(|e| classify(url, e))?;
        let rows = parse_gauge_list(&body)?;
        debug!(url, rows = rows.len(), "gauge list received");

        Ok(apply_filter(rows, filter_names))
    }
}
