/// Core data types for the gauge monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// station rows as delivered by the data source, the readings derived from
/// them, threshold labels, and the errors raised at the data-source boundary.
/// No I/O lives here.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Threshold labels
// ---------------------------------------------------------------------------

/// Water level characteristic values published per gauge, in descending
/// order of severity. Only `HW100` drives warnings; the rest are carried for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdLabel {
    /// 100-year flood level.
    Hw100,
    Hw50,
    Hw20,
    Hw2,
    /// Mean water level.
    Mw,
}

impl ThresholdLabel {
    /// All labels, most severe first.
    pub const ALL: [ThresholdLabel; 5] = [
        ThresholdLabel::Hw100,
        ThresholdLabel::Hw50,
        ThresholdLabel::Hw20,
        ThresholdLabel::Hw2,
        ThresholdLabel::Mw,
    ];

    /// Key used in the `waterThresholds` object of the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdLabel::Hw100 => "HW100",
            ThresholdLabel::Hw50 => "HW50",
            ThresholdLabel::Hw20 => "HW20",
            ThresholdLabel::Hw2 => "HW2",
            ThresholdLabel::Mw => "MW",
        }
    }
}

impl fmt::Display for ThresholdLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold values for one station, keyed by label (`"HW100"`, ...).
/// A `None` value means the gauge publishes the label without a number.
pub type Thresholds = BTreeMap<String, Option<i64>>;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One row of the gauge list as delivered by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRow {
    pub name: String,
    pub river_name: String,
    pub river_area_name: String,
    /// Last measured level as displayed, e.g. `"143 cm"`.
    pub last_value: String,
    /// Timestamp of the last measurement as displayed.
    pub last_timestamp: String,
    pub catchment_area: String,
    /// Link to the station's detail page.
    pub detail_link: String,
}

/// The part of a `StationRow` the threshold check needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub station_name: String,
    pub raw_value_text: String,
    pub timestamp: String,
}

impl From<&StationRow> for Reading {
    fn from(row: &StationRow) -> Self {
        Reading {
            station_name: row.name.clone(),
            raw_value_text: row.last_value.clone(),
            timestamp: row.last_timestamp.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching the gauge list.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },
    /// Connection, TLS or protocol failure.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },
    /// Non-2xx HTTP response.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    /// The response body could not be deserialized.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A displayed level that could not be turned into centimetres.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse water level from {raw:?}")]
pub struct ReadingParseError {
    pub raw: String,
}
