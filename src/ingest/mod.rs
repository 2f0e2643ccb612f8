/// Data sources for the gauge list.
///
/// ├── pegel    — HTTP client for the gauge list JSON + row parsing
/// └── fixtures (test only) — representative gauge list payloads

pub mod pegel;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::model::{FetchError, StationRow};

/// Anything that can deliver the current gauge list.
///
/// `filter_names` restricts the result to the named stations; an empty
/// filter means all stations. Names that match nothing are ignored.
pub trait DataSource {
    fn fetch(&self, url: &str, filter_names: &[String]) -> Result<Vec<StationRow>, FetchError>;
}

/// Keeps only the rows named in `filter_names`, or all rows if it is empty.
pub fn apply_filter(rows: Vec<StationRow>, filter_names: &[String]) -> Vec<StationRow> {
    if filter_names.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| filter_names.iter().any(|n| n == &row.name))
        .collect()
}
