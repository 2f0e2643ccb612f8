/// Test fixtures: representative gauge list payloads.
///
/// Structurally complete but truncated to a handful of gauges. Shape:
///
///   [
///     { "name", "riverName", "riverAreaName",
///       "yLast"          — last level, display string or bare number
///       "xLast"          — timestamp of the last level, local time
///       "catchmentArea"  — display string or bare number (km²)
///       "href"           — relative link to the detail page }
///   ]
///
/// Odenbach at 160 cm is above its HW100 of 150 in the test configs.

#[cfg(test)]
pub(crate) fn fixture_gauge_list_json() -> &'static str {
    r#"[
      {
        "name": "Odenbach",
        "riverName": "Glan",
        "riverAreaName": "Nahe",
        "yLast": "160 cm",
        "xLast": "18.10.2026 10:15",
        "catchmentArea": "1.074 km²",
        "href": "/flussgebiet/nahe/odenbach"
      },
      {
        "name": "Abentheuer",
        "riverName": "Traunbach",
        "riverAreaName": "Nahe",
        "yLast": "-- cm",
        "xLast": "18.10.2026 10:00",
        "catchmentArea": "20 km²",
        "href": "/flussgebiet/nahe/abentheuer"
      },
      {
        "name": "Boos",
        "riverName": "Nahe",
        "riverAreaName": "Nahe",
        "yLast": 212,
        "xLast": "18.10.2026 10:15",
        "catchmentArea": 2815,
        "href": "/flussgebiet/nahe/boos"
      }
    ]"#
}

/// A gauge that is listed but has not reported yet.
#[cfg(test)]
pub(crate) fn fixture_sparse_entry_json() -> &'static str {
    r#"[ { "name": "Kirn", "riverName": "Nahe", "yLast": null } ]"#
}

/// Truncated body, as seen when the connection drops mid-response.
#[cfg(test)]
pub(crate) fn fixture_malformed_json() -> &'static str {
    r#"[ { "name": "Odenbach", "riverName": "Gl"#
}
