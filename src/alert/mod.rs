/// Alerting: deciding whether a gauge reading warrants a warning.
///
/// ├── thresholds — level parsing and HW100 evaluation

pub mod thresholds;
