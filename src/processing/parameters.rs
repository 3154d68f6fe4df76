use crate::error::{Result, SpcError};
use crate::state::dataset::Dataset;

/// Fixed extruder channels, display name to log column.
pub const MAIN_PARAMETERS: &[(&str, &str)] = &[
    ("Screw Speed", "Extruder 1: Screw rotation speed"),
    ("Torque", "Extruder 1: Screw torque"),
    ("Pressure", "Extruder 1: Melt pressure 1"),
    ("Throughput", "Dosing station 1: Total throughput"),
];

/// A chartable process channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub display: String,
    pub column: String,
}

/// Channels available in `dataset`: the main parameters it actually contains,
/// followed by one "Heating Zone N" entry per column containing `zone_marker`.
pub fn catalog(dataset: &Dataset, zone_marker: &str) -> Vec<Parameter> {
    let main = MAIN_PARAMETERS
        .iter()
        .filter(|(_, column)| dataset.has_column(column))
        .map(|&(display, column)| Parameter {
            display: display.to_string(),
            column: column.to_string(),
        });

    let zones = dataset
        .column_names()
        .filter(|name| name.contains(zone_marker))
        .map(|name| Parameter {
            display: format!("Heating Zone {}", zone_number(name)),
            column: name.to_string(),
        });

    main.chain(zones).collect()
}

/// Text after the last "zone" in a column name, e.g. "Extruder 1: temperature zone 3" -> "3".
fn zone_number(column: &str) -> &str {
    column
        .rfind("zone")
        .map(|idx| column[idx + "zone".len()..].trim())
        .unwrap_or(column)
}

/// Resolve a user-supplied name against the catalog, accepting either the
/// display name (case-insensitive) or a raw numeric column name.
pub fn resolve(dataset: &Dataset, zone_marker: &str, name: &str) -> Result<Parameter> {
    if let Some(param) = catalog(dataset, zone_marker)
        .into_iter()
        .find(|p| p.display.eq_ignore_ascii_case(name.trim()))
    {
        return Ok(param);
    }
    if dataset.numeric(name).is_some() {
        return Ok(Parameter {
            display: name.to_string(),
            column: name.to_string(),
        });
    }
    Err(SpcError::MissingColumn(name.to_string()))
}

/// Best-guess engineering unit from a column name, used for chart axes.
pub fn infer_unit(column_name: &str) -> &'static str {
    let lower = column_name.to_lowercase();

    if lower.contains("temp") || lower.contains("zone") {
        "\u{00B0}C"
    } else if lower.contains("speed") || lower.contains("rpm") {
        "RPM"
    } else if lower.contains("pressure") {
        "bar"
    } else if lower.contains("torque") {
        "%"
    } else if lower.contains("throughput") {
        "kg/h"
    } else {
        "units"
    }
}
