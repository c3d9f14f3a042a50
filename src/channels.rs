//! the channel table: which measurements a reading carries and how the
//! generator draws them.
//!
//! the built-in table can be replaced with `[[channels]]` entries in
//! uploader.toml, so a plant with a different instrument set needs no
//! code change.

use serde::{Deserialize, Serialize};

/// one named measurement and its sampling distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub mean: f64,
    pub std_dev: f64,
}

// (name, unit, mean, std_dev)
const DEFAULT_CHANNELS: &[(&str, &str, f64, f64)] = &[
    ("Clinker_Inlet_Temp", "°C", 1300.0, 50.0),
    ("Clinker_Outlet_Temp", "°C", 100.0, 20.0),
    ("Cooling_Air_Flow", "m³/h", 500.0, 50.0),
    ("Secondary_Air_Temp_Cooler", "°C", 900.0, 50.0),
    ("Grate_Speed", "strokes/min", 12.0, 3.0),
    ("Clinker_Production_Rate", "t/h", 130.0, 10.0),
    ("Cement_Mill_Feed_Rate", "t/h", 135.0, 15.0),
    ("Gypsum_Addition", "%", 3.8, 0.3),
    ("Cement_Mill_Power", "kW", 2250.0, 150.0),
    ("Cement_Fineness_Blaine", "m²/kg", 350.0, 30.0),
    ("Cement_Fineness_45um", "%", 11.0, 2.0),
    ("Separator_Efficiency", "%", 81.0, 2.0),
    ("Kiln_Shell_Temp", "°C", 300.0, 25.0),
];

/// the channel whose value is echoed in per-row upload log lines
pub const HEADLINE_CHANNEL: &str = "Clinker_Inlet_Temp";

pub fn default_channels() -> Vec<ChannelSpec> {
    DEFAULT_CHANNELS
        .iter()
        .map(|&(name, unit, mean, std_dev)| ChannelSpec {
            name: name.to_string(),
            unit: unit.to_string(),
            mean,
            std_dev,
        })
        .collect()
}

/// header names of `channels`, in table order
pub fn channel_names(channels: &[ChannelSpec]) -> Vec<&str> {
    channels.iter().map(|c| c.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_table_has_thirteen_unique_channels() {
        let channels = default_channels();
        assert_eq!(channels.len(), 13);

        let names: HashSet<_> = channel_names(&channels).into_iter().collect();
        assert_eq!(names.len(), 13);
        assert!(names.contains(HEADLINE_CHANNEL));
    }

    #[test]
    fn default_distributions_are_valid() {
        for c in default_channels() {
            assert!(c.std_dev > 0.0, "{} has no spread", c.name);
            assert!(c.mean.is_finite(), "{} mean", c.name);
        }
    }
}
