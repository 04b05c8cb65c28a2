use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Fan operating mode of a thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    /// Fan runs continuously.
    On,
    /// Fan runs only while heating or cooling.
    Auto,
}

impl FanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FanMode::On => "on",
            FanMode::Auto => "auto",
        }
    }

    /// The mode a toggle switches to.
    pub fn toggled(self) -> Self {
        match self {
            FanMode::On => FanMode::Auto,
            FanMode::Auto => FanMode::On,
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(FanMode::On),
            "auto" => Ok(FanMode::Auto),
            other => Err(format!("unknown fan mode: {other}")),
        }
    }
}

/// Which temperature setpoint a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureTarget {
    /// The single setpoint used in heat-only or cool-only mode.
    #[default]
    Target,
    /// Upper bound of the range in heat-cool mode (cooling setpoint).
    High,
    /// Lower bound of the range in heat-cool mode (heating setpoint).
    Low,
}

impl TemperatureTarget {
    /// The `shared` field holding this setpoint.
    pub fn field(self) -> &'static str {
        match self {
            TemperatureTarget::Target => "target_temperature",
            TemperatureTarget::High => "target_temperature_high",
            TemperatureTarget::Low => "target_temperature_low",
        }
    }
}

impl FromStr for TemperatureTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "target" | "target_temperature" => Ok(TemperatureTarget::Target),
            "high" | "cool" | "target_temperature_high" => Ok(TemperatureTarget::High),
            "low" | "heat" | "target_temperature_low" => Ok(TemperatureTarget::Low),
            other => Err(format!("unknown temperature target: {other}")),
        }
    }
}

/// Body of a fan mode write.
#[derive(Debug, Serialize)]
pub struct FanModeRequest {
    pub fan_mode: FanMode,
}

/// Body of a setpoint write.
///
/// Serializes as `{"target_change_pending": true, "<field>": "<value>"}`
/// with the value formatted to one decimal place.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureChangeRequest {
    pub target: TemperatureTarget,
    pub value: f64,
}

impl Serialize for TemperatureChangeRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("target_change_pending", &true)?;
        map.serialize_entry(self.target.field(), &format!("{:.1}", self.value))?;
        map.end()
    }
}
