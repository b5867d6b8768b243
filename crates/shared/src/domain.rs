use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ThresholdViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchStatus {
    On,
    #[default]
    Off,
}

impl SwitchStatus {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "ON",
            Self::Off => "OFF",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

impl Mode {
    /// Mode selected by the toggle widget's checked state.
    pub fn from_toggle(checked: bool) -> Self {
        if checked {
            Self::Auto
        } else {
            Self::Manual
        }
    }

    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        })
    }
}

/// Telemetry snapshot. Every field is independently optional so the same type
/// carries both full readings and partial updates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_level: Option<f64>,
}

impl SensorReading {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.soil_moisture.is_none()
            && self.light_level.is_none()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::SoilMoisture => self.soil_moisture,
            Metric::LightLevel => self.light_level,
        }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        let slot = match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::SoilMoisture => &mut self.soil_moisture,
            Metric::LightLevel => &mut self.light_level,
        };
        *slot = Some(value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    SoilMoisture,
    LightLevel,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::SoilMoisture,
        Metric::LightLevel,
    ];

    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity | Self::SoilMoisture | Self::LightLevel => "%",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::SoilMoisture => "soil_moisture",
            Self::LightLevel => "light_level",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub pump_status: SwitchStatus,
    pub light_status: SwitchStatus,
    pub mode: Mode,
}

/// Trigger thresholds used by the controller in automatic mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub soil_moisture_min: f64,
    pub humidity_min: f64,
    pub light_level_min: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            temperature_min: 18.0,
            temperature_max: 30.0,
            soil_moisture_min: 30.0,
            humidity_min: 40.0,
            light_level_min: 30.0,
        }
    }
}

impl ThresholdSet {
    /// Checks the invariants in a fixed order and reports the first violation.
    /// NaN fails every check; infinite temperatures are rejected up front since
    /// they cannot be encoded as JSON numbers.
    pub fn validate(&self) -> Result<(), ThresholdViolation> {
        for field in [ThresholdField::TemperatureMin, ThresholdField::TemperatureMax] {
            let value = self.get(field);
            if value.is_infinite() {
                return Err(ThresholdViolation::NotFinite { field, value });
            }
        }
        if self.temperature_min.partial_cmp(&self.temperature_max) != Some(Ordering::Less) {
            return Err(ThresholdViolation::TemperatureRange {
                min: self.temperature_min,
                max: self.temperature_max,
            });
        }
        for field in [
            ThresholdField::SoilMoistureMin,
            ThresholdField::HumidityMin,
            ThresholdField::LightLevelMin,
        ] {
            let value = self.get(field);
            if !(0.0..=100.0).contains(&value) {
                return Err(ThresholdViolation::OutOfPercentRange { field, value });
            }
        }
        Ok(())
    }

    pub fn get(&self, field: ThresholdField) -> f64 {
        match field {
            ThresholdField::TemperatureMin => self.temperature_min,
            ThresholdField::TemperatureMax => self.temperature_max,
            ThresholdField::SoilMoistureMin => self.soil_moisture_min,
            ThresholdField::HumidityMin => self.humidity_min,
            ThresholdField::LightLevelMin => self.light_level_min,
        }
    }

    pub fn set(&mut self, field: ThresholdField, value: f64) {
        let slot = match field {
            ThresholdField::TemperatureMin => &mut self.temperature_min,
            ThresholdField::TemperatureMax => &mut self.temperature_max,
            ThresholdField::SoilMoistureMin => &mut self.soil_moisture_min,
            ThresholdField::HumidityMin => &mut self.humidity_min,
            ThresholdField::LightLevelMin => &mut self.light_level_min,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdField {
    TemperatureMin,
    TemperatureMax,
    SoilMoistureMin,
    HumidityMin,
    LightLevelMin,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 5] = [
        ThresholdField::TemperatureMin,
        ThresholdField::TemperatureMax,
        ThresholdField::SoilMoistureMin,
        ThresholdField::HumidityMin,
        ThresholdField::LightLevelMin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TemperatureMin => "temperature_min",
            Self::TemperatureMax => "temperature_max",
            Self::SoilMoistureMin => "soil_moisture_min",
            Self::HumidityMin => "humidity_min",
            Self::LightLevelMin => "light_level_min",
        }
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("unknown threshold field: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(format!(
                "invalid period '{other}', expected one of day, week, month, year"
            )),
        }
    }
}

/// One aggregated history sample. Which label field is populated depends on
/// the period: `timestamp` for day, `date` for week/month, `month` for year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoricalPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub light_level: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActuatorCommand {
    PumpOn,
    PumpOff,
    LightOn,
    LightOff,
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PumpOn => "PUMP_ON",
            Self::PumpOff => "PUMP_OFF",
            Self::LightOn => "LIGHT_ON",
            Self::LightOff => "LIGHT_OFF",
        })
    }
}
