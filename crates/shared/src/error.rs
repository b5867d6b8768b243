use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ThresholdField;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdViolation {
    #[error("minimum temperature ({min}) must be lower than maximum temperature ({max})")]
    TemperatureRange { min: f64, max: f64 },
    #[error("{label} must be between 0 and 100 (got {value})", label = percent_label(.field))]
    OutOfPercentRange { field: ThresholdField, value: f64 },
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: ThresholdField, value: f64 },
    #[error("{field} is not a number: '{input}'")]
    NotANumber { field: ThresholdField, input: String },
}

impl ThresholdViolation {
    pub fn field(&self) -> ThresholdField {
        match self {
            Self::TemperatureRange { .. } => ThresholdField::TemperatureMin,
            Self::OutOfPercentRange { field, .. }
            | Self::NotFinite { field, .. }
            | Self::NotANumber { field, .. } => *field,
        }
    }
}

fn percent_label(field: &ThresholdField) -> &'static str {
    match field {
        ThresholdField::SoilMoistureMin => "soil moisture",
        ThresholdField::HumidityMin => "air humidity",
        ThresholdField::LightLevelMin => "light level",
        ThresholdField::TemperatureMin | ThresholdField::TemperatureMax => "temperature",
    }
}

/// Error body returned by the dashboard HTTP endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
