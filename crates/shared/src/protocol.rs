//! Push-channel frames and HTTP payloads exchanged with the dashboard server.
//!
//! Every websocket frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::domain::{
    ActuatorCommand, HistoricalPoint, Mode, Period, SensorReading, SwitchStatus, ThresholdSet,
};

/// `current_state` member of the `initial_state` event: the control flags and
/// the latest reading flattened into one object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentState {
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump_status: Option<SwitchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_status: Option<SwitchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    InitialState {
        current_state: CurrentState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thresholds: Option<ThresholdSet>,
    },
    SensorDataUpdate(SensorReading),
    TemperatureUpdate {
        value: f64,
    },
    HumidityUpdate {
        value: f64,
    },
    SoilMoistureUpdate {
        value: f64,
    },
    LightLevelUpdate {
        value: f64,
    },
    PumpStatusUpdate {
        status: SwitchStatus,
    },
    LightStatusUpdate {
        status: SwitchStatus,
    },
    ModeUpdate {
        mode: Mode,
    },
    ThresholdsUpdate(ThresholdSet),
}

impl InboundEvent {
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::InitialState { .. } => InboundKind::InitialState,
            Self::SensorDataUpdate(_) => InboundKind::SensorDataUpdate,
            Self::TemperatureUpdate { .. } => InboundKind::TemperatureUpdate,
            Self::HumidityUpdate { .. } => InboundKind::HumidityUpdate,
            Self::SoilMoistureUpdate { .. } => InboundKind::SoilMoistureUpdate,
            Self::LightLevelUpdate { .. } => InboundKind::LightLevelUpdate,
            Self::PumpStatusUpdate { .. } => InboundKind::PumpStatusUpdate,
            Self::LightStatusUpdate { .. } => InboundKind::LightStatusUpdate,
            Self::ModeUpdate { .. } => InboundKind::ModeUpdate,
            Self::ThresholdsUpdate(_) => InboundKind::ThresholdsUpdate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    InitialState,
    SensorDataUpdate,
    TemperatureUpdate,
    HumidityUpdate,
    SoilMoistureUpdate,
    LightLevelUpdate,
    PumpStatusUpdate,
    LightStatusUpdate,
    ModeUpdate,
    ThresholdsUpdate,
}

impl InboundKind {
    pub const ALL: [InboundKind; 10] = [
        InboundKind::InitialState,
        InboundKind::SensorDataUpdate,
        InboundKind::TemperatureUpdate,
        InboundKind::HumidityUpdate,
        InboundKind::SoilMoistureUpdate,
        InboundKind::LightLevelUpdate,
        InboundKind::PumpStatusUpdate,
        InboundKind::LightStatusUpdate,
        InboundKind::ModeUpdate,
        InboundKind::ThresholdsUpdate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InitialState => "initial_state",
            Self::SensorDataUpdate => "sensor_data_update",
            Self::TemperatureUpdate => "temperature_update",
            Self::HumidityUpdate => "humidity_update",
            Self::SoilMoistureUpdate => "soil_moisture_update",
            Self::LightLevelUpdate => "light_level_update",
            Self::PumpStatusUpdate => "pump_status_update",
            Self::LightStatusUpdate => "light_status_update",
            Self::ModeUpdate => "mode_update",
            Self::ThresholdsUpdate => "thresholds_update",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Deserialize)]
struct FrameHeader {
    event: String,
}

/// Decodes one text frame. Frames whose event name is not recognized yield
/// `Ok(None)`; recognized names with a malformed payload are an error.
pub fn decode_inbound(text: &str) -> Result<Option<InboundEvent>, serde_json::Error> {
    let header: FrameHeader = serde_json::from_str(text)?;
    if InboundKind::from_name(&header.event).is_none() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundCommand {
    SetMode { mode: Mode },
    SendCommand { command: ActuatorCommand },
    SetThresholds(ThresholdSet),
}

impl OutboundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetMode { .. } => "set_mode",
            Self::SendCommand { .. } => "send_command",
            Self::SetThresholds(_) => "set_thresholds",
        }
    }
}

/// Body of `GET /api/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<HistoricalPoint>>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
