//! Authoritative in-memory record of telemetry, control state and the
//! confirmed threshold set.

use shared::{
    domain::{ControlState, Metric, Mode, SensorReading, SwitchStatus, ThresholdSet},
    protocol::CurrentState,
};

/// A partial update: every `None` (or absent reading field) means "no change".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateUpdate {
    pub reading: SensorReading,
    pub pump_status: Option<SwitchStatus>,
    pub light_status: Option<SwitchStatus>,
    pub mode: Option<Mode>,
    pub thresholds: Option<ThresholdSet>,
}

impl StateUpdate {
    pub fn from_initial_state(current: &CurrentState, thresholds: Option<ThresholdSet>) -> Self {
        Self {
            reading: current.reading,
            pump_status: current.pump_status,
            light_status: current.light_status,
            mode: current.mode,
            thresholds,
        }
    }

    pub fn from_reading(reading: SensorReading) -> Self {
        Self {
            reading,
            ..Self::default()
        }
    }

    pub fn metric(metric: Metric, value: f64) -> Self {
        Self::from_reading(SensorReading::default().with(metric, value))
    }

    pub fn pump(status: SwitchStatus) -> Self {
        Self {
            pump_status: Some(status),
            ..Self::default()
        }
    }

    pub fn light(status: SwitchStatus) -> Self {
        Self {
            light_status: Some(status),
            ..Self::default()
        }
    }

    pub fn mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn thresholds(thresholds: ThresholdSet) -> Self {
        Self {
            thresholds: Some(thresholds),
            ..Self::default()
        }
    }
}

/// Logical fields reported by [`StateStore::apply_partial`] when their value
/// changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreField {
    Sensor(Metric),
    PumpStatus,
    LightStatus,
    Mode,
    Thresholds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    reading: SensorReading,
    control: ControlState,
    thresholds: ThresholdSet,
    initialized: bool,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites every field present in `update` and leaves the rest alone.
    /// Returns the fields whose stored value actually changed, so applying the
    /// same update twice reports nothing the second time.
    pub fn apply_partial(&mut self, update: &StateUpdate) -> Vec<StoreField> {
        let mut changed = Vec::new();

        for metric in Metric::ALL {
            if let Some(value) = update.reading.get(metric) {
                if self.reading.get(metric) != Some(value) {
                    self.reading = self.reading.with(metric, value);
                    changed.push(StoreField::Sensor(metric));
                }
            }
        }

        if let Some(status) = update.pump_status {
            if self.control.pump_status != status {
                self.control.pump_status = status;
                changed.push(StoreField::PumpStatus);
            }
        }
        if let Some(status) = update.light_status {
            if self.control.light_status != status {
                self.control.light_status = status;
                changed.push(StoreField::LightStatus);
            }
        }
        if let Some(mode) = update.mode {
            if self.control.mode != mode {
                self.control.mode = mode;
                changed.push(StoreField::Mode);
            }
        }
        if let Some(thresholds) = update.thresholds {
            if self.thresholds != thresholds {
                self.thresholds = thresholds;
                changed.push(StoreField::Thresholds);
            }
        }

        changed
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Whether an `initial_state` event has been received on this session.
    pub fn has_initial_state(&self) -> bool {
        self.initialized
    }

    pub fn reading(&self) -> &SensorReading {
        &self.reading
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn mode(&self) -> Mode {
        self.control.mode
    }

    /// The server-confirmed thresholds.
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
