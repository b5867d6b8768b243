//! Line-oriented operator console: command parsing and the event renderer.

use std::sync::{Arc, Mutex, PoisonError};

use client_core::{
    gauge::{format_value, gauge_gradient, gauge_percentage, status_badge},
    DashboardEvent, OperatorAction, SessionHandle,
};
use shared::domain::{ActuatorCommand, Period, ThresholdField, ThresholdSet};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

pub const HELP: &str = "\
commands:
  auto | manual              flip the mode toggle
  pump on|off, light on|off  actuator commands (manual mode)
  set <field> <value>        edit a threshold in the form
  submit                     send the threshold form
  period day|week|month|year switch the history chart
  refresh                    reload thresholds over HTTP
  reconnect                  reopen the push channel
  help, quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Operator click on the mode toggle.
    Toggle { checked: bool },
    Action(OperatorAction),
    Reconnect,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
}

pub fn parse_operator_command(line: &str) -> Result<Option<ConsoleCommand>, ParseCommandError> {
    let words: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    let command = match words.as_slice() {
        [] => return Ok(None),
        ["auto"] => ConsoleCommand::Toggle { checked: true },
        ["manual"] => ConsoleCommand::Toggle { checked: false },
        ["pump", state] => ConsoleCommand::Action(OperatorAction::SendCommand(match *state {
            "on" => ActuatorCommand::PumpOn,
            "off" => ActuatorCommand::PumpOff,
            _ => return Err(ParseCommandError::Usage("pump on|off")),
        })),
        ["light", state] => ConsoleCommand::Action(OperatorAction::SendCommand(match *state {
            "on" => ActuatorCommand::LightOn,
            "off" => ActuatorCommand::LightOff,
            _ => return Err(ParseCommandError::Usage("light on|off")),
        })),
        ["pump", ..] => return Err(ParseCommandError::Usage("pump on|off")),
        ["light", ..] => return Err(ParseCommandError::Usage("light on|off")),
        ["set", field, value] => {
            let field = field
                .parse::<ThresholdField>()
                .map_err(ParseCommandError::InvalidArgument)?;
            ConsoleCommand::Action(OperatorAction::EditThreshold {
                field,
                text: value.to_string(),
            })
        }
        ["set", ..] => return Err(ParseCommandError::Usage("set <field> <value>")),
        ["submit"] => ConsoleCommand::Action(OperatorAction::SubmitThresholds),
        ["period", period] => ConsoleCommand::Action(OperatorAction::SelectPeriod(
            period
                .parse::<Period>()
                .map_err(ParseCommandError::InvalidArgument)?,
        )),
        ["period", ..] => return Err(ParseCommandError::Usage("period day|week|month|year")),
        ["refresh"] => ConsoleCommand::Action(OperatorAction::RefreshThresholds),
        ["reconnect"] => ConsoleCommand::Reconnect,
        ["help"] | ["?"] => ConsoleCommand::Help,
        ["quit"] | ["exit"] => ConsoleCommand::Quit,
        [other, ..] => return Err(ParseCommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Console stand-in for the browser's mode checkbox. It fires a change
/// signal whenever its position changes, whether an operator clicked it or
/// the dashboard set it programmatically.
#[derive(Debug)]
pub struct ToggleWidget {
    checked: bool,
}

impl Default for ToggleWidget {
    fn default() -> Self {
        Self { checked: true }
    }
}

impl ToggleWidget {
    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) -> Option<OperatorAction> {
        if self.checked == checked {
            return None;
        }
        self.checked = checked;
        Some(OperatorAction::ToggleChanged { checked })
    }
}

pub type SharedToggle = Arc<Mutex<ToggleWidget>>;

pub fn set_toggle(widget: &SharedToggle, checked: bool) -> Option<OperatorAction> {
    widget
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set_checked(checked)
}

pub fn describe(event: &DashboardEvent) -> String {
    match event {
        DashboardEvent::SensorChanged { metric, value } => {
            let percentage = gauge_percentage(*metric, *value);
            format!(
                "{metric}: {}{} (gauge {}%: {})",
                format_value(*value),
                metric.unit(),
                format_value(percentage.round()),
                gauge_gradient(*metric, percentage),
            )
        }
        DashboardEvent::PumpStatusChanged(status) => {
            format!("pump: {status} [{}]", status_badge(*status))
        }
        DashboardEvent::LightStatusChanged(status) => {
            format!("light: {status} [{}]", status_badge(*status))
        }
        DashboardEvent::ModeSynced(view) => {
            let mut panels = Vec::new();
            if view.manual_controls_visible {
                panels.push("manual controls");
            }
            if view.threshold_panel_visible {
                panels.push("threshold settings");
            }
            format!("mode: {} ({} shown)", view.label, panels.join(", "))
        }
        DashboardEvent::ThresholdsConfirmed(t) => format!("thresholds confirmed: {}", summarize(t)),
        DashboardEvent::ThresholdsSubmitted(t) => format!("thresholds submitted: {}", summarize(t)),
        DashboardEvent::ThresholdRejected(violation) => format!("invalid thresholds: {violation}"),
        DashboardEvent::ChartUpdated(dataset) => {
            match (dataset.labels.first(), dataset.labels.last()) {
                (Some(first), Some(last)) => format!(
                    "chart ({}): {} points, {first} .. {last}",
                    dataset.period,
                    dataset.len()
                ),
                _ => format!("chart ({}): empty", dataset.period),
            }
        }
        DashboardEvent::Error(message) => format!("error: {message}"),
    }
}

fn summarize(t: &ThresholdSet) -> String {
    format!(
        "temperature {}..{} °C, soil moisture >= {}%, humidity >= {}%, light >= {}%",
        format_value(t.temperature_min),
        format_value(t.temperature_max),
        format_value(t.soil_moisture_min),
        format_value(t.humidity_min),
        format_value(t.light_level_min),
    )
}

/// Prints dashboard events and keeps the toggle widget in step with the
/// authoritative mode. The widget's resulting change signal goes back into
/// the session like any other toggle change.
pub async fn render_events(
    mut events: broadcast::Receiver<DashboardEvent>,
    widget: SharedToggle,
    session: SessionHandle,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", describe(&event));
                if let DashboardEvent::ModeSynced(view) = &event {
                    if let Some(feedback) = set_toggle(&widget, view.toggle_checked) {
                        session.send(feedback);
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "console: renderer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
