//! Pure presentation helpers for the circular sensor gauges and status badges.

use shared::domain::{Metric, SwitchStatus};

const TRACK_COLOR: &str = "#e9ecef";
const TEMPERATURE_GAUGE_MIN: f64 = 10.0;
const TEMPERATURE_GAUGE_SPAN: f64 = 30.0;

/// Fill percentage of a gauge. Temperature maps 10–40 °C onto the dial and is
/// clamped; the percentage metrics are shown as-is.
pub fn gauge_percentage(metric: Metric, value: f64) -> f64 {
    match metric {
        Metric::Temperature => {
            ((value - TEMPERATURE_GAUGE_MIN) / TEMPERATURE_GAUGE_SPAN * 100.0).clamp(0.0, 100.0)
        }
        Metric::Humidity | Metric::SoilMoisture | Metric::LightLevel => value,
    }
}

fn palette(metric: Metric) -> [&'static str; 4] {
    match metric {
        Metric::Temperature => ["#ff4d6d", "#ff758f", "#ff9e9e", "#ffccd5"],
        Metric::Humidity => ["#0077b6", "#00b4d8", "#90e0ef", "#ade8f4"],
        Metric::SoilMoisture => ["#0a9396", "#2a9d8f", "#8ac926", "#e9d8a6"],
        Metric::LightLevel => ["#ffd166", "#ffda6e", "#ffe382", "#ffeeab"],
    }
}

/// Colour stops for a CSS `conic-gradient(...)`.
pub fn gauge_gradient(metric: Metric, percentage: f64) -> String {
    if percentage.is_nan() || percentage <= 0.0 {
        return format!("{TRACK_COLOR} 0deg, {TRACK_COLOR} 360deg");
    }

    let stop = percentage / 100.0 * 360.0;
    let [c0, c1, c2, c3] = palette(metric);
    format!(
        "{c0} 0deg, {c1} {}deg, {c2} {}deg, {c3} {}deg, {c3} {stop}deg, {TRACK_COLOR} {stop}deg, {TRACK_COLOR} 360deg",
        stop * 0.25,
        stop * 0.5,
        stop * 0.75,
    )
}

/// Whole numbers print bare, everything else with one decimal.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub fn status_badge(status: SwitchStatus) -> &'static str {
    if status.is_on() {
        "status-on"
    } else {
        "status-off"
    }
}
