//! Period-scoped history loading and the chart dataset it feeds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use shared::domain::{HistoricalPoint, Metric, Period};
use tracing::{debug, warn};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub id: u64,
    pub period: Period,
}

/// Tags history requests so a response that arrives after a newer period was
/// selected can be recognized and dropped.
#[derive(Debug, Default)]
pub struct HistoryLoader {
    next_id: u64,
    latest: Option<HistoryRequest>,
}

impl HistoryLoader {
    pub fn begin(&mut self, period: Period) -> HistoryRequest {
        self.next_id += 1;
        let request = HistoryRequest {
            id: self.next_id,
            period,
        };
        self.latest = Some(request);
        request
    }

    pub fn is_current(&self, request: &HistoryRequest) -> bool {
        self.latest.as_ref() == Some(request)
    }

    pub fn latest(&self) -> Option<HistoryRequest> {
        self.latest
    }
}

/// X-axis label for one point at the given granularity.
pub fn chart_label(period: Period, point: &HistoricalPoint) -> String {
    match period {
        Period::Day => point
            .timestamp
            .as_deref()
            .map(time_of_day_label)
            .unwrap_or_default(),
        Period::Week | Period::Month => point
            .date
            .as_deref()
            .map(short_date_label)
            .unwrap_or_default(),
        Period::Year => point.month.clone().unwrap_or_default(),
    }
}

pub fn chart_labels(period: Period, points: &[HistoricalPoint]) -> Vec<String> {
    points.iter().map(|point| chart_label(period, point)).collect()
}

fn time_of_day_label(raw: &str) -> String {
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.format("%H:%M").to_string();
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%H:%M").to_string();
    }
    debug!(raw, "history: unparseable timestamp label");
    raw.to_string()
}

fn short_date_label(raw: &str) -> String {
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, DATE_FORMAT) {
        Ok(date) => date.format("%b %-d").to_string(),
        Err(_) => {
            debug!(raw, "history: unparseable date label");
            raw.to_string()
        }
    }
}

/// One shared label axis and four parallel value series, in point order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartDataset {
    pub period: Period,
    pub labels: Vec<String>,
    pub temperature: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    pub soil_moisture: Vec<Option<f64>>,
    pub light_level: Vec<Option<f64>>,
}

impl ChartDataset {
    pub fn from_points(period: Period, points: &[HistoricalPoint]) -> Self {
        Self {
            period,
            labels: chart_labels(period, points),
            temperature: points.iter().map(|p| p.temperature).collect(),
            humidity: points.iter().map(|p| p.humidity).collect(),
            soil_moisture: points.iter().map(|p| p.soil_moisture).collect(),
            light_level: points.iter().map(|p| p.light_level).collect(),
        }
    }

    pub fn series(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::SoilMoisture => &self.soil_moisture,
            Metric::LightLevel => &self.light_level,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ChartFeed {
    dataset: Option<ChartDataset>,
}

impl ChartFeed {
    /// Swaps in a dataset built from `points`. An empty result keeps whatever
    /// is currently charted.
    pub fn replace(&mut self, period: Period, points: &[HistoricalPoint]) -> bool {
        if points.is_empty() {
            warn!(period = %period, "history: no historical data returned; keeping chart");
            return false;
        }
        self.dataset = Some(ChartDataset::from_points(period, points));
        true
    }

    pub fn dataset(&self) -> Option<&ChartDataset> {
        self.dataset.as_ref()
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
