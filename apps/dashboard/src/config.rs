use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::domain::Period;

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub period: Period,
    pub suppression_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            period: Period::Day,
            suppression_ms: 100,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }
}

/// Keys accepted in `dashboard.toml`. Anything else in the file is ignored.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    period: Option<String>,
    suppression_ms: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file, then environment variables. An explicit
/// `path` must exist; the default `dashboard.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_PATH) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_PATH}'"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.period {
        settings.period = parse_period(&v)?;
    }
    if let Some(v) = file_cfg.suppression_ms {
        settings.suppression_ms = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

/// `DASHBOARD_*` variables, then their `APP__*` spellings, which win when both
/// are set.
pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("APP__{name}")).or_else(|| lookup(&format!("DASHBOARD_{name}")))
    };

    if let Some(v) = var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("PERIOD") {
        settings.period = parse_period(&v).context("invalid PERIOD environment variable")?;
    }
    if let Some(v) = var("SUPPRESSION_MS") {
        settings.suppression_ms = v
            .parse()
            .with_context(|| format!("invalid SUPPRESSION_MS environment variable '{v}'"))?;
    }
    if let Some(v) = var("LOG") {
        settings.log_filter = v;
    }
    Ok(())
}

fn parse_period(raw: &str) -> Result<Period> {
    raw.parse::<Period>().map_err(anyhow::Error::msg)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
