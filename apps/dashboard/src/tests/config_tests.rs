use super::{apply_env, apply_file, load_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use shared::domain::Period;

fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_point_at_local_server() {
    let settings = Settings::default();
    assert_eq!(settings.server_url, "http://localhost:5000");
    assert_eq!(settings.period, Period::Day);
    assert_eq!(settings.suppression_window(), Duration::from_millis(100));
}

#[test]
fn file_overrides_defaults_and_ignores_unknown_keys() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
server_url = "http://greenhouse.local:8080"
period = "week"
theme = "dark"
"#,
    )
    .expect("valid file");

    assert_eq!(settings.server_url, "http://greenhouse.local:8080");
    assert_eq!(settings.period, Period::Week);
    assert_eq!(settings.suppression_ms, 100);
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "suppression_ms = 250\nperiod = \"month\"").expect("valid file");
    let vars = env_of(&[
        ("DASHBOARD_SERVER_URL", "http://from-dashboard:1"),
        ("APP__SERVER_URL", "http://from-app:2"),
        ("DASHBOARD_SUPPRESSION_MS", "40"),
    ]);

    apply_env(&mut settings, |key| vars.get(key).cloned()).expect("valid env");

    assert_eq!(settings.server_url, "http://from-app:2");
    assert_eq!(settings.suppression_ms, 40);
    assert_eq!(settings.period, Period::Month);
}

#[test]
fn invalid_values_are_reported() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "period = \"decade\"").is_err());
    assert!(apply_file(&mut settings, "suppression_ms = \"soon\"").is_err());

    let vars = env_of(&[("APP__SUPPRESSION_MS", "soon")]);
    let err = apply_env(&mut settings, |key| vars.get(key).cloned()).expect_err("bad number");
    assert!(err.to_string().contains("SUPPRESSION_MS"), "{err}");
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("greenhouse_dashboard_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");

    let missing = temp_root.join("missing.toml");
    assert!(load_settings(Some(&missing)).is_err());

    let present = temp_root.join("dashboard.toml");
    fs::write(&present, "period = \"year\"\n").expect("write config");
    let settings = load_settings(Some(&present)).expect("load");
    assert_eq!(settings.period, Period::Year);

    fs::remove_dir_all(temp_root).expect("cleanup");
}
