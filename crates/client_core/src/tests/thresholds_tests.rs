use super::*;
use crate::test_support::RecordingSink;

fn valid_draft() -> ThresholdSet {
    ThresholdSet {
        temperature_min: 18.0,
        temperature_max: 30.0,
        soil_moisture_min: 30.0,
        humidity_min: 40.0,
        light_level_min: 30.0,
    }
}

#[test]
fn inverted_temperature_range_is_rejected_before_emission() {
    let sink = RecordingSink::default();
    let mut editor = ThresholdEditor::new(valid_draft());
    editor.set_field(ThresholdField::TemperatureMin, 30.0);
    editor.set_field(ThresholdField::TemperatureMax, 18.0);

    let err = editor.submit(&sink).expect_err("must reject");

    assert!(matches!(err, ThresholdViolation::TemperatureRange { .. }));
    assert!(sink.commands().is_empty());
}

#[test]
fn soil_moisture_above_hundred_is_rejected() {
    let sink = RecordingSink::default();
    let mut editor = ThresholdEditor::new(valid_draft());
    editor.set_field(ThresholdField::SoilMoistureMin, 150.0);

    let err = editor.submit(&sink).expect_err("must reject");

    assert_eq!(err.field(), ThresholdField::SoilMoistureMin);
    assert!(sink.commands().is_empty());
}

#[test]
fn checks_run_in_fixed_order() {
    let sink = RecordingSink::default();
    let mut editor = ThresholdEditor::new(valid_draft());
    editor.set_field(ThresholdField::HumidityMin, -1.0);
    editor.set_field(ThresholdField::LightLevelMin, 101.0);

    let err = editor.submit(&sink).expect_err("must reject");
    assert_eq!(err.field(), ThresholdField::HumidityMin);

    editor.set_field(ThresholdField::HumidityMin, 40.0);
    let err = editor.submit(&sink).expect_err("must reject");
    assert_eq!(err.field(), ThresholdField::LightLevelMin);
    assert!(err.to_string().starts_with("light level must be between 0 and 100"));
}

#[test]
fn valid_draft_emits_exact_payload() {
    let sink = RecordingSink::default();
    let editor = ThresholdEditor::new(valid_draft());

    let submitted = editor.submit(&sink).expect("valid");

    assert_eq!(submitted, valid_draft());
    assert_eq!(
        sink.commands(),
        vec![OutboundCommand::SetThresholds(valid_draft())]
    );
    let wire = serde_json::to_value(&sink.commands()[0]).expect("encode");
    assert_eq!(
        wire,
        serde_json::json!({
            "event": "set_thresholds",
            "data": {
                "temperature_min": 18.0,
                "temperature_max": 30.0,
                "soil_moisture_min": 30.0,
                "humidity_min": 40.0,
                "light_level_min": 30.0
            }
        })
    );
}

#[test]
fn unparseable_text_keeps_previous_draft_value() {
    let mut editor = ThresholdEditor::new(valid_draft());

    let err = editor
        .set_field_text(ThresholdField::HumidityMin, "forty")
        .expect_err("not a number");

    assert!(matches!(err, ThresholdViolation::NotANumber { .. }));
    assert_eq!(editor.draft().humidity_min, 40.0);

    let value = editor
        .set_field_text(ThresholdField::HumidityMin, " 42.5 ")
        .expect("parse");
    assert_eq!(value, 42.5);
    assert_eq!(editor.draft().humidity_min, 42.5);
}

#[test]
fn adopting_confirmed_values_replaces_the_draft() {
    let mut editor = ThresholdEditor::new(valid_draft());
    editor.set_field(ThresholdField::TemperatureMax, 35.0);

    let confirmed = ThresholdSet {
        light_level_min: 45.0,
        ..valid_draft()
    };
    editor.adopt_confirmed(&confirmed);

    assert_eq!(editor.draft(), &confirmed);
}

#[test]
fn infinite_text_input_is_rejected_and_nothing_emitted() {
    let sink = RecordingSink::default();
    let mut editor = ThresholdEditor::new(valid_draft());

    for text in ["inf", "-inf", "infinity", "NaN"] {
        let err = editor
            .set_field_text(ThresholdField::TemperatureMax, text)
            .expect_err("non-finite");
        assert!(matches!(err, ThresholdViolation::NotANumber { .. }), "{text}");
    }
    assert_eq!(editor.draft().temperature_max, 30.0);

    editor.submit(&sink).expect("draft unchanged and valid");
    assert_eq!(
        sink.commands(),
        vec![OutboundCommand::SetThresholds(valid_draft())]
    );
}

#[test]
fn infinite_draft_values_fail_validation() {
    let sink = RecordingSink::default();
    let mut editor = ThresholdEditor::new(valid_draft());
    editor.set_field(ThresholdField::TemperatureMax, f64::INFINITY);

    let err = editor.submit(&sink).expect_err("must reject");
    assert_eq!(
        err,
        ThresholdViolation::NotFinite {
            field: ThresholdField::TemperatureMax,
            value: f64::INFINITY,
        }
    );

    editor.set_field(ThresholdField::TemperatureMax, 30.0);
    editor.set_field(ThresholdField::TemperatureMin, f64::NEG_INFINITY);
    let err = editor.submit(&sink).expect_err("must reject");
    assert_eq!(err.field(), ThresholdField::TemperatureMin);
    assert!(sink.commands().is_empty());
}
