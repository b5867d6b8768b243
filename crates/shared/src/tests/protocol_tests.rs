use super::*;
use crate::domain::ThresholdField;

#[test]
fn decodes_initial_state_with_flattened_reading() {
    let frame = r#"{
        "event": "initial_state",
        "data": {
            "current_state": {
                "temperature": 24.5,
                "humidity": 61,
                "soil_moisture": 40,
                "light_level": 12,
                "pump_status": "OFF",
                "light_status": "ON",
                "mode": "MANUAL"
            },
            "thresholds": {
                "temperature_min": 18.0,
                "temperature_max": 30.0,
                "soil_moisture_min": 30,
                "humidity_min": 40.0,
                "light_level_min": 30
            }
        }
    }"#;

    let event = decode_inbound(frame).expect("decode").expect("recognized");
    match event {
        InboundEvent::InitialState {
            current_state,
            thresholds,
        } => {
            assert_eq!(current_state.reading.temperature, Some(24.5));
            assert_eq!(current_state.reading.humidity, Some(61.0));
            assert_eq!(current_state.light_status, Some(SwitchStatus::On));
            assert_eq!(current_state.mode, Some(Mode::Manual));
            assert_eq!(thresholds, Some(ThresholdSet::default()));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn sensor_data_update_ignores_extra_fields_and_keeps_absent_ones_empty() {
    let frame = r#"{"event":"sensor_data_update","data":{"humidity":55.5,"timestamp":"2024-05-01 10:00:00"}}"#;
    let event = decode_inbound(frame).expect("decode").expect("recognized");
    assert_eq!(
        event,
        InboundEvent::SensorDataUpdate(SensorReading {
            humidity: Some(55.5),
            ..SensorReading::default()
        })
    );
}

#[test]
fn unknown_event_names_are_not_an_error() {
    let decoded = decode_inbound(r#"{"event":"gesture_detected","data":{"gesture":"fist"}}"#)
        .expect("decode");
    assert!(decoded.is_none());
}

#[test]
fn malformed_payload_for_known_event_is_an_error() {
    assert!(decode_inbound(r#"{"event":"mode_update","data":{"mode":"TURBO"}}"#).is_err());
    assert!(decode_inbound("not json").is_err());
}

#[test]
fn outbound_commands_use_wire_names() {
    let set_mode = serde_json::to_value(OutboundCommand::SetMode { mode: Mode::Manual })
        .expect("encode");
    assert_eq!(
        set_mode,
        serde_json::json!({"event": "set_mode", "data": {"mode": "MANUAL"}})
    );

    let command = serde_json::to_value(OutboundCommand::SendCommand {
        command: ActuatorCommand::PumpOn,
    })
    .expect("encode");
    assert_eq!(
        command,
        serde_json::json!({"event": "send_command", "data": {"command": "PUMP_ON"}})
    );
}

#[test]
fn kind_names_match_event_tags() {
    for kind in InboundKind::ALL {
        assert_eq!(InboundKind::from_name(kind.name()), Some(kind));
    }
    let event = InboundEvent::ModeUpdate { mode: Mode::Auto };
    let encoded = serde_json::to_value(&event).expect("encode");
    assert_eq!(encoded["event"], event.kind().name());
}

#[test]
fn threshold_validation_reports_first_violation_in_order() {
    let mut set = ThresholdSet {
        temperature_min: 30.0,
        temperature_max: 18.0,
        soil_moisture_min: 150.0,
        humidity_min: 40.0,
        light_level_min: 30.0,
    };
    assert!(matches!(
        set.validate(),
        Err(crate::error::ThresholdViolation::TemperatureRange { .. })
    ));

    set.temperature_min = 18.0;
    set.temperature_max = 30.0;
    let err = set.validate().expect_err("soil moisture out of range");
    assert_eq!(err.field(), ThresholdField::SoilMoistureMin);
    assert_eq!(
        err.to_string(),
        "soil moisture must be between 0 and 100 (got 150)"
    );

    set.soil_moisture_min = f64::NAN;
    assert!(set.validate().is_err());

    set.soil_moisture_min = 100.0;
    assert!(set.validate().is_ok());

    set.temperature_max = f64::INFINITY;
    let err = set.validate().expect_err("infinite maximum");
    assert!(matches!(
        err,
        crate::error::ThresholdViolation::NotFinite { .. }
    ));
    assert_eq!(err.field(), ThresholdField::TemperatureMax);
}

#[test]
fn history_response_tolerates_missing_data() {
    let body: HistoryResponse =
        serde_json::from_str(r#"{"period":"year","interval":"month","type":"all"}"#)
            .expect("decode");
    assert_eq!(body.period, Some(Period::Year));
    assert!(body.data.is_none());
}
