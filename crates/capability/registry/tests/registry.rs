use bridge_protocol::{Decoded, UpstreamEvent, decode};
use bridge_registry::{ApplyOutcome, DeviceRegistry};
use domain::{
    Connectivity, DeviceAddress, DeviceKind, DevicePatch, DeviceSettings, SensorReading,
    SignalColor,
};

fn registry() -> DeviceRegistry {
    DeviceRegistry::new(DeviceAddress {
        host: "gateway.local".to_string(),
        port: 9000,
    })
}

fn decoded(line: &str) -> UpstreamEvent {
    match decode(line) {
        Some(Decoded::Event(event)) => event,
        other => panic!("expected event, got {:?}", other),
    }
}

#[test]
fn registration_creates_online_powered_record_with_defaults() {
    let mut registry = registry();
    let outcome = registry
        .apply(&decoded("[REGISTRO] sem-01:MISTO:5001"), 1000)
        .expect("outcome");
    assert!(outcome.is_new_device());
    assert_eq!(registry.len(), 1);

    let record = registry.get("sem-01").expect("record");
    assert_eq!(record.kind, DeviceKind::TrafficLight);
    assert_eq!(record.connectivity, Connectivity::Online);
    assert!(record.powered);
    assert_eq!(record.address.host, "gateway.local");
    assert_eq!(record.address.port, 5001);
    assert!(record.reading.is_none());
    match &record.settings {
        DeviceSettings::TrafficLight(settings) => {
            assert_eq!(settings.current_state, SignalColor::Red);
            assert_eq!(settings.red_duration, 30);
            assert_eq!(settings.yellow_duration, 5);
            assert_eq!(settings.green_duration, 25);
        }
        other => panic!("unexpected settings: {:?}", other),
    }
}

#[test]
fn registration_is_idempotent() {
    let mut once = registry();
    once.apply(&decoded("[REGISTRO] poste_rua:ATUADOR:8002"), 1000);

    let mut twice = registry();
    twice.apply(&decoded("[REGISTRO] poste_rua:ATUADOR:8002"), 1000);
    let second = twice.apply(&decoded("[REGISTRO] poste_rua:SENSOR:9999"), 2000);

    assert!(second.is_none());
    assert_eq!(once.snapshot(), twice.snapshot());
}

#[test]
fn sample_for_unknown_id_creates_record_then_sets_reading() {
    for (id, kind) in [
        ("temp-01", DeviceKind::TemperatureSensor),
        ("sensor_ar", DeviceKind::AirQualitySensor),
    ] {
        let mut registry = registry();
        let event = UpstreamEvent::SampleReceived {
            id: id.to_string(),
            value: 23.5,
            unit: "°C".to_string(),
        };
        let outcome = registry.apply(&event, 1000).expect("outcome");
        assert!(outcome.is_new_device());

        let record = registry.get(id).expect("record");
        assert_eq!(record.kind, kind);
        assert_eq!(record.address.port, 9000);
        assert_eq!(
            record.reading,
            Some(SensorReading {
                value: 23.5,
                unit: "°C".to_string(),
                captured_at_ms: 1000,
            })
        );
    }
}

#[test]
fn second_sample_overwrites_reading() {
    let mut registry = registry();
    registry.apply(&decoded("[temp-01] TEMP: 23.5 °C"), 1000);
    let outcome = registry
        .apply(&decoded("[temp-01] TEMP: 24.0 °C"), 2000)
        .expect("outcome");

    assert!(!outcome.is_new_device());
    let record = registry.get("temp-01").expect("record");
    let reading = record.reading.as_ref().expect("reading");
    assert_eq!(reading.value, 24.0);
    assert_eq!(reading.captured_at_ms, 2000);
    assert_eq!(record.last_update_ms, 2000);
    assert_eq!(registry.len(), 1);
}

#[test]
fn color_report_sets_state_without_reading() {
    let mut registry = registry();
    registry.apply(&decoded("[REGISTRO] semaforo_principal:ATUADOR:8001"), 1000);
    let outcome = registry
        .apply(&decoded("[semaforo_principal] COR_SEMAFORO: 1 amarelo"), 2000)
        .expect("outcome");

    match outcome {
        ApplyOutcome::ColorChanged { record, created } => {
            assert!(!created);
            assert_eq!(record.current_color(), Some(SignalColor::Yellow));
            assert!(record.reading.is_none());
            assert_eq!(record.last_update_ms, 2000);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn deregistration_removes_known_device_only() {
    let mut registry = registry();
    registry.apply(&decoded("[REGISTRO] cam-01:MISTO:5000"), 1000);
    registry.apply(&decoded("[REGISTRO] poste-01:ATUADOR:5002"), 1000);

    assert!(registry.apply(&decoded("[DESREGISTRO] ghost"), 2000).is_none());
    let outcome = registry
        .apply(&decoded("[DESREGISTRO] cam-01"), 2000)
        .expect("outcome");
    assert_eq!(
        outcome,
        ApplyOutcome::Deregistered {
            id: "cam-01".to_string()
        }
    );
    assert!(outcome.record().is_none());
    let ids: Vec<String> = registry.snapshot().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["poste-01".to_string()]);
}

#[test]
fn snapshot_keeps_first_seen_order_and_clear_empties() {
    let mut registry = registry();
    for line in [
        "[REGISTRO] cam-b:MISTO:1",
        "[temp-a] TEMP: 20 °C",
        "[REGISTRO] poste-c:ATUADOR:3",
    ] {
        registry.apply(&decoded(line), 1000);
    }
    let ids: Vec<String> = registry.snapshot().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["cam-b", "temp-a", "poste-c"]);

    registry.clear();
    assert!(registry.is_empty());
    assert!(registry.snapshot().is_empty());
}

#[test]
fn patch_updates_existing_device() {
    let mut registry = registry();
    registry.apply(&decoded("[REGISTRO] poste-01:ATUADOR:5002"), 1000);
    let patch = DevicePatch {
        powered: Some(false),
        brightness: Some(0),
        ..DevicePatch::default()
    };
    let record = registry.apply_patch("poste-01", &patch, 2000).expect("record");
    assert!(!record.powered);
    assert!(registry.apply_patch("ghost", &patch, 2000).is_none());
}
