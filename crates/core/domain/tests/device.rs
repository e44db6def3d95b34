use domain::{
    Connectivity, DeviceAddress, DeviceKind, DevicePatch, DeviceRecord, DeviceSettings,
    SignalColor, display_name_from_id,
};

fn address() -> DeviceAddress {
    DeviceAddress {
        host: "localhost".to_string(),
        port: 9000,
    }
}

#[test]
fn classify_prefers_id_hints_in_order() {
    assert_eq!(DeviceKind::classify("semaforo_principal", "ATUADOR"), DeviceKind::TrafficLight);
    assert_eq!(DeviceKind::classify("sem-01", "MISTO"), DeviceKind::TrafficLight);
    assert_eq!(DeviceKind::classify("poste_rua", "ATUADOR"), DeviceKind::StreetLamp);
    assert_eq!(DeviceKind::classify("radar_avenida", "SENSOR"), DeviceKind::Camera);
    assert_eq!(DeviceKind::classify("camera_praca", "MISTO"), DeviceKind::Camera);
    assert_eq!(DeviceKind::classify("sensor_temperatura", "SENSOR"), DeviceKind::TemperatureSensor);
    assert_eq!(DeviceKind::classify("sensor_ar", "SENSOR"), DeviceKind::AirQualitySensor);
    assert_eq!(DeviceKind::classify("TEMP-01", "MISTO"), DeviceKind::TemperatureSensor);
}

#[test]
fn classify_falls_back_to_category() {
    assert_eq!(DeviceKind::classify("dev-1", "SENSOR"), DeviceKind::TemperatureSensor);
    assert_eq!(DeviceKind::classify("dev-1", "MISTO"), DeviceKind::Camera);
    assert_eq!(DeviceKind::classify("dev-1", "ATUADOR"), DeviceKind::Camera);
}

#[test]
fn display_name_capitalizes_words() {
    assert_eq!(display_name_from_id("semaforo_principal"), "Semaforo Principal");
    assert_eq!(display_name_from_id("temp-01"), "Temp-01");
}

#[test]
fn new_record_is_online_powered_with_defaults() {
    let record = DeviceRecord::new("poste_central", "ATUADOR", address(), 1000);
    assert_eq!(record.kind, DeviceKind::StreetLamp);
    assert_eq!(record.connectivity, Connectivity::Online);
    assert!(record.powered);
    assert_eq!(record.last_update_ms, 1000);
    assert!(record.reading.is_none());
    match &record.settings {
        DeviceSettings::StreetLamp(settings) => {
            assert_eq!(settings.brightness, 100);
            assert!(!settings.auto_mode);
        }
        other => panic!("unexpected settings: {:?}", other),
    }
}

#[test]
fn color_normalization_accepts_synonyms() {
    assert_eq!(SignalColor::normalize("VERDE"), SignalColor::Green);
    assert_eq!(SignalColor::normalize("green"), SignalColor::Green);
    assert_eq!(SignalColor::normalize("Amarelo"), SignalColor::Yellow);
    assert_eq!(SignalColor::normalize("vermelho"), SignalColor::Red);
    assert_eq!(SignalColor::normalize("azul"), SignalColor::Red);
}

#[test]
fn commanded_cycle_is_red_green_yellow() {
    let mut color = SignalColor::Red;
    let mut seen = Vec::new();
    for _ in 0..3 {
        color = color.next_commanded();
        seen.push(color);
    }
    assert_eq!(seen, vec![SignalColor::Green, SignalColor::Yellow, SignalColor::Red]);
}

#[test]
fn patch_ignores_fields_of_other_kinds() {
    let mut record = DeviceRecord::new("camera_praca", "MISTO", address(), 1000);
    let patch = DevicePatch {
        brightness: Some(10),
        resolution: Some("720p".to_string()),
        ..DevicePatch::default()
    };
    record.apply_patch(&patch, 2000);
    assert_eq!(record.settings.entries().len(), 3);
    match &record.settings {
        DeviceSettings::Camera(settings) => assert_eq!(settings.resolution, "720p"),
        other => panic!("unexpected settings: {:?}", other),
    }
    assert_eq!(record.last_update_ms, 2000);
}

#[test]
fn color_report_on_non_traffic_light_only_touches_timestamp() {
    let mut record = DeviceRecord::new("camera_praca", "MISTO", address(), 1000);
    let before = record.settings.clone();
    record.set_color(SignalColor::Green, 3000);
    assert_eq!(record.settings, before);
    assert_eq!(record.last_update_ms, 3000);
    assert!(record.current_color().is_none());
}
