pub mod color;
pub mod data;
pub mod settings;

pub use color::SignalColor;
pub use data::{
    Connectivity, DeviceAddress, DeviceKind, DevicePatch, DeviceRecord, SensorReading,
    display_name_from_id,
};
pub use settings::{
    CameraSettings, DeviceSettings, SettingValue, StreetLampSettings, TrafficLightSettings,
};

/// 获取当前时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
