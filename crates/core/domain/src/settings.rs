//! 设备设置。
//!
//! 内部按设备类型使用带标签的联合体，对外（订阅端 JSON）展平为字符串键的开放映射，
//! 见 [`DeviceSettings::entries`]。

use crate::color::SignalColor;
use crate::data::DeviceKind;

/// 展平后的设置值（原始类型）。
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// 信号灯设置。
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLightSettings {
    pub current_state: SignalColor,
    pub red_duration: u32,
    pub yellow_duration: u32,
    pub green_duration: u32,
}

impl Default for TrafficLightSettings {
    fn default() -> Self {
        Self {
            current_state: SignalColor::Red,
            red_duration: 30,
            yellow_duration: 5,
            green_duration: 25,
        }
    }
}

/// 路灯设置。
#[derive(Debug, Clone, PartialEq)]
pub struct StreetLampSettings {
    /// 亮度（0-100）
    pub brightness: u8,
    pub auto_mode: bool,
}

impl Default for StreetLampSettings {
    fn default() -> Self {
        Self {
            brightness: 100,
            auto_mode: false,
        }
    }
}

/// 摄像头设置。
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub resolution: String,
    pub night_vision: bool,
    pub motion_detection: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: "1080p".to_string(),
            night_vision: true,
            motion_detection: true,
        }
    }
}

/// 按设备类型区分的设置。
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSettings {
    Camera(CameraSettings),
    TrafficLight(TrafficLightSettings),
    StreetLamp(StreetLampSettings),
    /// 传感器没有可配置项
    Sensor,
}

impl DeviceSettings {
    /// 新设备的默认设置。
    pub fn defaults_for(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Camera => Self::Camera(CameraSettings::default()),
            DeviceKind::TrafficLight => Self::TrafficLight(TrafficLightSettings::default()),
            DeviceKind::StreetLamp => Self::StreetLamp(StreetLampSettings::default()),
            DeviceKind::TemperatureSensor | DeviceKind::AirQualitySensor => Self::Sensor,
        }
    }

    /// 展平为开放映射（键名与订阅端约定一致）。
    ///
    /// 同一变体输出的键集合固定，因此创建时存在的键永远不会被移除。
    pub fn entries(&self) -> Vec<(&'static str, SettingValue)> {
        match self {
            Self::TrafficLight(settings) => vec![
                (
                    "currentState",
                    SettingValue::Text(settings.current_state.as_str().to_string()),
                ),
                (
                    "redDuration",
                    SettingValue::Number(f64::from(settings.red_duration)),
                ),
                (
                    "yellowDuration",
                    SettingValue::Number(f64::from(settings.yellow_duration)),
                ),
                (
                    "greenDuration",
                    SettingValue::Number(f64::from(settings.green_duration)),
                ),
            ],
            Self::StreetLamp(settings) => vec![
                (
                    "brightness",
                    SettingValue::Number(f64::from(settings.brightness)),
                ),
                ("autoMode", SettingValue::Bool(settings.auto_mode)),
            ],
            Self::Camera(settings) => vec![
                ("resolution", SettingValue::Text(settings.resolution.clone())),
                ("nightVision", SettingValue::Bool(settings.night_vision)),
                (
                    "motionDetection",
                    SettingValue::Bool(settings.motion_detection),
                ),
            ],
            Self::Sensor => Vec::new(),
        }
    }
}
