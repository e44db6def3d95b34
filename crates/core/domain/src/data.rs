use crate::color::SignalColor;
use crate::settings::DeviceSettings;

/// 设备类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    TrafficLight,
    StreetLamp,
    TemperatureSensor,
    AirQualitySensor,
}

/// ID 关键字 → 设备类型，按顺序匹配，先命中者生效。
///
/// `sem` 同时覆盖 `semaforo` 与 `sem-01` 这类缩写。
const KIND_HINTS: &[(&[&str], DeviceKind)] = &[
    (&["sem"], DeviceKind::TrafficLight),
    (&["poste", "luz"], DeviceKind::StreetLamp),
    (&["radar", "camera", "cam"], DeviceKind::Camera),
    (&["temp"], DeviceKind::TemperatureSensor),
    (&["ar", "air", "qualidade"], DeviceKind::AirQualitySensor),
];

impl DeviceKind {
    /// 按 ID 关键字分类，未命中时回落到上游粗分类（SENSOR / MISTO / 其他）。
    pub fn classify(id: &str, category: &str) -> Self {
        let id = id.to_ascii_lowercase();
        for (hints, kind) in KIND_HINTS {
            if hints.iter().any(|hint| id.contains(hint)) {
                return *kind;
            }
        }
        if category.trim().eq_ignore_ascii_case("SENSOR") {
            Self::TemperatureSensor
        } else {
            Self::Camera
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::TrafficLight => "traffic_light",
            Self::StreetLamp => "street_lamp",
            Self::TemperatureSensor => "temperature_sensor",
            Self::AirQualitySensor => "air_quality_sensor",
        }
    }
}

/// 设备连通状态。核心从不主动把设备置为 offline（无心跳超时）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// 设备地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

/// 最近一次传感器采样。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub value: f64,
    pub unit: String,
    pub captured_at_ms: i64,
}

/// 对设备记录的局部更新（命令的乐观更新）。
///
/// 与设备类型不匹配的字段会被忽略。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePatch {
    pub powered: Option<bool>,
    pub current_state: Option<SignalColor>,
    pub brightness: Option<u8>,
    pub resolution: Option<String>,
}

/// 设备记录。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: String,
    pub display_name: String,
    pub kind: DeviceKind,
    pub connectivity: Connectivity,
    pub powered: bool,
    pub address: DeviceAddress,
    pub last_update_ms: i64,
    pub settings: DeviceSettings,
    pub reading: Option<SensorReading>,
}

impl DeviceRecord {
    /// 首次见到设备时构造记录：分类、默认设置、在线且通电。
    pub fn new(
        id: impl Into<String>,
        category: &str,
        address: DeviceAddress,
        now_ms: i64,
    ) -> Self {
        let id = id.into();
        let kind = DeviceKind::classify(&id, category);
        Self {
            display_name: display_name_from_id(&id),
            id,
            kind,
            connectivity: Connectivity::Online,
            powered: true,
            address,
            last_update_ms: now_ms,
            settings: DeviceSettings::defaults_for(kind),
            reading: None,
        }
    }

    /// 信号灯当前颜色（非信号灯返回 None）。
    pub fn current_color(&self) -> Option<SignalColor> {
        match &self.settings {
            DeviceSettings::TrafficLight(settings) => Some(settings.current_state),
            _ => None,
        }
    }

    /// 上游上报颜色。仅信号灯会记录颜色，但任何设备都会刷新 last_update。
    pub fn set_color(&mut self, color: SignalColor, now_ms: i64) {
        if let DeviceSettings::TrafficLight(settings) = &mut self.settings {
            settings.current_state = color;
        }
        self.last_update_ms = now_ms;
    }

    /// 记录一次采样，整体覆盖上一次的值。
    pub fn record_sample(&mut self, value: f64, unit: impl Into<String>, now_ms: i64) {
        self.reading = Some(SensorReading {
            value,
            unit: unit.into(),
            captured_at_ms: now_ms,
        });
        self.last_update_ms = now_ms;
    }

    /// 应用局部更新（浅合并）。
    pub fn apply_patch(&mut self, patch: &DevicePatch, now_ms: i64) {
        if let Some(powered) = patch.powered {
            self.powered = powered;
        }
        match &mut self.settings {
            DeviceSettings::TrafficLight(settings) => {
                if let Some(color) = patch.current_state {
                    settings.current_state = color;
                }
            }
            DeviceSettings::StreetLamp(settings) => {
                if let Some(brightness) = patch.brightness {
                    settings.brightness = brightness.min(100);
                }
            }
            DeviceSettings::Camera(settings) => {
                if let Some(resolution) = &patch.resolution {
                    settings.resolution = resolution.clone();
                }
            }
            DeviceSettings::Sensor => {}
        }
        self.last_update_ms = now_ms;
    }
}

/// 由设备 ID 派生显示名：下划线转空格，每个单词首字母大写。
pub fn display_name_from_id(id: &str) -> String {
    id.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
