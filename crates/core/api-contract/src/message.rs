use crate::device::{DeviceDto, SensorDataDto};
use chrono::{DateTime, SecondsFormat, Utc};
use domain::DeviceRecord;
use serde::Serialize;

/// 下行事件，序列化为 `{"type": ..., "payload": ...}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    DeviceList(Vec<DeviceDto>),
    DeviceConnected(DeviceDto),
    DeviceDisconnected(DeviceRef),
    DeviceUpdate(DeviceDto),
    SensorData(SensorDataPayload),
    GatewayStatus(GatewayStatusPayload),
    Error(NoticePayload),
    Disconnected(NoticePayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRef {
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataPayload {
    pub device_id: String,
    pub data: SensorDataDto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatusPayload {
    pub connected: bool,
}

/// 面向单个订阅端的提示（错误 / 断开确认）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticePayload {
    pub message: String,
}

impl ServerEvent {
    pub fn device_list<'a>(records: impl IntoIterator<Item = &'a DeviceRecord>) -> Self {
        Self::DeviceList(records.into_iter().map(DeviceDto::from).collect())
    }

    pub fn device_connected(record: &DeviceRecord) -> Self {
        Self::DeviceConnected(DeviceDto::from(record))
    }

    pub fn device_update(record: &DeviceRecord) -> Self {
        Self::DeviceUpdate(DeviceDto::from(record))
    }

    pub fn device_disconnected(device_id: impl Into<String>) -> Self {
        Self::DeviceDisconnected(DeviceRef {
            device_id: device_id.into(),
        })
    }

    /// 设备没有读数时返回 None。
    pub fn sensor_data(record: &DeviceRecord) -> Option<Self> {
        let reading = record.reading.as_ref()?;
        Some(Self::SensorData(SensorDataPayload {
            device_id: record.id.clone(),
            data: SensorDataDto::from(reading),
        }))
    }

    pub fn gateway_status(connected: bool) -> Self {
        Self::GatewayStatus(GatewayStatusPayload { connected })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(NoticePayload {
            message: message.into(),
        })
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected(NoticePayload {
            message: message.into(),
        })
    }

    /// 消息类型名（用于日志）。
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceList(_) => "device_list",
            Self::DeviceConnected(_) => "device_connected",
            Self::DeviceDisconnected(_) => "device_disconnected",
            Self::DeviceUpdate(_) => "device_update",
            Self::SensorData(_) => "sensor_data",
            Self::GatewayStatus(_) => "gateway_status",
            Self::Error(_) => "error",
            Self::Disconnected(_) => "disconnected",
        }
    }
}

/// 下行消息信封：`{type, payload, timestamp}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerMessage {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub timestamp: String,
}

impl ServerMessage {
    /// 以当前时间构造消息。
    pub fn new(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn at(event: ServerEvent, ts_ms: i64) -> Self {
        Self {
            event,
            timestamp: format_timestamp(ts_ms),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        Self::new(event)
    }
}

/// 毫秒时间戳 → RFC 3339（UTC，毫秒精度，`Z` 结尾）。
pub fn format_timestamp(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
