use crate::message::format_timestamp;
use domain::{DeviceRecord, SensorReading, SettingValue};
use serde::Serialize;
use serde_json::{Map, Value};

/// 设备返回结构（字段名与现有前端保持一致）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub is_on: bool,
    pub ip: String,
    pub port: u16,
    pub last_update: String,
    pub config: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_data: Option<SensorDataDto>,
}

/// 传感器读数返回结构。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDataDto {
    pub value: f64,
    pub unit: String,
    pub timestamp: String,
}

impl From<&SensorReading> for SensorDataDto {
    fn from(reading: &SensorReading) -> Self {
        Self {
            value: reading.value,
            unit: reading.unit.clone(),
            timestamp: format_timestamp(reading.captured_at_ms),
        }
    }
}

impl From<&DeviceRecord> for DeviceDto {
    fn from(record: &DeviceRecord) -> Self {
        let config = record
            .settings
            .entries()
            .into_iter()
            .map(|(key, value)| (key.to_string(), setting_to_json(&value)))
            .collect();
        Self {
            id: record.id.clone(),
            name: record.display_name.clone(),
            kind: record.kind.as_str().to_string(),
            status: record.connectivity.as_str().to_string(),
            is_on: record.powered,
            ip: record.address.host.clone(),
            port: record.address.port,
            last_update: format_timestamp(record.last_update_ms),
            config,
            sensor_data: record.reading.as_ref().map(SensorDataDto::from),
        }
    }
}

/// 设置值转 JSON；整数值输出为整数（`30` 而不是 `30.0`）。
pub fn setting_to_json(value: &SettingValue) -> Value {
    match value {
        SettingValue::Bool(flag) => Value::Bool(*flag),
        SettingValue::Text(text) => Value::String(text.clone()),
        SettingValue::Number(number) => {
            if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
                Value::from(*number as i64)
            } else {
                serde_json::Number::from_f64(*number)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
    }
}
