//! 稳定的订阅端消息契约：下行信封、设备 DTO、上行请求。

mod device;
mod health;
mod message;
mod request;

pub use device::{DeviceDto, SensorDataDto, setting_to_json};
pub use health::{HealthResponse, MetricsSnapshotDto};
pub use message::{
    DeviceRef, GatewayStatusPayload, NoticePayload, SensorDataPayload, ServerEvent, ServerMessage,
    format_timestamp,
};
pub use request::{ClientRequest, CommandParams, CommandRequest, RequestError, parse_request};
