use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 订阅端请求。
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// 只向请求方回复当前设备列表
    DeviceList,
    Command(CommandRequest),
    /// 清除手动断开标记并连接上游
    Connect,
    /// 手动断开上游，抑制自动重连
    Disconnect,
}

/// 设备命令请求体。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub params: Option<CommandParams>,
}

/// configure 命令参数。前端发来的类型不稳定，数字和字符串都接受。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub current_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub brightness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub resolution: Option<String>,
}

/// 请求解析错误。
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown request type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// 解析一条订阅端文本消息。
pub fn parse_request(text: &str) -> Result<ClientRequest, RequestError> {
    let raw: RawRequest = serde_json::from_str(text)?;
    match raw.kind.as_str() {
        "device_list" => Ok(ClientRequest::DeviceList),
        "connect" => Ok(ClientRequest::Connect),
        "disconnect" => Ok(ClientRequest::Disconnect),
        "command" => serde_json::from_value(raw.payload)
            .map(ClientRequest::Command)
            .map_err(|source| RequestError::Payload {
                kind: "command",
                source,
            }),
        _ => Err(RequestError::UnknownType(raw.kind)),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}
