//! 行解析与命令序列化
//!
//! 解析顺序固定，先命中者生效：注册 → 注销 → 通用读数 → 回执 → 无法识别。
//! 某个标签的格式不完整时继续尝试后面的格式。

use crate::types::{Decoded, UpstreamEvent, WireAction, WireCommand};

/// 通用读数中表示信号灯颜色的读数类型。
pub const COLOR_READING_KIND: &str = "COR_SEMAFORO";

const REGISTER_TAG: &str = "[REGISTRO]";
const DEREGISTER_TAG: &str = "[DESREGISTRO]";
const ACK_TAG: &str = "[OK]";

/// 解析一行（已去掉行结束符）。空行返回 None。
pub fn decode(line: &str) -> Option<Decoded> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let decoded = match parse_registration(line)
        .or_else(|| parse_deregistration(line))
        .or_else(|| parse_reading(line))
    {
        Some(event) => Decoded::Event(event),
        None => match line.strip_prefix(ACK_TAG) {
            Some(rest) => Decoded::Acknowledged(rest.trim().to_string()),
            None => Decoded::Unrecognized,
        },
    };
    Some(decoded)
}

/// 序列化下行命令，结尾的 `\n` 是接收端分帧的依据。
pub fn encode(command: &WireCommand) -> String {
    match command.action {
        WireAction::ListDevices => format!("{}:\n", WireAction::ListDevices.token()),
        action => format!(
            "{}:{}:{}\n",
            command.device_id,
            action.token(),
            command.param
        ),
    }
}

/// `[REGISTRO] id:categoria:porta`
fn parse_registration(line: &str) -> Option<UpstreamEvent> {
    let rest = line.strip_prefix(REGISTER_TAG)?.trim_start();
    let mut parts = rest.splitn(3, ':');
    let id = parts.next()?.trim();
    let category = parts.next()?.trim();
    let port = parts.next()?.trim().parse::<u16>().ok()?;
    if id.is_empty() || category.is_empty() {
        return None;
    }
    Some(UpstreamEvent::Registered {
        id: id.to_string(),
        category: category.to_string(),
        port,
    })
}

/// `[DESREGISTRO] id`
fn parse_deregistration(line: &str) -> Option<UpstreamEvent> {
    let id = line.strip_prefix(DEREGISTER_TAG)?.trim();
    if id.is_empty() {
        return None;
    }
    Some(UpstreamEvent::Deregistered { id: id.to_string() })
}

/// `[tag] TIPO: valor unidade`，标签约定为设备 ID。
fn parse_reading(line: &str) -> Option<UpstreamEvent> {
    let (tag, rest) = line.strip_prefix('[')?.split_once(']')?;
    let id = tag.trim();
    let (kind, rest) = rest.split_once(':')?;
    let kind = kind.trim();
    if id.is_empty() || kind.is_empty() {
        return None;
    }

    let rest = rest.trim_start();
    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
        .unwrap_or(rest.len());
    let (number, unit) = rest.split_at(split);
    let value = number.parse::<f64>().ok().filter(|value| value.is_finite())?;
    let unit = unit.trim();
    if unit.is_empty() {
        return None;
    }

    if kind == COLOR_READING_KIND {
        Some(UpstreamEvent::ColorChanged {
            id: id.to_string(),
            color_word: unit.to_string(),
        })
    } else {
        Some(UpstreamEvent::SampleReceived {
            id: id.to_string(),
            value,
            unit: unit.to_string(),
        })
    }
}
