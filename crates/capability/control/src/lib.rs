//! # 命令翻译
//!
//! 把订阅端的抽象命令（toggle / configure）结合设备当前状态翻译成线协议动作，
//! 同时给出乐观更新用的补丁。翻译本身是纯函数，不访问链路也不修改注册表；
//! 真正的写出通过 [`CommandDispatcher`] 完成。

use async_trait::async_trait;
use bridge_protocol::{WireAction, WireCommand};
use domain::{DeviceKind, DevicePatch, DeviceRecord, SignalColor};

/// configure 命令参数（已做过宽松类型转换）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigureParams {
    pub current_state: Option<String>,
    pub brightness: Option<f64>,
    pub resolution: Option<String>,
}

/// 抽象设备命令。
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Toggle,
    Configure(ConfigureParams),
}

impl DeviceCommand {
    /// 按命令名构造；未知命令或 configure 缺少参数时返回 None。
    pub fn parse(name: &str, params: Option<ConfigureParams>) -> Option<Self> {
        match name {
            "toggle" => Some(Self::Toggle),
            "configure" => params.map(Self::Configure),
            _ => None,
        }
    }
}

/// 翻译结果：待写出的线协议命令 + 乐观更新补丁。
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub command: WireCommand,
    pub patch: DevicePatch,
}

/// 控制链路错误。
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("upstream not connected")]
    NotConnected,
    #[error("dispatch error: {0}")]
    Dispatch(String),
}

/// 命令下发器抽象。
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(&self, command: &WireCommand) -> Result<(), ControlError>;
}

/// 翻译命令。返回 None 表示 NoOp：不写上游，也不产生广播。
pub fn translate(command: &DeviceCommand, record: &DeviceRecord) -> Option<Translation> {
    match command {
        DeviceCommand::Toggle => translate_toggle(record),
        DeviceCommand::Configure(params) => translate_configure(params, record),
    }
}

fn translate_toggle(record: &DeviceRecord) -> Option<Translation> {
    match record.kind {
        DeviceKind::TrafficLight => {
            let next = record.current_color().unwrap_or_default().next_commanded();
            Some(change_color(record, next))
        }
        DeviceKind::StreetLamp => {
            let powered = !record.powered;
            let brightness: u8 = if powered { 100 } else { 0 };
            Some(Translation {
                command: WireCommand::new(
                    &record.id,
                    WireAction::SetIntensity,
                    format!("{}%", brightness),
                ),
                patch: DevicePatch {
                    powered: Some(powered),
                    brightness: Some(brightness),
                    ..DevicePatch::default()
                },
            })
        }
        DeviceKind::Camera => {
            let (action, param) = if record.powered {
                (WireAction::PowerOff, "OFF")
            } else {
                (WireAction::PowerOn, "ON")
            };
            Some(Translation {
                command: WireCommand::new(&record.id, action, param),
                patch: DevicePatch {
                    powered: Some(!record.powered),
                    ..DevicePatch::default()
                },
            })
        }
        DeviceKind::TemperatureSensor | DeviceKind::AirQualitySensor => None,
    }
}

fn translate_configure(params: &ConfigureParams, record: &DeviceRecord) -> Option<Translation> {
    match record.kind {
        DeviceKind::TrafficLight => {
            let word = non_blank(params.current_state.as_deref())?;
            Some(change_color(record, SignalColor::normalize(word)))
        }
        DeviceKind::StreetLamp => {
            let brightness = params.brightness.and_then(brightness_level)?;
            Some(Translation {
                command: WireCommand::new(
                    &record.id,
                    WireAction::SetIntensity,
                    format!("{}%", brightness),
                ),
                patch: DevicePatch {
                    powered: Some(brightness > 0),
                    brightness: Some(brightness),
                    ..DevicePatch::default()
                },
            })
        }
        DeviceKind::Camera => {
            let resolution = non_blank(params.resolution.as_deref())?;
            Some(Translation {
                command: WireCommand::new(&record.id, WireAction::SetResolution, resolution),
                patch: DevicePatch {
                    resolution: Some(resolution.to_string()),
                    ..DevicePatch::default()
                },
            })
        }
        DeviceKind::TemperatureSensor | DeviceKind::AirQualitySensor => None,
    }
}

fn change_color(record: &DeviceRecord, color: SignalColor) -> Translation {
    Translation {
        command: WireCommand::new(&record.id, WireAction::ChangeColor, color.wire_token()),
        patch: DevicePatch {
            current_state: Some(color),
            ..DevicePatch::default()
        },
    }
}

/// 亮度只接受 0-100，小数四舍五入到整数。
fn brightness_level(value: f64) -> Option<u8> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return None;
    }
    Some(value.round() as u8)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
