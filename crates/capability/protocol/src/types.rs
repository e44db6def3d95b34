//! 协议相关类型定义

/// 上游事件（由一行文本解析而来）。
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// 设备注册：`[REGISTRO] id:categoria:porta`
    Registered {
        id: String,
        category: String,
        port: u16,
    },
    /// 设备注销：`[DESREGISTRO] id`
    Deregistered { id: String },
    /// 传感器采样：`[id] TIPO: valor unidade`
    SampleReceived { id: String, value: f64, unit: String },
    /// 信号灯颜色上报：`[id] COR_SEMAFORO: valor cor`
    ColorChanged { id: String, color_word: String },
}

impl UpstreamEvent {
    pub fn device_id(&self) -> &str {
        match self {
            Self::Registered { id, .. }
            | Self::Deregistered { id }
            | Self::SampleReceived { id, .. }
            | Self::ColorChanged { id, .. } => id,
        }
    }
}

/// 单行解析结果。
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(UpstreamEvent),
    /// 命令回执（`[OK] ...`），只记录日志
    Acknowledged(String),
    /// 无法识别的行，忽略
    Unrecognized,
}

/// 下行线协议动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireAction {
    ChangeColor,
    SetIntensity,
    PowerOn,
    PowerOff,
    SetResolution,
    /// 连接建立后的引导命令，让已存在的设备重新注册
    ListDevices,
}

impl WireAction {
    /// 网关识别的动作令牌。
    pub fn token(self) -> &'static str {
        match self {
            Self::ChangeColor => "MUDAR_COR",
            Self::SetIntensity => "SET_INTENSIDADE",
            Self::PowerOn => "LIGAR",
            Self::PowerOff => "DESLIGAR",
            Self::SetResolution => "SET_RESOLUCAO",
            Self::ListDevices => "LISTAR",
        }
    }
}

/// 待发送到上游的命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCommand {
    pub device_id: String,
    pub action: WireAction,
    pub param: String,
}

impl WireCommand {
    pub fn new(device_id: impl Into<String>, action: WireAction, param: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            action,
            param: param.into(),
        }
    }

    /// 引导命令（不需要设备 ID）。
    pub fn list_devices() -> Self {
        Self::new("", WireAction::ListDevices, "")
    }
}
