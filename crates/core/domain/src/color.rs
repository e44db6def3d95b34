//! 信号灯颜色。
//!
//! 同一个 `currentState` 字段上存在两套互不相干的状态机：
//! - 上游上报的颜色（红 → 黄 → 绿）直接覆盖为绝对值；
//! - 订阅端 toggle 命令驱动的循环（红 → 绿 → 黄 → 红），见 [`SignalColor::next_commanded`]。

/// 信号灯颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalColor {
    #[default]
    Red,
    Yellow,
    Green,
}

impl SignalColor {
    /// 颜色词归一化：大小写不敏感，支持葡语同义词，未知词回落为红色。
    pub fn normalize(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "green" | "verde" => Self::Green,
            "yellow" | "amarelo" => Self::Yellow,
            _ => Self::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }

    /// 上游线协议使用的颜色令牌。
    pub fn wire_token(self) -> &'static str {
        match self {
            Self::Red => "VERMELHO",
            Self::Yellow => "AMARELO",
            Self::Green => "VERDE",
        }
    }

    /// toggle 命令的下一个颜色：红 → 绿 → 黄 → 红。
    pub fn next_commanded(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }
}
