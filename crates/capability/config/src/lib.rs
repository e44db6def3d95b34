//! 应用运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// 订阅端 WebSocket 监听地址
    pub ws_addr: String,
    pub gateway_host: String,
    pub gateway_port: u16,
    pub reconnect_delay_ms: u64,
    pub bootstrap_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub subscriber_buffer: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，未设置或为空的键使用默认值。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };
        let ws_addr = match source.get("BRIDGE_WS_ADDR") {
            Some(addr) => addr,
            None => format!("0.0.0.0:{}", source.u16_or("WS_PORT", 3001)?),
        };
        let gateway_host = source
            .get_any(&["BRIDGE_GATEWAY_HOST", "GATEWAY_HOST"])
            .map(|(_, value)| value)
            .unwrap_or_else(|| "localhost".to_string());
        let gateway_port = match source.get_any(&["BRIDGE_GATEWAY_PORT", "GATEWAY_PORT"]) {
            Some((key, value)) => parse(key, value)?,
            None => 9000,
        };
        let reconnect_delay_ms = source.u64_or("BRIDGE_RECONNECT_DELAY_MS", 5000)?;
        let bootstrap_delay_ms = source.u64_or("BRIDGE_BOOTSTRAP_DELAY_MS", 500)?;
        let connect_timeout_ms = source.u64_or("BRIDGE_CONNECT_TIMEOUT_MS", 5000)?;
        let subscriber_buffer = source.usize_or("BRIDGE_SUBSCRIBER_BUFFER", 256)?;
        if subscriber_buffer == 0 {
            return Err(ConfigError::Invalid(
                "BRIDGE_SUBSCRIBER_BUFFER".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            ws_addr,
            gateway_host,
            gateway_port,
            reconnect_delay_ms,
            bootstrap_delay_ms,
            connect_timeout_ms,
            subscriber_buffer,
        })
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn bootstrap_delay(&self) -> Duration {
        Duration::from_millis(self.bootstrap_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// 按顺序取第一个已设置的键（主键在前，兼容别名在后）。
    fn get_any<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, String)> {
        keys.iter()
            .find_map(|key| self.get(key).map(|value| (*key, value)))
    }

    fn u16_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        match self.get(key) {
            Some(value) => parse(key, value),
            None => Ok(default),
        }
    }

    fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            Some(value) => parse(key, value),
            None => Ok(default),
        }
    }

    fn usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.get(key) {
            Some(value) => parse(key, value),
            None => Ok(default),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
