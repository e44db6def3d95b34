//! 追踪初始化、请求 ID 与桥接计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub lines_unrecognized: u64,
    pub events_applied: u64,
    pub broadcasts: u64,
    pub subscribers_pruned: u64,
    pub commands_issued: u64,
    pub commands_dropped: u64,
    pub command_dispatch_failure: u64,
    pub connect_attempts: u64,
    pub upstream_disconnects: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    lines_received: AtomicU64,
    lines_unrecognized: AtomicU64,
    events_applied: AtomicU64,
    broadcasts: AtomicU64,
    subscribers_pruned: AtomicU64,
    commands_issued: AtomicU64,
    commands_dropped: AtomicU64,
    command_dispatch_failure: AtomicU64,
    connect_attempts: AtomicU64,
    upstream_disconnects: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            lines_received: AtomicU64::new(0),
            lines_unrecognized: AtomicU64::new(0),
            events_applied: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            subscribers_pruned: AtomicU64::new(0),
            commands_issued: AtomicU64::new(0),
            commands_dropped: AtomicU64::new(0),
            command_dispatch_failure: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
            upstream_disconnects: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_unrecognized: self.lines_unrecognized.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            subscribers_pruned: self.subscribers_pruned.load(Ordering::Relaxed),
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            commands_dropped: self.commands_dropped.load(Ordering::Relaxed),
            command_dispatch_failure: self.command_dispatch_failure.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            upstream_disconnects: self.upstream_disconnects.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录收到的上游完整行数。
pub fn record_line_received() {
    metrics().lines_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录无法识别的上游行数。
pub fn record_line_unrecognized() {
    metrics().lines_unrecognized.fetch_add(1, Ordering::Relaxed);
}

/// 记录产生状态变化的事件数。
pub fn record_event_applied() {
    metrics().events_applied.fetch_add(1, Ordering::Relaxed);
}

/// 记录广播次数（每条消息一次，与订阅者数量无关）。
pub fn record_broadcast() {
    metrics().broadcasts.fetch_add(1, Ordering::Relaxed);
}

/// 记录因队列满或已关闭被剔除的订阅者。
pub fn record_subscriber_pruned() {
    metrics().subscribers_pruned.fetch_add(1, Ordering::Relaxed);
}

/// 记录已翻译并下发的命令。
pub fn record_command_issued() {
    metrics().commands_issued.fetch_add(1, Ordering::Relaxed);
}

/// 记录 NoOp 命令（未知设备 / 参数不匹配）。
pub fn record_command_dropped() {
    metrics().commands_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录命令写出失败（未连接或写 socket 失败）。
pub fn record_command_dispatch_failure() {
    metrics()
        .command_dispatch_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录上游连接尝试次数。
pub fn record_connect_attempt() {
    metrics().connect_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录上游会话断开次数（不含手动断开）。
pub fn record_upstream_disconnect() {
    metrics()
        .upstream_disconnects
        .fetch_add(1, Ordering::Relaxed);
}
