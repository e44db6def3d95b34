use serde::{Deserialize, Serialize};

/// `GET /health` 响应体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub gateway_connected: bool,
    pub device_count: usize,
    pub subscriber_count: usize,
    pub metrics: MetricsSnapshotDto,
}

/// 进程计数器快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
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
