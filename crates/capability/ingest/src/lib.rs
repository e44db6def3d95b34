//! # 上游链路
//!
//! 维护唯一一条到网关的 TCP 会话：连接、分帧读取、断线重连、手动停止。
//!
//! 链路是一个独立的 actor 任务，socket 只在任务内部读写；外部通过可克隆的
//! [`LinkHandle`] 发送控制消息，通过 [`LinkObserver`] 接收链路事件。

mod link;

use async_trait::async_trait;
use bridge_control::CommandDispatcher;
use bridge_protocol::ProtocolError;

pub use link::{LinkConfig, LinkHandle, UpstreamLink};

/// 链路错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// 链路任务已退出
    #[error("upstream link stopped")]
    LinkClosed,
}

/// 链路事件观察者。回调在链路任务内依次执行，实现方不得在回调中等待链路本身。
#[async_trait]
pub trait LinkObserver: Send + Sync {
    /// 会话建立
    async fn on_connected(&self);
    /// 收到一条完整的行（已去掉行结束符）
    async fn on_line(&self, line: &str);
    /// 会话断开或连接失败（非手动）
    async fn on_disconnected(&self);
    /// 手动停止完成：socket 已关闭、定时器已取消
    async fn on_manual_stop(&self);
}

/// 上游控制接口：在命令下发之外提供启动与手动停止。
#[async_trait]
pub trait UpstreamControl: CommandDispatcher {
    /// 清除手动停止标记，未连接时立即连接。
    async fn start(&self) -> Result<(), IngestError>;
    /// 手动停止；返回时 [`LinkObserver::on_manual_stop`] 已执行完毕。
    async fn stop(&self) -> Result<(), IngestError>;
}
