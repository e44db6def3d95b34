//! # 订阅端广播
//!
//! 每个订阅者一条有界队列，消息只序列化一次后共享给所有订阅者。
//! 投递使用 `try_send`，从不等待慢订阅者：队列满或已关闭的订阅者在那次失败的投递时被剔除，
//! 对端随后看到连接关闭，重连后通过追赶消息恢复完整状态。

use api_contract::ServerMessage;
use bridge_telemetry::{record_broadcast, record_subscriber_pruned};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

/// 订阅者标识。
pub type SubscriberId = Uuid;

/// 默认的单订阅者队列长度。
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// 广播器。
pub struct Broadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// 注册订阅者，返回其标识与消息接收端。
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        debug!(target: "bridge.fanout", subscriber_id = %id, "subscriber_added");
        (id, rx)
    }

    /// 移除订阅者；不存在时返回 false。
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            debug!(target: "bridge.fanout", subscriber_id = %id, "subscriber_removed");
        }
        removed
    }

    /// 广播给所有订阅者，返回成功入队的数量。
    pub fn publish(&self, message: &ServerMessage) -> usize {
        let Some(payload) = serialize(message) else {
            return 0;
        };
        record_broadcast();

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for (id, tx) in subscribers.iter() {
                match tx.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(err) => failed.push((*id, reason(&err))),
                }
            }
        }
        for (id, reason) in failed {
            self.prune(&id, reason);
        }
        delivered
    }

    /// 只发给一个订阅者（回复、追赶消息）。失败时同样剔除。
    pub fn send_to(&self, id: &SubscriberId, message: &ServerMessage) -> bool {
        let Some(payload) = serialize(message) else {
            return false;
        };
        let result = {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match subscribers.get(id) {
                Some(tx) => tx.try_send(payload).map_err(|err| reason(&err)),
                None => return false,
            }
        };
        match result {
            Ok(()) => true,
            Err(reason) => {
                self.prune(id, reason);
                false
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prune(&self, id: &SubscriberId, reason: &'static str) {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            record_subscriber_pruned();
            warn!(target: "bridge.fanout", subscriber_id = %id, reason, "subscriber_pruned");
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

fn serialize(message: &ServerMessage) -> Option<Arc<str>> {
    match message.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(err) => {
            warn!(
                target: "bridge.fanout",
                kind = message.event.kind(),
                error = %err,
                "message_serialize_failed"
            );
            None
        }
    }
}

fn reason<T>(err: &TrySendError<T>) -> &'static str {
    match err {
        TrySendError::Full(_) => "queue_full",
        TrySendError::Closed(_) => "closed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_contract::ServerEvent;

    fn status(connected: bool) -> ServerMessage {
        ServerMessage::at(ServerEvent::gateway_status(connected), 0)
    }

    #[test]
    fn zero_buffer_is_clamped() {
        let broadcaster = Broadcaster::new(0);
        let (_id, mut rx) = broadcaster.subscribe();
        assert_eq!(broadcaster.publish(&status(true)), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn unsubscribe_unknown_is_false() {
        let broadcaster = Broadcaster::default();
        assert!(!broadcaster.unsubscribe(&Uuid::new_v4()));
        let (id, _rx) = broadcaster.subscribe();
        assert!(broadcaster.unsubscribe(&id));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
