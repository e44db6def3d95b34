//! # 桥接上下文
//!
//! 上游行 → 解码 → 注册表 → 广播；订阅端命令 → 翻译 → 链路写出 → 乐观更新 → 广播。
//!
//! 注册表与连接状态放在同一把锁里，事件的应用和对应的广播在持锁期间完成，
//! 因此所有订阅者看到的消息顺序与状态变化顺序一致。持锁期间从不等待链路任务。
//!
//! 命令另有一把串行锁，从翻译、下发一直持有到乐观更新写回注册表：
//! 同一时刻只有一条命令在途，下一条命令总是基于上一条的结果计算。

use api_contract::{
    ClientRequest, CommandParams, CommandRequest, RequestError, ServerEvent, ServerMessage,
    parse_request,
};
use async_trait::async_trait;
use bridge_control::{ConfigureParams, ControlError, DeviceCommand, translate};
use bridge_fanout::{Broadcaster, SubscriberId};
use bridge_ingest::{IngestError, LinkObserver, UpstreamControl};
use bridge_protocol::{Decoded, decode};
use bridge_registry::{ApplyOutcome, DeviceRegistry};
use bridge_telemetry::{
    record_command_dispatch_failure, record_command_dropped, record_command_issued,
    record_event_applied, record_line_received, record_line_unrecognized,
};
use domain::{DeviceAddress, DeviceRecord, now_epoch_ms};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

const NOT_CONNECTED_MESSAGE: &str = "Gateway não conectado";
const DISCONNECTED_MESSAGE: &str = "Desconectado do Gateway";

/// 桥接处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Upstream(#[from] IngestError),
}

struct BridgeState {
    registry: DeviceRegistry,
    connected: bool,
}

/// 桥接上下文（进程内唯一）。
pub struct Bridge {
    state: Mutex<BridgeState>,
    /// 命令串行化；下发期间只持有它，不持有 `state`（链路回调需要 `state`）
    command_gate: Mutex<()>,
    upstream: Arc<dyn UpstreamControl>,
    broadcaster: Arc<Broadcaster>,
}

impl Bridge {
    /// `default_address` 为补建设备时使用的地址（网关 host/port）。
    pub fn new(
        upstream: Arc<dyn UpstreamControl>,
        broadcaster: Arc<Broadcaster>,
        default_address: DeviceAddress,
    ) -> Self {
        Self {
            state: Mutex::new(BridgeState {
                registry: DeviceRegistry::new(default_address),
                connected: false,
            }),
            command_gate: Mutex::new(()),
            upstream,
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// 接入订阅者，并在持锁期间发送追赶消息（连接状态 + 完整设备列表），
    /// 保证追赶消息先于之后的任何广播。
    pub async fn attach_subscriber(&self) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
        let state = self.state.lock().await;
        let (id, rx) = self.broadcaster.subscribe();
        self.broadcaster.send_to(
            &id,
            &ServerMessage::new(ServerEvent::gateway_status(state.connected)),
        );
        self.broadcaster.send_to(
            &id,
            &ServerMessage::new(ServerEvent::device_list(&state.registry.snapshot())),
        );
        (id, rx)
    }

    pub fn detach_subscriber(&self, id: &SubscriberId) {
        self.broadcaster.unsubscribe(id);
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    pub async fn device_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    pub async fn snapshot(&self) -> Vec<DeviceRecord> {
        self.state.lock().await.registry.snapshot()
    }

    /// 处理一条订阅端文本消息。格式错误只回复请求方，不断开连接。
    pub async fn handle_text(
        &self,
        subscriber: SubscriberId,
        text: &str,
    ) -> Result<(), PipelineError> {
        let request = match parse_request(text) {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    target: "bridge.pipeline",
                    subscriber_id = %subscriber,
                    error = %err,
                    "subscriber_request_invalid"
                );
                let message = format!("Requisição inválida: {}", err);
                self.reply(&subscriber, ServerEvent::error(message));
                return Err(err.into());
            }
        };
        self.handle_request(subscriber, request).await
    }

    pub async fn handle_request(
        &self,
        subscriber: SubscriberId,
        request: ClientRequest,
    ) -> Result<(), PipelineError> {
        match request {
            ClientRequest::DeviceList => {
                let state = self.state.lock().await;
                self.reply(&subscriber, ServerEvent::device_list(&state.registry.snapshot()));
                Ok(())
            }
            ClientRequest::Connect => {
                info!(target: "bridge.pipeline", subscriber_id = %subscriber, "connect_requested");
                self.upstream.start().await?;
                Ok(())
            }
            ClientRequest::Disconnect => {
                info!(target: "bridge.pipeline", subscriber_id = %subscriber, "disconnect_requested");
                // 返回时注册表已清空，状态广播已发出
                self.upstream.stop().await?;
                self.reply(&subscriber, ServerEvent::disconnected(DISCONNECTED_MESSAGE));
                Ok(())
            }
            ClientRequest::Command(command) => {
                self.handle_command(subscriber, command).await;
                Ok(())
            }
        }
    }

    async fn handle_command(&self, subscriber: SubscriberId, request: CommandRequest) {
        let _gate = self.command_gate.lock().await;
        let translation = {
            let state = self.state.lock().await;
            if !state.connected {
                record_command_dispatch_failure();
                self.reply(&subscriber, ServerEvent::error(NOT_CONNECTED_MESSAGE));
                return;
            }
            let params = request.params.map(configure_params);
            let translation = match (
                DeviceCommand::parse(&request.command, params),
                state.registry.get(&request.device_id),
            ) {
                (Some(command), Some(record)) => translate(&command, record),
                _ => None,
            };
            match translation {
                Some(translation) => translation,
                None => {
                    record_command_dropped();
                    debug!(
                        target: "bridge.pipeline",
                        device_id = %request.device_id,
                        command = %request.command,
                        "command_noop"
                    );
                    return;
                }
            }
        };

        if let Err(err) = self.upstream.dispatch(&translation.command).await {
            record_command_dispatch_failure();
            warn!(
                target: "bridge.pipeline",
                device_id = %request.device_id,
                error = %err,
                "command_dispatch_failed"
            );
            let message = match err {
                ControlError::NotConnected => NOT_CONNECTED_MESSAGE.to_string(),
                other => format!("Falha ao enviar comando: {}", other),
            };
            self.reply(&subscriber, ServerEvent::error(message));
            return;
        }
        record_command_issued();
        info!(
            target: "bridge.pipeline",
            device_id = %request.device_id,
            action = translation.command.action.token(),
            param = %translation.command.param,
            "command_dispatched"
        );

        let mut state = self.state.lock().await;
        let now_ms = now_epoch_ms();
        if let Some(record) = state
            .registry
            .apply_patch(&request.device_id, &translation.patch, now_ms)
        {
            self.publish(ServerEvent::device_update(&record));
        }
    }

    fn apply_line(&self, state: &mut BridgeState, line: &str) {
        let event = match decode(line) {
            None => return,
            Some(Decoded::Event(event)) => event,
            Some(Decoded::Acknowledged(detail)) => {
                info!(target: "bridge.pipeline", detail = %detail, "upstream_ack");
                return;
            }
            Some(Decoded::Unrecognized) => {
                record_line_unrecognized();
                debug!(target: "bridge.pipeline", line = %line, "upstream_line_unrecognized");
                return;
            }
        };

        let Some(outcome) = state.registry.apply(&event, now_epoch_ms()) else {
            debug!(
                target: "bridge.pipeline",
                device_id = %event.device_id(),
                "upstream_event_ignored"
            );
            return;
        };
        record_event_applied();

        match &outcome {
            ApplyOutcome::Registered(record) => {
                info!(
                    target: "bridge.pipeline",
                    device_id = %record.id,
                    kind = record.kind.as_str(),
                    "device_registered"
                );
                self.publish(ServerEvent::device_connected(record));
                self.publish(ServerEvent::device_list(&state.registry.snapshot()));
            }
            ApplyOutcome::Deregistered { id } => {
                info!(target: "bridge.pipeline", device_id = %id, "device_deregistered");
                self.publish(ServerEvent::device_disconnected(id.clone()));
                self.publish(ServerEvent::device_list(&state.registry.snapshot()));
            }
            ApplyOutcome::SampleRecorded { record, created } => {
                if *created {
                    self.publish(ServerEvent::device_connected(record));
                }
                if let Some(event) = ServerEvent::sensor_data(record) {
                    self.publish(event);
                }
            }
            ApplyOutcome::ColorChanged { record, created } => {
                if *created {
                    self.publish(ServerEvent::device_connected(record));
                }
                self.publish(ServerEvent::device_update(record));
            }
        }
    }

    fn publish(&self, event: ServerEvent) {
        let kind = event.kind();
        let delivered = self.broadcaster.publish(&ServerMessage::new(event));
        debug!(target: "bridge.pipeline", kind, delivered, "broadcast");
    }

    fn reply(&self, subscriber: &SubscriberId, event: ServerEvent) {
        self.broadcaster.send_to(subscriber, &ServerMessage::new(event));
    }
}

#[async_trait]
impl LinkObserver for Bridge {
    async fn on_connected(&self) {
        let mut state = self.state.lock().await;
        state.connected = true;
        self.publish(ServerEvent::gateway_status(true));
    }

    async fn on_line(&self, line: &str) {
        record_line_received();
        let mut state = self.state.lock().await;
        self.apply_line(&mut state, line);
    }

    async fn on_disconnected(&self) {
        let mut state = self.state.lock().await;
        // 重连失败会反复回调，只在状态变化时广播
        if state.connected {
            state.connected = false;
            self.publish(ServerEvent::gateway_status(false));
        }
    }

    async fn on_manual_stop(&self) {
        let mut state = self.state.lock().await;
        state.connected = false;
        state.registry.clear();
        self.publish(ServerEvent::gateway_status(false));
        self.publish(ServerEvent::DeviceList(Vec::new()));
    }
}

fn configure_params(params: CommandParams) -> ConfigureParams {
    ConfigureParams {
        current_state: params.current_state,
        brightness: params.brightness,
        resolution: params.resolution,
    }
}
