//! 订阅端 WebSocket 会话。
//!
//! 每个会话拆成读写两半：写任务把订阅队列转发到套接字，读循环把文本请求交给桥接上下文。
//! 订阅者被广播器剔除时队列关闭，写任务结束，会话随之关闭。

use crate::routes::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (subscriber_id, mut rx) = state.bridge.attach_subscriber().await;
    info!(target: "bridge.server", subscriber_id = %subscriber_id, "subscriber_connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text.to_string())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            debug!(target: "bridge.server", subscriber_id = %subscriber_id, "binary_frame_ignored");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        warn!(target: "bridge.server", subscriber_id = %subscriber_id, error = %err, "subscriber_socket_error");
                        break;
                    }
                };
                if let Err(err) = state.bridge.handle_text(subscriber_id, &text).await {
                    debug!(target: "bridge.server", subscriber_id = %subscriber_id, error = %err, "subscriber_request_failed");
                }
            }
            _ = &mut send_task => break,
        }
    }

    state.bridge.detach_subscriber(&subscriber_id);
    send_task.abort();
    info!(target: "bridge.server", subscriber_id = %subscriber_id, "subscriber_disconnected");
}
