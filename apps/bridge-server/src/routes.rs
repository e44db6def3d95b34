//! 路由定义
//!
//! - `/`、`/ws`：订阅端 WebSocket
//! - `/health`：连接状态与计数器快照

use crate::{request_context, ws};
use api_contract::{HealthResponse, MetricsSnapshotDto};
use axum::{Json, Router, extract::State, middleware, routing::get};
use bridge_pipeline::Bridge;
use bridge_telemetry::metrics;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = metrics().snapshot();
    Json(HealthResponse {
        status: "ok".to_string(),
        gateway_connected: state.bridge.is_connected().await,
        device_count: state.bridge.device_count().await,
        subscriber_count: state.bridge.broadcaster().subscriber_count(),
        metrics: MetricsSnapshotDto {
            lines_received: snapshot.lines_received,
            lines_unrecognized: snapshot.lines_unrecognized,
            events_applied: snapshot.events_applied,
            broadcasts: snapshot.broadcasts,
            subscribers_pruned: snapshot.subscribers_pruned,
            commands_issued: snapshot.commands_issued,
            commands_dropped: snapshot.commands_dropped,
            command_dispatch_failure: snapshot.command_dispatch_failure,
            connect_attempts: snapshot.connect_attempts,
            upstream_disconnects: snapshot.upstream_disconnects,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bridge_fanout::Broadcaster;
    use bridge_ingest::{LinkConfig, LinkObserver, UpstreamLink};
    use domain::DeviceAddress;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state() -> AppState {
        // 链路任务不启动，健康检查只读桥接状态
        let (_link, handle) = UpstreamLink::new(LinkConfig::new("127.0.0.1", 9));
        let bridge = Bridge::new(
            Arc::new(handle),
            Arc::new(Broadcaster::default()),
            DeviceAddress {
                host: "127.0.0.1".to_string(),
                port: 9,
            },
        );
        AppState {
            bridge: Arc::new(bridge),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes: bytes::Bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_reports_bridge_state() {
        let state = state();
        state.bridge.on_connected().await;
        state.bridge.on_line("[REGISTRO] sem-01:MISTO:5001").await;
        let (_id, _rx) = state.bridge.attach_subscriber().await;

        let response = create_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["gatewayConnected"], true);
        assert_eq!(body["deviceCount"], 1);
        assert_eq!(body["subscriberCount"], 1);
        assert!(body["metrics"]["linesReceived"].as_u64().unwrap_or_default() >= 1);
    }

    #[tokio::test]
    async fn plain_get_on_ws_route_is_rejected() {
        let response = create_router(state())
            .oneshot(Request::get("/ws").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert!(response.status().is_client_error());
    }
}
