//! 网关桥接服务：上游 TCP 链路 + 订阅端 WebSocket。

mod routes;
mod ws;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use bridge_config::AppConfig;
use bridge_fanout::Broadcaster;
use bridge_ingest::{LinkConfig, UpstreamControl, UpstreamLink};
use bridge_pipeline::Bridge;
use bridge_telemetry::{init_tracing, new_request_ids};
use domain::DeviceAddress;
use std::sync::Arc;
use tracing::{Instrument, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    // 上游链路：由观察者（桥接上下文）接收行与连接状态
    let (link, handle) = UpstreamLink::new(LinkConfig {
        host: config.gateway_host.clone(),
        port: config.gateway_port,
        reconnect_delay: config.reconnect_delay(),
        bootstrap_delay: config.bootstrap_delay(),
        connect_timeout: config.connect_timeout(),
    });
    let broadcaster = Arc::new(Broadcaster::new(config.subscriber_buffer));
    let bridge = Arc::new(Bridge::new(
        Arc::new(handle.clone()),
        broadcaster,
        DeviceAddress {
            host: config.gateway_host.clone(),
            port: config.gateway_port,
        },
    ));
    let link_task = link.spawn(bridge.clone());
    handle.start().await?;

    let app = routes::create_router(routes::AppState {
        bridge: bridge.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.ws_addr).await?;
    info!(
        target: "bridge.server",
        ws_addr = %config.ws_addr,
        gateway = %format!("{}:{}", config.gateway_host, config.gateway_port),
        "server_started"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = handle.stop().await {
        warn!(target: "bridge.server", error = %err, "link_stop_failed");
    }
    link_task.abort();
    info!(target: "bridge.server", "server_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "bridge.server", error = %err, "ctrl_c_listen_failed");
        std::future::pending::<()>().await;
    }
    info!(target: "bridge.server", "shutdown_requested");
}

pub(crate) async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
