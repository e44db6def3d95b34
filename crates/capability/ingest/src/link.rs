//! 上游链路 actor
//!
//! 状态：未连接 → 连接中 → 已连接 → 未连接，另有正交的“手动停止”标记。
//! 只有两个定时器：重连定时器与引导（`LISTAR`）定时器，二者在停止和新的连接尝试时都会被取消。
//! 连接尝试本身也是 `select!` 的一个分支，进行中的连接可以被 `stop` 立即取消。

use crate::{IngestError, LinkObserver, UpstreamControl};
use async_trait::async_trait;
use bridge_control::{CommandDispatcher, ControlError};
use bridge_protocol::{LineFramer, ProtocolError, WireCommand, encode};
use bridge_telemetry::{record_connect_attempt, record_upstream_disconnect};
use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

const CONTROL_QUEUE: usize = 64;
const READ_BUFFER: usize = 4096;

type Connecting = Pin<Box<dyn Future<Output = Result<TcpStream, ProtocolError>> + Send>>;

/// 链路配置。
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    /// 断线后重连间隔
    pub reconnect_delay: Duration,
    /// 连接建立后发送 `LISTAR` 的延迟
    pub bootstrap_delay: Duration,
    pub connect_timeout: Duration,
}

impl LinkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect_delay: Duration::from_secs(5),
            bootstrap_delay: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

enum LinkControl {
    Start,
    Stop(oneshot::Sender<()>),
    Send {
        line: String,
        reply: oneshot::Sender<Result<(), IngestError>>,
    },
}

/// 链路句柄（可克隆）。
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: mpsc::Sender<LinkControl>,
}

impl LinkHandle {
    /// 原样写出一行（调用方负责行结束符）。未连接时返回 `NotConnected`。
    pub async fn send_line(&self, line: impl Into<String>) -> Result<(), IngestError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(LinkControl::Send {
                line: line.into(),
                reply,
            })
            .await
            .map_err(|_| IngestError::LinkClosed)?;
        result.await.map_err(|_| IngestError::LinkClosed)?
    }
}

#[async_trait]
impl CommandDispatcher for LinkHandle {
    async fn dispatch(&self, command: &WireCommand) -> Result<(), ControlError> {
        match self.send_line(encode(command)).await {
            Ok(()) => Ok(()),
            Err(IngestError::Protocol(ProtocolError::NotConnected)) => {
                Err(ControlError::NotConnected)
            }
            Err(err) => Err(ControlError::Dispatch(err.to_string())),
        }
    }
}

#[async_trait]
impl UpstreamControl for LinkHandle {
    async fn start(&self) -> Result<(), IngestError> {
        self.tx
            .send(LinkControl::Start)
            .await
            .map_err(|_| IngestError::LinkClosed)
    }

    async fn stop(&self) -> Result<(), IngestError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(LinkControl::Stop(ack))
            .await
            .map_err(|_| IngestError::LinkClosed)?;
        done.await.map_err(|_| IngestError::LinkClosed)
    }
}

/// 尚未启动的链路。先拿到句柄，再在观察者就绪后 [`UpstreamLink::spawn`]。
pub struct UpstreamLink {
    config: LinkConfig,
    control_rx: mpsc::Receiver<LinkControl>,
}

impl UpstreamLink {
    pub fn new(config: LinkConfig) -> (Self, LinkHandle) {
        let (tx, control_rx) = mpsc::channel(CONTROL_QUEUE);
        (Self { config, control_rx }, LinkHandle { tx })
    }

    /// 启动链路任务。任务在所有句柄被丢弃后退出。
    pub fn spawn(self, observer: Arc<dyn LinkObserver>) -> JoinHandle<()> {
        let actor = LinkActor {
            config: self.config,
            control_rx: self.control_rx,
            observer,
            session: None,
            connecting: None,
            reconnect_at: None,
            bootstrap_at: None,
            manual_stop: false,
        };
        tokio::spawn(actor.run())
    }
}

struct Session {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    framer: LineFramer,
}

struct LinkActor {
    config: LinkConfig,
    control_rx: mpsc::Receiver<LinkControl>,
    observer: Arc<dyn LinkObserver>,
    session: Option<Session>,
    /// 进行中的连接尝试
    connecting: Option<Connecting>,
    reconnect_at: Option<Instant>,
    bootstrap_at: Option<Instant>,
    manual_stop: bool,
}

impl LinkActor {
    async fn run(mut self) {
        let mut buf = vec![0u8; READ_BUFFER];
        loop {
            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(control) => self.handle_control(control).await,
                    None => break,
                },
                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.begin_connect();
                }
                opened = connect_opt(self.connecting.as_mut()) => {
                    self.connecting = None;
                    self.finish_connect(opened).await;
                }
                _ = sleep_until_opt(self.bootstrap_at) => {
                    self.bootstrap_at = None;
                    self.bootstrap().await;
                }
                read = read_opt(self.session.as_mut(), &mut buf) => match read {
                    Ok(0) => self.close_session("closed_by_peer").await,
                    Ok(n) => self.feed(&buf[..n]).await,
                    Err(err) => {
                        warn!(target: "bridge.link", error = %err, "upstream_read_failed");
                        self.close_session("read_error").await;
                    }
                },
            }
        }
        debug!(target: "bridge.link", "link_task_exit");
    }

    async fn handle_control(&mut self, control: LinkControl) {
        match control {
            LinkControl::Start => {
                self.manual_stop = false;
                if self.session.is_some() || self.connecting.is_some() {
                    debug!(target: "bridge.link", "upstream_already_connected");
                } else {
                    self.begin_connect();
                }
            }
            LinkControl::Stop(ack) => {
                self.manual_stop = true;
                self.reconnect_at = None;
                self.bootstrap_at = None;
                let was_connecting = self.connecting.take().is_some();
                let was_connected = self.session.take().is_some();
                info!(
                    target: "bridge.link",
                    was_connected,
                    was_connecting,
                    "upstream_manual_stop"
                );
                self.observer.on_manual_stop().await;
                let _ = ack.send(());
            }
            LinkControl::Send { line, reply } => match self.write(&line).await {
                Ok(()) => {
                    debug!(target: "bridge.link", line = %line.trim_end(), "upstream_line_sent");
                    let _ = reply.send(Ok(()));
                }
                Err(ProtocolError::NotConnected) => {
                    let _ = reply.send(Err(ProtocolError::NotConnected.into()));
                }
                Err(err) => {
                    warn!(target: "bridge.link", error = %err, "upstream_write_failed");
                    let _ = reply.send(Err(err.into()));
                    self.close_session("write_error").await;
                }
            },
        }
    }

    fn begin_connect(&mut self) {
        self.reconnect_at = None;
        self.bootstrap_at = None;
        self.session = None;

        let addr = self.config.addr();
        record_connect_attempt();
        info!(target: "bridge.link", addr = %addr, "upstream_connecting");
        self.connecting = Some(Box::pin(open_stream(addr, self.config.connect_timeout)));
    }

    async fn finish_connect(&mut self, opened: Result<TcpStream, ProtocolError>) {
        let addr = self.config.addr();
        match opened {
            Ok(stream) => {
                let (reader, writer) = stream.into_split();
                self.session = Some(Session {
                    reader,
                    writer,
                    framer: LineFramer::new(),
                });
                self.bootstrap_at = Some(Instant::now() + self.config.bootstrap_delay);
                info!(target: "bridge.link", addr = %addr, "upstream_connected");
                self.observer.on_connected().await;
            }
            Err(err) => {
                if is_refused(&err) {
                    debug!(target: "bridge.link", addr = %addr, "upstream_connect_refused");
                } else {
                    warn!(target: "bridge.link", addr = %addr, error = %err, "upstream_connect_failed");
                }
                self.observer.on_disconnected().await;
                self.schedule_reconnect();
            }
        }
    }

    async fn bootstrap(&mut self) {
        let line = encode(&WireCommand::list_devices());
        match self.write(&line).await {
            Ok(()) => debug!(target: "bridge.link", "bootstrap_sent"),
            Err(ProtocolError::NotConnected) => {}
            Err(err) => {
                warn!(target: "bridge.link", error = %err, "bootstrap_write_failed");
                self.close_session("write_error").await;
            }
        }
    }

    async fn feed(&mut self, bytes: &[u8]) {
        let lines = match self.session.as_mut() {
            Some(session) => session.framer.push(bytes),
            None => return,
        };
        for line in lines {
            self.observer.on_line(&line).await;
        }
    }

    async fn write(&mut self, line: &str) -> Result<(), ProtocolError> {
        let session = self.session.as_mut().ok_or(ProtocolError::NotConnected)?;
        session.writer.write_all(line.as_bytes()).await?;
        session.writer.flush().await?;
        Ok(())
    }

    async fn close_session(&mut self, reason: &'static str) {
        if self.session.take().is_none() {
            return;
        }
        self.bootstrap_at = None;
        record_upstream_disconnect();
        info!(target: "bridge.link", reason, "upstream_disconnected");
        self.observer.on_disconnected().await;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.manual_stop {
            return;
        }
        self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
        debug!(
            target: "bridge.link",
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "upstream_reconnect_scheduled"
        );
    }
}

async fn open_stream(addr: String, limit: Duration) -> Result<TcpStream, ProtocolError> {
    match timeout(limit, TcpStream::connect(addr.as_str())).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(err)) => Err(ProtocolError::Io(err)),
        Err(_) => Err(ProtocolError::Timeout(format!("connect to {}", addr))),
    }
}

fn is_refused(err: &ProtocolError) -> bool {
    matches!(err, ProtocolError::Io(io) if io.kind() == ErrorKind::ConnectionRefused)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn connect_opt(connecting: Option<&mut Connecting>) -> Result<TcpStream, ProtocolError> {
    match connecting {
        Some(connecting) => connecting.await,
        None => std::future::pending().await,
    }
}

async fn read_opt(session: Option<&mut Session>, buf: &mut [u8]) -> std::io::Result<usize> {
    match session {
        Some(session) => session.reader.read(buf).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings() {
        let config = LinkConfig::new("localhost", 9000);
        assert_eq!(config.addr(), "localhost:9000");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.bootstrap_delay, Duration::from_millis(500));
    }

    #[test]
    fn refused_is_detected() {
        let refused = ProtocolError::Io(std::io::Error::from(ErrorKind::ConnectionRefused));
        assert!(is_refused(&refused));
        assert!(!is_refused(&ProtocolError::Timeout("connect".to_string())));
    }
}
