use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_util::sync::CancellationToken;

use crate::config::settings::ControlSettings;
use crate::control::command::{ControlCommand, ControlReply};
use crate::control::queue::CommandQueue;
use crate::control::zmtp::ReqLink;
use crate::foundation::error::{VertexError, VertexResult};

/// One established request/reply session with the control endpoint.
#[async_trait]
pub trait ControlLink: Send {
    async fn request(&mut self, message: &str) -> VertexResult<String>;

    /// Resolves with the reason once an idle session has gone away. Must be cancel safe.
    async fn closed(&mut self) -> VertexError {
        std::future::pending().await
    }
}

#[async_trait]
impl<S> ControlLink for ReqLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn request(&mut self, message: &str) -> VertexResult<String> {
        let reply = ReqLink::request(self, message.as_bytes()).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    async fn closed(&mut self) -> VertexError {
        ReqLink::closed(self).await
    }
}

/// Opens fresh control sessions. Every reconnect gets a brand new link.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> VertexResult<Box<dyn ControlLink>>;

    /// Human-readable address, for logs.
    fn endpoint(&self) -> String;
}

/// Connects to the graph's `zmq` filter over TCP.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> VertexResult<Box<dyn ControlLink>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| VertexError::transport(format!("connect {}: {e}", self.addr)))?;
        stream
            .set_nodelay(true)
            .map_err(|e| VertexError::transport(format!("configure {}: {e}", self.addr)))?;
        let link = ReqLink::handshake(stream).await?;
        Ok(Box::new(link))
    }

    fn endpoint(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Chooses how to reach a control endpoint once its port is known.
pub trait ControlDialer: Send + Sync {
    fn dial(&self, host: &str, port: u16) -> Arc<dyn Connector>;
}

/// Dials the endpoint over TCP.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDialer;

impl ControlDialer for TcpDialer {
    fn dial(&self, host: &str, port: u16) -> Arc<dyn Connector> {
        Arc::new(TcpConnector::new(host, port))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

/// Enqueue side of the command channel. Never blocks and never transmits directly.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<ControlCommand>,
}

impl CommandSender {
    pub fn enqueue(&self, cmd: ControlCommand) -> VertexResult<()> {
        tracing::debug!(command = %cmd, "queued control command");
        self.tx
            .send(cmd)
            .map_err(|e| VertexError::transport(format!("control channel closed; dropped '{}'", e.0)))
    }
}

/// Receive side, consumed by [`ControlConnection`].
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<ControlCommand>,
}

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Owns the control socket and drains queued commands through it, at most one per
/// `command_interval`.
///
/// Commands accumulate while the endpoint is unreachable and drain once a session is
/// established. A send that fails or times out drops that command and replaces the socket;
/// nothing is replayed.
pub struct ControlConnection {
    connector: Arc<dyn Connector>,
    commands: CommandReceiver,
    queue: CommandQueue,
    settings: ControlSettings,
    state: watch::Sender<ConnectionState>,
}

impl ControlConnection {
    pub fn new(connector: Arc<dyn Connector>, commands: CommandReceiver, settings: ControlSettings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Unconnected);
        Self {
            connector,
            commands,
            queue: CommandQueue::new(settings.order),
            settings,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` fires or every sender is gone and the queue is drained.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self {
            connector,
            commands,
            mut queue,
            settings,
            state,
        } = self;
        let mut rx = commands.rx;
        let mut open = true;
        let endpoint = connector.endpoint();
        let mut link: Option<Box<dyn ControlLink>> = None;
        let mut next_send = Instant::now();
        let mut pause = false;

        loop {
            if link.is_none() {
                if !open && queue.is_empty() {
                    break;
                }
                if pause {
                    let waited = accepting(
                        sleep(settings.reconnect_delay()),
                        &mut rx,
                        &mut open,
                        &mut queue,
                        &shutdown,
                    )
                    .await;
                    if waited.is_none() {
                        state.send_replace(ConnectionState::Closed);
                        return;
                    }
                }
                state.send_replace(ConnectionState::Connecting);
                tracing::debug!(%endpoint, "connecting control socket");
                let Some(result) =
                    accepting(connector.connect(), &mut rx, &mut open, &mut queue, &shutdown).await
                else {
                    state.send_replace(ConnectionState::Closed);
                    return;
                };
                match result {
                    Ok(established) => {
                        tracing::info!(%endpoint, pending = queue.len(), "control socket connected");
                        state.send_replace(ConnectionState::Connected);
                        link = Some(established);
                        pause = false;
                    }
                    Err(err) => {
                        tracing::warn!(%endpoint, error = %err, "control socket connect failed");
                        state.send_replace(ConnectionState::Unconnected);
                        pause = true;
                    }
                }
                continue;
            }

            while let Ok(cmd) = rx.try_recv() {
                queue.push(cmd);
            }
            if !open && queue.is_empty() {
                break;
            }
            let Some(active) = link.as_mut() else { continue };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                cmd = rx.recv(), if open => match cmd {
                    Some(cmd) => queue.push(cmd),
                    None => open = false,
                },
                reason = active.closed() => {
                    tracing::warn!(%endpoint, pending = queue.len(), error = %reason, "control socket disconnected");
                    link = None;
                    pause = true;
                    state.send_replace(ConnectionState::Unconnected);
                }
                _ = sleep_until(next_send), if !queue.is_empty() => {
                    let Some(cmd) = queue.pop() else { continue };
                    next_send = Instant::now() + settings.command_interval();
                    if let Err(err) = transmit(&mut **active, &cmd, &settings).await {
                        tracing::warn!(
                            %endpoint,
                            command = %cmd,
                            error = %err,
                            "control command dropped; replacing socket"
                        );
                        link = None;
                        state.send_replace(ConnectionState::Unconnected);
                    }
                }
            }
        }
        tracing::debug!(%endpoint, dropped = queue.len(), "control connection closed");
        state.send_replace(ConnectionState::Closed);
    }
}

/// Await `fut` while still taking in commands. `None` when shutdown fired first.
async fn accepting<F: Future>(
    fut: F,
    rx: &mut mpsc::UnboundedReceiver<ControlCommand>,
    open: &mut bool,
    queue: &mut CommandQueue,
    shutdown: &CancellationToken,
) -> Option<F::Output> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return None,
            out = &mut fut => return Some(out),
            cmd = rx.recv(), if *open => match cmd {
                Some(cmd) => queue.push(cmd),
                None => *open = false,
            },
        }
    }
}

async fn transmit(link: &mut dyn ControlLink, cmd: &ControlCommand, settings: &ControlSettings) -> VertexResult<()> {
    let message = cmd.encode();
    tracing::info!(command = %message, "sending control command");
    let raw = timeout(settings.reply_timeout(), link.request(&message))
        .await
        .map_err(|_| {
            VertexError::transport(format!(
                "no reply within {}ms",
                settings.reply_timeout().as_millis()
            ))
        })??;
    match ControlReply::parse(&raw) {
        Ok(reply) if reply.is_success() => {
            tracing::debug!(command = %message, reply = %raw, "control command applied");
        }
        Ok(reply) => {
            tracing::warn!(command = %message, code = reply.code, reply = %reply.message, "control command rejected");
        }
        Err(err) => tracing::warn!(command = %message, error = %err, "unreadable control reply"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/control/connection.rs"]
mod tests;
