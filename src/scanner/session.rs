/// Live session: one persistent websocket with automatic reconnect
///
/// State machine: Disconnected -> Connecting -> Connected -> Disconnected, retried
/// forever with the configured delay policy until shutdown. The session itself
/// never subscribes to anything; the list controllers re-issue their
/// subscriptions whenever they see `SessionState::Connected`.
///
/// Debug logging: enable with `--debug-session`.
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::messages::{IncomingMessage, OutgoingMessage};
use crate::arguments::is_debug_session_enabled;
use crate::config::{BackoffMode, SessionConfig};
use crate::logger::{self, LogTag};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Message(IncomingMessage),
}

/// Delay between connection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub mode: BackoffMode,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            mode: BackoffMode::Fixed,
            base_delay: delay,
            max_delay: delay,
            jitter: false,
        }
    }

    pub fn exponential(base_delay: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            mode: BackoffMode::Exponential,
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let base = Duration::from_millis(config.reconnect_delay_ms);
        match config.backoff {
            BackoffMode::Fixed => Self {
                jitter: config.jitter,
                ..Self::fixed(base)
            },
            BackoffMode::Exponential => Self::exponential(
                base,
                Duration::from_millis(config.max_reconnect_delay_ms),
                config.jitter,
            ),
        }
    }

    /// Upper bound of the delay before retry number `attempt` (1-based)
    pub fn ceiling_for(&self, attempt: u32) -> Duration {
        match self.mode {
            BackoffMode::Fixed => self.base_delay,
            BackoffMode::Exponential => {
                let exp = attempt.saturating_sub(1).min(16);
                self.base_delay
                    .saturating_mul(1u32 << exp)
                    .min(self.max_delay)
            }
        }
    }

    /// Delay before retry number `attempt`; with jitter it lands in
    /// `[ceiling / 2, ceiling]`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_for(attempt);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Cloneable handle shared by the list controllers
#[derive(Debug, Clone)]
pub struct SessionHandle {
    outbound: mpsc::UnboundedSender<OutgoingMessage>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Queue a command for the open connection; dropped while disconnected
    pub fn send(&self, message: OutgoingMessage) -> bool {
        if !self.is_connected() {
            if is_debug_session_enabled() {
                logger::debug(
                    LogTag::Session,
                    &format!("Dropped '{}' while disconnected", message.event_name()),
                );
            }
            return false;
        }
        self.outbound.send(message).is_ok()
    }
}

enum ConnectionEnd {
    Shutdown,
    Closed(String),
}

struct SessionWorker {
    url: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    outbound_rx: mpsc::UnboundedReceiver<OutgoingMessage>,
    shutdown: watch::Receiver<bool>,
}

/// Start the session task
pub fn spawn_session(
    url: String,
    policy: ReconnectPolicy,
    shutdown: watch::Receiver<bool>,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (events, events_rx) = mpsc::unbounded_channel();
    let (state_tx, state) = watch::channel(SessionState::Disconnected);

    let worker = SessionWorker {
        url,
        policy,
        state_tx,
        events,
        outbound_rx,
        shutdown,
    };
    tokio::spawn(worker.run());

    (SessionHandle { outbound, state }, events_rx)
}

impl SessionWorker {
    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Publish a state transition; false when nobody listens anymore
    fn set_state(&self, state: SessionState) -> bool {
        let changed = *self.state_tx.borrow() != state;
        self.state_tx.send_replace(state);
        if !changed {
            return true;
        }
        self.events.send(SessionEvent::StateChanged(state)).is_ok()
    }

    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            if self.is_shutdown() || !self.set_state(SessionState::Connecting) {
                break;
            }

            if is_debug_session_enabled() {
                logger::debug(
                    LogTag::Session,
                    &format!("Connecting to {} (attempt {})", self.url, attempt + 1),
                );
            }

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = self.shutdown.changed() => break,
            };

            match connected {
                Ok((ws, _)) => {
                    attempt = 0;
                    // Anything queued before this connection existed is stale
                    while self.outbound_rx.try_recv().is_ok() {}

                    logger::info(LogTag::Session, &format!("Connected to {}", self.url));
                    if !self.set_state(SessionState::Connected) {
                        break;
                    }

                    let end = self.drive(ws).await;
                    if !self.set_state(SessionState::Disconnected) {
                        break;
                    }
                    match end {
                        ConnectionEnd::Shutdown => break,
                        ConnectionEnd::Closed(reason) => logger::warning(
                            LogTag::Session,
                            &format!("WebSocket disconnected ({}), attempting to reconnect", reason),
                        ),
                    }
                }
                Err(e) => {
                    if !self.set_state(SessionState::Disconnected) {
                        break;
                    }
                    logger::warning(
                        LogTag::Session,
                        &format!("Failed to connect to {}: {}", self.url, e),
                    );
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = self.policy.delay_for(attempt);
            if is_debug_session_enabled() {
                logger::debug(
                    LogTag::Session,
                    &format!("Reconnecting in {}ms", delay.as_millis()),
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                result = self.shutdown.changed() => {
                    if result.is_err() || self.is_shutdown() {
                        break;
                    }
                }
            }
        }

        self.set_state(SessionState::Disconnected);
        if is_debug_session_enabled() {
            logger::debug(LogTag::Session, "Session task stopped");
        }
    }

    /// Pump one open connection until it closes or shutdown is requested
    async fn drive(&mut self, ws: WsStream) -> ConnectionEnd {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                result = self.shutdown.changed() => {
                    if result.is_err() || self.is_shutdown() {
                        let _ = sink.send(Message::Close(None)).await;
                        return ConnectionEnd::Shutdown;
                    }
                }
                outgoing = self.outbound_rx.recv() => {
                    let Some(message) = outgoing else {
                        return ConnectionEnd::Shutdown;
                    };
                    match message.to_json() {
                        Ok(text) => {
                            if is_debug_session_enabled() {
                                logger::debug(LogTag::Session, &format!("-> {}", text));
                            }
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                return ConnectionEnd::Closed(format!("send failed: {}", e));
                            }
                        }
                        Err(e) => logger::error(LogTag::Session, &e.to_string()),
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !self.dispatch(&text) {
                            return ConnectionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return ConnectionEnd::Closed("closed by server".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return ConnectionEnd::Closed(e.to_string()),
                },
            }
        }
    }

    /// Decode and forward one frame; false when the consumer is gone
    fn dispatch(&self, text: &str) -> bool {
        match IncomingMessage::parse(text) {
            Ok(Some(message)) => {
                if is_debug_session_enabled() {
                    logger::debug(
                        LogTag::Session,
                        &format!("<- {} ({} bytes)", message.event_name(), text.len()),
                    );
                }
                self.events.send(SessionEvent::Message(message)).is_ok()
            }
            Ok(None) => {
                logger::verbose(LogTag::Session, "Ignored frame with unhandled event");
                true
            }
            Err(e) => {
                logger::warning(LogTag::Session, &format!("Discarded frame: {}", e));
                true
            }
        }
    }
}
