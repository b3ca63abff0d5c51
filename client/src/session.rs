//! Client session: connect, join, reconnect, and relay board traffic.
//!
//! DESIGN
//! ======
//! One background task owns the websocket. Callers talk to it through a
//! cloneable [`SessionHandle`] (commands in) and read what it learns through
//! a bounded event channel plus a `watch` snapshot of [`SessionStatus`].
//!
//! The task moves through explicit phases:
//! - `Connect`: open the transport and send `join`
//! - `Connected`: pump frames both ways until the transport drops
//! - `Wait`: a cancellable reconnect deadline after an unintended loss
//! - `Idle`: parked after a caller disconnect, a rejection, or giving up
//!
//! LIFECYCLE
//! =========
//! `Disconnected → Connecting → Joined → Disconnected`. A loss the caller did
//! not ask for schedules another attempt after a fixed delay, up to a bounded
//! count; a successful open resets the count. Running out of attempts emits
//! [`SessionEvent::Offline`] and parks the task until [`SessionHandle::reconnect`].
//! A terminal, non-retryable `error` before `joined` means the credentials
//! were refused: the session emits [`SessionEvent::Rejected`] and does not retry.
//!
//! Outbound frames are fire-and-forget. Anything sent while not joined is
//! dropped.

use std::time::Duration;

use frames::{ClientMessage, ConnectionId, Presence, ServerMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Joined,
}

/// Why a session stopped trying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parked {
    /// The caller asked to disconnect.
    Disconnected,
    /// The hub refused the join.
    Rejected { code: String, message: String },
    /// Reconnect attempts ran out.
    Offline,
}

/// Latest known session state, published through a `watch` channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Own connection id, set while joined.
    pub connection_id: Option<ConnectionId>,
    /// Local mirror of the room's presence list.
    pub presence: Vec<Presence>,
    /// Reconnect attempts made since the last successful open.
    pub attempts: u32,
    /// Set when the session has stopped trying until told to reconnect.
    pub parked: Option<Parked>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A frame from the hub, delivered after the presence mirror is updated.
    Message(ServerMessage),
    /// The transport dropped without the caller asking.
    Disconnected,
    Reconnecting { attempt: u32, delay: Duration },
    Offline,
    Rejected { code: String, message: String },
}

enum Command {
    Send(ClientMessage),
    Sync(oneshot::Sender<Value>),
    Disconnect(oneshot::Sender<()>),
    Reconnect,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cheap, cloneable front end to a running session task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send(msg) => write!(f, "Send({})", msg.kind()),
            Self::Sync(_) => f.write_str("Sync"),
            Self::Disconnect(_) => f.write_str("Disconnect"),
            Self::Reconnect => f.write_str("Reconnect"),
        }
    }
}

/// Spawn the session task and start connecting immediately.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_session(config: SessionConfig) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
    let (status_tx, status_rx) = watch::channel(SessionStatus::default());

    let actor = Actor {
        config,
        commands: command_rx,
        events: event_tx,
        status: status_tx,
        sync_waiters: Vec::new(),
        attempts: 0,
    };
    tokio::spawn(actor.run());

    (SessionHandle { commands: command_tx, status: status_rx }, event_rx)
}

impl SessionHandle {
    /// Queue a frame for the hub. Returns `false` only if the session task
    /// is gone; a queued frame is still dropped if the session is not joined.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.commands.send(Command::Send(message)).is_ok()
    }

    /// Ask the hub for the board's stored scene. Resolves to `None` if the
    /// session is not joined, the transport drops, or nothing arrives
    /// within `wait`.
    pub async fn request_sync(&self, wait: Duration) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Sync(tx)).ok()?;
        timeout(wait, rx).await.ok()?.ok()
    }

    /// Leave the board and close the transport. Cancels any pending reconnect.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Start over after a disconnect, rejection, or offline state. The
    /// attempt counter resets. Ignored while connected.
    pub fn reconnect(&self) -> bool {
        self.commands.send(Command::Reconnect).is_ok()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the session is joined.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] or [`ClientError::Offline`] if the
    /// session parks first, [`ClientError::Timeout`] if `wait` elapses, and
    /// [`ClientError::Closed`] if the session task is gone.
    pub async fn wait_joined(&self, wait: Duration) -> Result<ConnectionId, ClientError> {
        let mut status = self.status.clone();
        let settled = timeout(wait, status.wait_for(|s| s.state == SessionState::Joined || s.parked.is_some()))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|_| ClientError::Closed)?
            .clone();

        match (settled.connection_id, settled.parked) {
            (_, Some(Parked::Rejected { code, message })) => Err(ClientError::Rejected { code, message }),
            (_, Some(Parked::Offline)) => Err(ClientError::Offline),
            (Some(id), None) => Ok(id),
            _ => Err(ClientError::Closed),
        }
    }
}

// =============================================================================
// ACTOR
// =============================================================================

enum Phase {
    Connect,
    Wait(Instant),
    Idle,
    Stop,
}

/// What ended a connected stretch.
enum Exit {
    /// Transport lost without the caller asking.
    Lost,
    Parked,
    Stop,
}

struct Actor {
    config: SessionConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::Sender<SessionEvent>,
    status: watch::Sender<SessionStatus>,
    sync_waiters: Vec<oneshot::Sender<Value>>,
    attempts: u32,
}

impl Actor {
    async fn run(mut self) {
        let mut phase = Phase::Connect;
        loop {
            phase = match phase {
                Phase::Connect => self.connect().await,
                Phase::Wait(deadline) => self.wait(deadline).await,
                Phase::Idle => self.idle().await,
                Phase::Stop => break,
            };
        }
        self.set_state(SessionState::Disconnected);
        debug!(board_id = %self.config.board_id, "session: task stopped");
    }

    // -------------------------------------------------------------------------
    // phases
    // -------------------------------------------------------------------------

    async fn connect(&mut self) -> Phase {
        self.status.send_modify(|s| {
            s.state = SessionState::Connecting;
            s.parked = None;
        });

        let connecting = connect_async(self.config.url.clone());
        tokio::pin!(connecting);
        let result = loop {
            tokio::select! {
                result = &mut connecting => break result,
                cmd = self.commands.recv() => match cmd {
                    None => return Phase::Stop,
                    Some(Command::Disconnect(ack)) => {
                        self.park(Parked::Disconnected);
                        let _ = ack.send(());
                        return Phase::Idle;
                    }
                    Some(other) => drop_offline(other),
                },
            }
        };

        let ws = match result {
            Ok((ws, _)) => ws,
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "session: connect failed");
                self.set_state(SessionState::Disconnected);
                return self.schedule_retry();
            }
        };

        info!(url = %self.config.url, board_id = %self.config.board_id, "session: transport open");
        self.attempts = 0;
        self.status.send_modify(|s| s.attempts = 0);

        let (mut sink, source) = ws.split();
        let join = ClientMessage::Join { board_id: self.config.board_id.clone(), token: self.config.token.clone() };
        if let Err(e) = send_frame(&mut sink, &join).await {
            warn!(error = %e, "session: join send failed");
            return self.on_lost();
        }

        match self.pump(sink, source).await {
            Exit::Lost => self.on_lost(),
            Exit::Parked => Phase::Idle,
            Exit::Stop => Phase::Stop,
        }
    }

    async fn wait(&mut self, deadline: Instant) -> Phase {
        let sleep = sleep_until(deadline);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return Phase::Connect,
                cmd = self.commands.recv() => match cmd {
                    None => return Phase::Stop,
                    Some(Command::Disconnect(ack)) => {
                        debug!("session: reconnect timer cancelled");
                        self.park(Parked::Disconnected);
                        let _ = ack.send(());
                        return Phase::Idle;
                    }
                    Some(Command::Reconnect) => {
                        self.attempts = 0;
                        return Phase::Connect;
                    }
                    Some(other) => drop_offline(other),
                },
            }
        }
    }

    async fn idle(&mut self) -> Phase {
        loop {
            match self.commands.recv().await {
                None => return Phase::Stop,
                Some(Command::Reconnect) => {
                    self.attempts = 0;
                    return Phase::Connect;
                }
                Some(Command::Disconnect(ack)) => {
                    let _ = ack.send(());
                }
                Some(other) => drop_offline(other),
            }
        }
    }

    // -------------------------------------------------------------------------
    // connected
    // -------------------------------------------------------------------------

    async fn pump(&mut self, mut sink: WsSink, mut source: WsSource) -> Exit {
        let mut joined = false;
        loop {
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => match frames::decode_server(text.as_str()) {
                        Ok(msg) => {
                            if let Some(exit) = self.on_message(msg, &mut joined) {
                                let _ = sink.send(Message::Close(None)).await;
                                return exit;
                            }
                        }
                        Err(e) => warn!(error = %e, "session: undecodable frame from hub"),
                    },
                    Some(Ok(Message::Close(_)) | Err(_)) | None => return Exit::Lost,
                    Some(Ok(_)) => {}
                },
                cmd = self.commands.recv() => match cmd {
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Exit::Stop;
                    }
                    Some(Command::Send(msg)) => {
                        if !joined || matches!(msg, ClientMessage::Join { .. } | ClientMessage::Leave) {
                            debug!(kind = msg.kind(), "session: outbound frame dropped");
                        } else if let Err(e) = send_frame(&mut sink, &msg).await {
                            warn!(error = %e, "session: send failed");
                            return Exit::Lost;
                        }
                    }
                    Some(Command::Sync(waiter)) => {
                        if joined {
                            self.prune_sync_waiters();
                            self.sync_waiters.push(waiter);
                            if let Err(e) = send_frame(&mut sink, &ClientMessage::SyncRequest).await {
                                warn!(error = %e, "session: sync request failed");
                                return Exit::Lost;
                            }
                        }
                    }
                    Some(Command::Disconnect(ack)) => {
                        if joined {
                            let _ = send_frame(&mut sink, &ClientMessage::Leave).await;
                        }
                        let _ = sink.send(Message::Close(None)).await;
                        info!(board_id = %self.config.board_id, "session: disconnected by caller");
                        self.park(Parked::Disconnected);
                        let _ = ack.send(());
                        return Exit::Parked;
                    }
                    Some(Command::Reconnect) => {}
                },
            }
        }
    }

    /// Apply one hub frame to local state. Returns an exit when the frame
    /// ends the connection.
    fn on_message(&mut self, msg: ServerMessage, joined: &mut bool) -> Option<Exit> {
        match &msg {
            ServerMessage::Joined { connection_id, presence_list, .. } => {
                *joined = true;
                info!(%connection_id, members = presence_list.len(), "session: joined board");
                self.status.send_modify(|s| {
                    s.state = SessionState::Joined;
                    s.connection_id = Some(*connection_id);
                    s.presence.clone_from(presence_list);
                });
            }
            ServerMessage::UserJoined { presence } => self.status.send_modify(|s| {
                match s.presence.iter_mut().find(|p| p.connection_id == presence.connection_id) {
                    Some(existing) => existing.clone_from(presence),
                    None => s.presence.push(presence.clone()),
                }
            }),
            ServerMessage::UserLeft { connection_id } => {
                self.status.send_modify(|s| s.presence.retain(|p| p.connection_id != *connection_id));
            }
            ServerMessage::CursorUpdate { connection_id, position } => self.status.send_modify(|s| {
                if let Some(p) = s.presence.iter_mut().find(|p| p.connection_id == *connection_id) {
                    p.cursor = Some(*position);
                }
            }),
            ServerMessage::SyncResponse { scene_data } if self.prune_sync_waiters() > 0 => {
                for waiter in self.sync_waiters.drain(..) {
                    let _ = waiter.send(scene_data.clone());
                }
                return None;
            }
            ServerMessage::Error { message, code, retryable } if !*joined && retryable != &Some(true) => {
                let code = code.clone().unwrap_or_default();
                warn!(%code, %message, "session: join rejected");
                self.emit(SessionEvent::Rejected { code: code.clone(), message: message.clone() });
                self.park(Parked::Rejected { code, message: message.clone() });
                return Some(Exit::Parked);
            }
            ServerMessage::Error { message, code, .. } => {
                warn!(code = code.as_deref().unwrap_or("-"), %message, "session: hub error");
            }
            _ => {}
        }
        self.emit(SessionEvent::Message(msg));
        None
    }

    // -------------------------------------------------------------------------
    // helpers
    // -------------------------------------------------------------------------

    /// Drop waiters whose caller already timed out. Returns how many remain.
    fn prune_sync_waiters(&mut self) -> usize {
        self.sync_waiters.retain(|w| !w.is_closed());
        self.sync_waiters.len()
    }

    fn on_lost(&mut self) -> Phase {
        info!(board_id = %self.config.board_id, "session: transport lost");
        self.sync_waiters.clear();
        self.status.send_modify(|s| {
            s.state = SessionState::Disconnected;
            s.connection_id = None;
            s.presence.clear();
        });
        self.emit(SessionEvent::Disconnected);
        self.schedule_retry()
    }

    fn schedule_retry(&mut self) -> Phase {
        if self.attempts >= self.config.max_reconnect_attempts {
            warn!(attempts = self.attempts, "session: reconnect attempts exhausted; offline");
            self.emit(SessionEvent::Offline);
            self.park(Parked::Offline);
            return Phase::Idle;
        }
        self.attempts += 1;
        let attempt = self.attempts;
        let delay = self.config.reconnect_delay;
        info!(attempt, ?delay, "session: reconnect scheduled");
        self.status.send_modify(|s| s.attempts = attempt);
        self.emit(SessionEvent::Reconnecting { attempt, delay });
        Phase::Wait(Instant::now() + delay)
    }

    fn park(&mut self, reason: Parked) {
        self.sync_waiters.clear();
        self.status.send_modify(|s| {
            s.state = SessionState::Disconnected;
            s.connection_id = None;
            s.presence.clear();
            s.parked = Some(reason);
        });
    }

    fn set_state(&self, state: SessionState) {
        self.status.send_modify(|s| s.state = state);
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.try_send(event).is_err() {
            debug!("session: event dropped (receiver full or gone)");
        }
    }
}

fn drop_offline(cmd: Command) {
    debug!(?cmd, "session: not joined; command dropped");
}

async fn send_frame(sink: &mut WsSink, msg: &ClientMessage) -> Result<(), ClientError> {
    let text = frames::encode(msg)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
