//! Connection manager.
//!
//! Owns one logical connection to the real-time endpoint. A background task
//! holds the transport link and the [`Connection`] state machine; the handle
//! talks to it over a command channel and shares only the event bus and a few
//! status snapshots.
//!
//! # Inbound
//!
//! Text frames are decoded and dispatched on the bus keyed by [`FrameKind`].
//! Malformed frames are logged and dropped; the connection stays open.
//! Frames are handled one at a time in arrival order.
//!
//! # Opening
//!
//! A transport open runs alongside commands, so `disconnect()` takes effect
//! while a slow handshake is still in flight. A link that finishes opening
//! after a disconnect is closed with code 1000 and never reported as
//! connected.
//!
//! # Status
//!
//! Every state transition is published twice: as a `connection_status` frame
//! on the bus and on a [`watch`] channel.

use std::{
    collections::VecDeque,
    future::{self, Future},
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use kith_core::{
    Connection, ConnectionAction, ConnectionError, ConnectionState, Environment, EventBus,
    HandlerError, NORMAL_CLOSURE, Subscription,
};
use kith_proto::{ConnectionStatus, Frame, FrameKind, GroupId, OutgoingMessage, UserId};
use tokio::sync::{mpsc, watch};

use crate::{
    config::ClientConfig,
    error::{SendError, TransportError},
    transport::{Transport, TransportEvent, TransportLink},
};

enum Command {
    Connect,
    Disconnect,
    Send(String),
}

type Opening<L> = Pin<Box<dyn Future<Output = Result<L, TransportError>> + Send>>;

struct Shared {
    bus: EventBus<FrameKind, Frame>,
    connected: AtomicBool,
    attempts: AtomicU32,
    status: watch::Sender<ConnectionState>,
}

/// Handle to the connection task.
///
/// Dropping the last handle closes the link and stops the task.
pub struct ConnectionManager<E: Environment> {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    env: E,
    task: tokio::task::JoinHandle<()>,
}

impl<E: Environment> ConnectionManager<E> {
    /// Spawn the connection task on the current tokio runtime.
    ///
    /// Does not connect. Call [`ConnectionManager::connect`].
    pub fn spawn<T: Transport>(
        config: &ClientConfig,
        transport: T,
        env: E,
    ) -> Result<Self, ConnectionError> {
        let endpoint = config.websocket_url()?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            bus: EventBus::new(),
            connected: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            status,
        });

        let worker = Worker {
            conn: Connection::new(endpoint, config.connection_config()),
            transport: Arc::new(transport),
            opening: None,
            link: None,
            env: env.clone(),
            shared: Arc::clone(&shared),
            commands: command_rx,
        };
        let task = tokio::spawn(worker.run());

        Ok(Self { commands, shared, env, task })
    }

    /// Start connecting. No-op while connecting or connected.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close with code 1000 and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Like [`ConnectionManager::disconnect`], but refuses sends immediately
    /// instead of once the task has processed the close.
    pub fn force_disconnect(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.command(Command::Disconnect);
    }

    /// Disconnect and wait for the task to finish.
    pub async fn shutdown(self) {
        self.command(Command::Disconnect);
        drop(self.commands);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "connection task ended abnormally");
        }
    }

    /// Send a chat frame, stamped with the current time.
    ///
    /// At-most-once and best-effort. Returns [`SendError::NotConnected`]
    /// without touching any state if the transport is not open.
    pub fn send(&self, mut message: OutgoingMessage) -> Result<(), SendError> {
        if !self.is_connected() {
            tracing::warn!(kind = %message.kind, "not connected, message dropped");
            return Err(SendError::NotConnected);
        }

        message.timestamp = self.env.wall_clock();
        let text = message.encode()?;
        self.commands.send(Command::Send(text)).map_err(|_| SendError::Closed)
    }

    /// Send a frame built from raw fields.
    pub fn send_message(
        &self,
        kind: FrameKind,
        content: impl Into<String>,
        to: Option<UserId>,
        group_id: Option<GroupId>,
    ) -> Result<(), SendError> {
        self.send(OutgoingMessage::new(kind, content, to, group_id))
    }

    /// Register a handler for frames of `kind`.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, kind: FrameKind, handler: F) -> Subscription
    where
        F: Fn(&Frame) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(kind, handler)
    }

    /// The bus inbound frames are dispatched on.
    pub fn bus(&self) -> &EventBus<FrameKind, Frame> {
        &self.shared.bus
    }

    /// Whether the transport is open.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.status.borrow()
    }

    /// Receiver that observes every state change.
    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.shared.status.subscribe()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("connection task stopped, command ignored");
        }
    }
}

struct Worker<T: Transport, E: Environment> {
    conn: Connection<E::Instant>,
    transport: Arc<T>,
    opening: Option<Opening<T::Link>>,
    link: Option<T::Link>,
    env: E,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<T: Transport, E: Environment> Worker<T, E> {
    async fn run(mut self) {
        loop {
            let deadline = self.conn.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                result = next_open(&mut self.opening) => {
                    self.opening = None;
                    self.handle_opened(result).await;
                },
                event = next_event(&mut self.link) => self.handle_event(event).await,
                () = wait_until(&self.env, deadline) => {
                    let actions = self.conn.tick(self.env.now());
                    self.execute(actions).await;
                },
            }
        }

        if let Some(mut link) = self.link.take() {
            link.close(NORMAL_CLOSURE).await;
        }
        tracing::debug!("connection task stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let actions = self.conn.connect();
                self.execute(actions).await;
            },
            Command::Disconnect => {
                let actions = self.conn.disconnect();
                self.execute(actions).await;
            },
            Command::Send(text) => match self.link.as_mut() {
                Some(link) => {
                    if let Err(error) = link.send(text).await {
                        tracing::warn!(%error, "send failed");
                    }
                },
                None => tracing::warn!("link closed before send, message dropped"),
            },
        }
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => self.dispatch(&text),
            TransportEvent::Closed { code } => {
                tracing::info!(?code, "connection closed");
                self.link = None;
                let actions = self.conn.handle_close(code, self.env.now());
                self.execute(actions).await;
            },
            TransportEvent::Error(error) => {
                tracing::warn!(%error, "connection error");
                self.link = None;
                let mut actions = self.conn.handle_error();
                actions.extend(self.conn.handle_close(None, self.env.now()));
                self.execute(actions).await;
            },
        }
    }

    async fn handle_opened(&mut self, result: Result<T::Link, TransportError>) {
        let actions = match result {
            Ok(link) => {
                self.link = Some(link);
                self.conn.handle_open()
            },
            Err(error) => {
                tracing::warn!(%error, "connect failed");
                let mut actions = self.conn.handle_error();
                actions.extend(self.conn.handle_close(None, self.env.now()));
                actions
            },
        };
        self.execute(actions).await;
    }

    fn dispatch(&self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed frame");
                return;
            },
        };

        // Status frames are produced locally only.
        if frame.kind() == FrameKind::ConnectionStatus {
            tracing::debug!("ignoring connection_status frame from server");
            return;
        }

        let kind = frame.kind();
        let delivered = self.shared.bus.dispatch(&kind, &frame);
        tracing::trace!(%kind, delivered, "frame dispatched");
    }

    async fn execute(&mut self, actions: Vec<ConnectionAction>) {
        let mut pending: VecDeque<ConnectionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                ConnectionAction::OpenTransport { url } => {
                    tracing::debug!(%url, "opening transport");
                    let transport = Arc::clone(&self.transport);
                    self.opening = Some(Box::pin(async move { transport.open(&url).await }));
                },
                ConnectionAction::CloseTransport { code } => {
                    if let Some(mut link) = self.link.take() {
                        link.close(code).await;
                    }
                },
                ConnectionAction::StatusChanged(state) => self.publish_status(state),
                ConnectionAction::ReconnectScheduled { attempt, delay } => {
                    tracing::debug!(attempt, ?delay, "waiting to reconnect");
                },
                ConnectionAction::ReconnectExhausted { attempts } => {
                    tracing::warn!(attempts, "giving up until the next connect()");
                },
            }
        }

        self.shared.attempts.store(self.conn.attempts(), Ordering::SeqCst);
    }

    fn publish_status(&self, state: ConnectionState) {
        tracing::info!(status = %state, "connection status");
        self.shared.connected.store(state == ConnectionState::Connected, Ordering::SeqCst);
        self.shared.status.send_replace(state);

        let frame = Frame::ConnectionStatus(ConnectionStatus {
            status: state,
            timestamp: self.env.wall_clock(),
        });
        self.shared.bus.dispatch(&FrameKind::ConnectionStatus, &frame);
    }
}

/// Resolves once the in-flight open finishes. Pending while none is.
///
/// Cancel-safe: the open itself lives in `opening` and survives a lost race.
async fn next_open<L>(opening: &mut Option<Opening<L>>) -> Result<L, TransportError> {
    match opening {
        Some(open) => open.await,
        None => future::pending().await,
    }
}

async fn next_event<L: TransportLink>(link: &mut Option<L>) -> TransportEvent {
    match link {
        Some(link) => link.recv().await,
        None => future::pending().await,
    }
}

async fn wait_until<E: Environment>(env: &E, deadline: Option<E::Instant>) {
    let Some(at) = deadline else {
        return future::pending().await;
    };
    let now = env.now();
    if at > now {
        env.sleep(at - now).await;
    }
}
