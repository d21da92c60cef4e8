//! Session wiring.
//!
//! A [`Session`] is built once at the application root and owns everything
//! the messaging feature needs: the connection manager, the notification
//! dispatcher, the chat view model, the activity feed and the REST client.
//! Subscriptions are held by the session and released when it is dropped;
//! the connection itself closes on [`Session::shutdown`].

use std::{collections::VecDeque, sync::Arc};

use kith_client::{
    ApiError, ChatApi, ClientConfig, ConnectionError, ConnectionManager, Environment,
    NotificationDispatcher, Subscription, Transport,
};
use kith_proto::{Conversation, CorrelationId, Frame, FrameKind, NotificationKind, UserId};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use crate::{ChatAction, ChatEvent, ChatViewModel, NotificationFeed};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection could not be set up.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A REST call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// State shared with bus handlers.
struct Views {
    chat: Mutex<ChatViewModel>,
    feed: Mutex<NotificationFeed>,
    alerts: Mutex<Vec<String>>,
    revision: watch::Sender<u64>,
}

impl Views {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Apply actions raised from a handler. Only local effects are possible
    /// here; anything needing I/O is logged and skipped.
    fn apply_local(&self, actions: Vec<ChatAction>) {
        for action in actions {
            match action {
                ChatAction::Render => self.bump(),
                ChatAction::Alert { message } => {
                    self.alerts.lock().push(message);
                    self.bump();
                },
                ChatAction::FetchHistory { .. } | ChatAction::SendFrame { .. } => {
                    tracing::warn!(?action, "unexpected I/O action from event handler");
                },
            }
        }
    }

    fn handle(&self, event: ChatEvent) {
        let actions = self.chat.lock().handle(event);
        self.apply_local(actions);
    }
}

/// The messaging feature of one signed-in user.
pub struct Session<E: Environment, A: ChatApi> {
    manager: ConnectionManager<E>,
    dispatcher: NotificationDispatcher,
    api: A,
    env: E,
    views: Arc<Views>,
    subscriptions: Vec<Subscription>,
}

impl<E: Environment, A: ChatApi> Session<E, A> {
    /// Build a session for user `me`.
    ///
    /// Spawns the connection task but does not connect; call
    /// [`Session::start`].
    pub fn new<T: Transport>(
        config: &ClientConfig,
        me: UserId,
        transport: T,
        api: A,
        env: E,
    ) -> Result<Self, SessionError> {
        let manager = ConnectionManager::spawn(config, transport, env.clone())?;
        let mut dispatcher = NotificationDispatcher::new();
        dispatcher.attach(&manager);

        let (revision, _) = watch::channel(0);
        let views = Arc::new(Views {
            chat: Mutex::new(ChatViewModel::new(me)),
            feed: Mutex::new(NotificationFeed::new()),
            alerts: Mutex::new(Vec::new()),
            revision,
        });

        let mut subscriptions = Vec::new();
        for kind in [FrameKind::Private, FrameKind::Group, FrameKind::Broadcast, FrameKind::ConnectionStatus] {
            let views = Arc::clone(&views);
            subscriptions.push(manager.subscribe(kind, move |frame: &Frame| {
                views.handle(ChatEvent::FrameReceived(frame.clone()));
                Ok(())
            }));
        }

        for (subtype, online) in
            [(NotificationKind::UserConnected, true), (NotificationKind::UserDisconnected, false)]
        {
            let views = Arc::clone(&views);
            subscriptions.push(dispatcher.subscribe(subtype, move |notification| {
                let Some(user) = notification.subject() else {
                    tracing::debug!(subtype = %notification.subtype, "presence without user");
                    return Ok(());
                };
                let event = if online { ChatEvent::UserConnected(user) } else { ChatEvent::UserDisconnected(user) };
                views.handle(event);
                Ok(())
            }));
        }

        for subtype in [NotificationKind::FollowRequest, NotificationKind::Follow] {
            let views = Arc::clone(&views);
            subscriptions.push(dispatcher.subscribe(subtype, move |notification| {
                if views.feed.lock().push(notification) {
                    views.bump();
                }
                Ok(())
            }));
        }

        Ok(Self { manager, dispatcher, api, env, views, subscriptions })
    }

    /// Connect and seed the online-user set.
    pub async fn start(&self) {
        self.manager.connect();
        let users = self.dispatcher.load_online_users(&self.api).await;
        self.views.handle(ChatEvent::OnlineUsersLoaded(users));
    }

    /// Select a conversation and load its history.
    pub async fn select(&self, conversation: Conversation) {
        let actions = self.views.chat.lock().select(conversation);
        self.run(actions).await;
    }

    /// Retry a failed history load.
    pub async fn retry(&self) {
        let actions = self.views.chat.lock().retry();
        self.run(actions).await;
    }

    /// Send `content` to the active conversation.
    pub async fn send(&self, content: &str) {
        let client_id = CorrelationId::from_u64(self.env.random_u64());
        let now = self.env.wall_clock();
        let actions = self.views.chat.lock().compose(content, now, client_id);
        self.run(actions).await;
    }

    /// Mark all notifications read on the server, then locally.
    pub async fn mark_read(&self) -> Result<(), SessionError> {
        self.api.mark_notifications_read().await?;
        self.views.feed.lock().mark_all_read();
        self.views.bump();
        Ok(())
    }

    /// Release subscriptions and close the connection.
    pub async fn shutdown(self) {
        let Self { manager, dispatcher, subscriptions, .. } = self;
        drop(subscriptions);
        drop(dispatcher);
        manager.shutdown().await;
    }

    /// Snapshot of the chat view.
    pub fn view(&self) -> ChatViewModel {
        self.views.chat.lock().clone()
    }

    /// Run `f` against the chat view without cloning it.
    pub fn with_view<R>(&self, f: impl FnOnce(&ChatViewModel) -> R) -> R {
        f(&self.views.chat.lock())
    }

    /// Snapshot of the activity feed.
    pub fn feed(&self) -> NotificationFeed {
        self.views.feed.lock().clone()
    }

    /// Alerts raised since the last call.
    pub fn take_alerts(&self) -> Vec<String> {
        std::mem::take(&mut *self.views.alerts.lock())
    }

    /// Receiver whose value changes whenever the view or feed changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.views.revision.subscribe()
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager<E> {
        &self.manager
    }

    /// The notification dispatcher.
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    async fn run(&self, actions: Vec<ChatAction>) {
        let mut pending: VecDeque<ChatAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                ChatAction::Render => self.views.bump(),
                ChatAction::Alert { message } => {
                    self.views.alerts.lock().push(message);
                    self.views.bump();
                },
                ChatAction::FetchHistory { conversation } => {
                    let event = match self.api.chat_history(conversation).await {
                        Ok(messages) => ChatEvent::HistoryLoaded { conversation, messages },
                        Err(error) => ChatEvent::HistoryFailed { conversation, error },
                    };
                    pending.extend(self.views.chat.lock().handle(event));
                },
                ChatAction::SendFrame { message } => {
                    let client_id = message.client_id.clone();
                    if let Err(error) = self.manager.send(message) {
                        let event = ChatEvent::SendFailed {
                            client_id: client_id.unwrap_or_else(|| CorrelationId::from_u64(0)),
                            reason: error.to_string(),
                        };
                        pending.extend(self.views.chat.lock().handle(event));
                    }
                },
            }
        }
    }
}
