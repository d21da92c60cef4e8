//! End-to-end session behavior: in-memory server, scripted REST API,
//! paused clock.

use std::time::Duration;

use kith_app::{ChatViewModel, ConversationState, Session};
use kith_client::{ApiError, ClientConfig, ConnectionState, HistoryMessage};
use kith_harness::{FakeApi, InvariantRegistry, MemoryServer, MemoryTransport, ServerConn, SimEnv, ViewSnapshot};
use kith_proto::{
    BroadcastMessage, Conversation, Frame, Notification, NotificationKind, OutgoingMessage,
    PrivateMessage, Timestamp,
};
use url::Url;

const ME: u64 = 7;
const PEER: u64 = 9;

struct Fixture {
    session: Session<SimEnv, FakeApi>,
    server: MemoryServer,
    api: FakeApi,
}

fn fixture() -> Fixture {
    let (transport, server) = MemoryTransport::pair();
    let api = FakeApi::new();
    let config = ClientConfig::new(Url::parse("http://chat.test").unwrap());
    let session =
        Session::new(&config, ME, transport, api.clone(), SimEnv::with_seed(7)).unwrap();
    Fixture { session, server, api }
}

impl Fixture {
    async fn start(&mut self) -> ServerConn {
        self.session.start().await;
        let conn = self.server.accept().await.unwrap();
        self.wait_for(|v| v.connection_state() == ConnectionState::Connected).await;
        conn
    }

    async fn wait_for(&self, predicate: impl Fn(&ChatViewModel) -> bool) {
        let mut changes = self.session.changes();
        while !self.session.with_view(&predicate) {
            changes.changed().await.unwrap();
        }
    }

    fn check_invariants(&self, context: &str) {
        let snapshot = self.session.with_view(ViewSnapshot::from_view);
        InvariantRegistry::standard().assert_all(&snapshot, context);
    }
}

fn history(from: u64, to: u64, content: &str, millis: i64) -> HistoryMessage {
    HistoryMessage {
        from,
        to: Some(to),
        group_id: None,
        content: content.into(),
        timestamp: Timestamp::from_millis(millis),
    }
}

#[tokio::test(start_paused = true)]
async fn start_connects_and_seeds_online_users() {
    let mut f = fixture();
    f.api.set_online_users(vec![2, 3]);

    let _conn = f.start().await;

    let online: Vec<_> = f.session.view().online_users().iter().collect();
    assert_eq!(online, vec![2, 3]);
    assert!(f.session.manager().is_connected());
}

#[tokio::test(start_paused = true)]
async fn online_user_failure_leaves_set_empty() {
    let mut f = fixture();
    f.api.fail_online_users(ApiError::Status { status: 502 });

    let _conn = f.start().await;

    assert!(f.session.view().online_users().is_empty());
}

#[tokio::test(start_paused = true)]
async fn select_loads_history() {
    let mut f = fixture();
    let _conn = f.start().await;
    let conversation = Conversation::Private(PEER);
    f.api.set_history(conversation, vec![history(PEER, ME, "hey", 1_000), history(ME, PEER, "yo", 2_000)]);

    f.session.select(conversation).await;

    let view = f.session.view();
    assert_eq!(view.conversation(), &ConversationState::Active { conversation });
    let contents: Vec<_> = view.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hey", "yo"]);
    assert_eq!(f.api.history_requests(), vec![conversation]);
    f.check_invariants("after history load");
}

#[tokio::test(start_paused = true)]
async fn forbidden_history_starts_fresh_conversation() {
    let mut f = fixture();
    let _conn = f.start().await;
    let conversation = Conversation::Private(PEER);
    f.api.fail_history(conversation, ApiError::Status { status: 403 });

    f.session.select(conversation).await;

    let view = f.session.view();
    assert_eq!(view.conversation(), &ConversationState::Active { conversation });
    assert!(view.messages().is_empty());
    assert!(view.can_send());
}

#[tokio::test(start_paused = true)]
async fn failed_history_blocks_sending_until_retry() {
    let mut f = fixture();
    let mut conn = f.start().await;
    let conversation = Conversation::Group(3);
    f.api.fail_history(conversation, ApiError::Status { status: 500 });

    f.session.select(conversation).await;
    assert!(!f.session.view().can_send());
    assert!(f.session.view().status_message().is_some());

    f.session.send("too early").await;
    assert_eq!(f.session.take_alerts().len(), 1);
    assert!(conn.drain().is_empty());

    f.api.set_history(conversation, vec![]);
    f.session.retry().await;

    assert_eq!(f.session.view().conversation(), &ConversationState::Active { conversation });
    assert_eq!(f.api.history_requests(), vec![conversation, conversation]);
}

#[tokio::test(start_paused = true)]
async fn echo_replaces_optimistic_message() {
    let mut f = fixture();
    let mut conn = f.start().await;
    let conversation = Conversation::Private(PEER);
    f.session.select(conversation).await;

    f.session.send("hi").await;
    assert_eq!(f.session.view().pending().count(), 1);
    f.check_invariants("after compose");

    let sent: OutgoingMessage = serde_json::from_str(&conn.recv_text().await.unwrap()).unwrap();
    assert_eq!(sent.to, Some(PEER));
    assert!(sent.client_id.is_some());

    tokio::time::sleep(Duration::from_millis(300)).await;
    conn.push(&Frame::Private(PrivateMessage {
        from: ME,
        to: PEER,
        content: "hi".into(),
        timestamp: sent.timestamp.saturating_add(Duration::from_millis(300)),
        client_id: sent.client_id.clone(),
    }));
    f.wait_for(|v| v.pending().count() == 0).await;

    let view = f.session.view();
    assert_eq!(view.messages().len(), 1);
    assert!(!view.messages()[0].optimistic);
    f.check_invariants("after echo");
}

#[tokio::test(start_paused = true)]
async fn messages_for_other_conversations_are_not_shown() {
    let mut f = fixture();
    let conn = f.start().await;
    f.session.select(Conversation::Private(PEER)).await;

    conn.push(&Frame::Private(PrivateMessage {
        from: 4,
        to: ME,
        content: "elsewhere".into(),
        timestamp: Timestamp::from_millis(0),
        client_id: None,
    }));
    conn.push(&Frame::Broadcast(BroadcastMessage {
        from: None,
        content: "maintenance at noon".into(),
        timestamp: Timestamp::from_millis(0),
    }));
    f.wait_for(|v| !v.messages().is_empty()).await;

    let view = f.session.view();
    assert_eq!(view.messages().len(), 1);
    assert!(view.messages()[0].broadcast);
    f.check_invariants("after foreign message");
}

#[tokio::test(start_paused = true)]
async fn presence_notifications_update_online_users() {
    let mut f = fixture();
    let conn = f.start().await;

    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::UserConnected, Timestamp::from_millis(0)).with_user(5),
    ));
    f.wait_for(|v| v.online_users().contains(5)).await;

    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::UserDisconnected, Timestamp::from_millis(0)).with_user(5),
    ));
    f.wait_for(|v| !v.online_users().contains(5)).await;
}

#[tokio::test(start_paused = true)]
async fn follow_notifications_fill_the_feed() {
    let mut f = fixture();
    let conn = f.start().await;
    let mut changes = f.session.changes();

    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::FollowRequest, Timestamp::from_millis(0)).with_from(4),
    ));
    changes.changed().await.unwrap();

    assert_eq!(f.session.feed().items().len(), 1);
    assert_eq!(f.session.feed().unread_count(), 1);

    f.session.mark_read().await.unwrap();

    assert_eq!(f.session.feed().unread_count(), 0);
    assert_eq!(f.api.mark_read_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_mark_read_keeps_items_unread() {
    let mut f = fixture();
    let conn = f.start().await;
    let mut changes = f.session.changes();
    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::Follow, Timestamp::from_millis(0)).with_from(4),
    ));
    changes.changed().await.unwrap();
    f.api.fail_mark_read(ApiError::Status { status: 500 });

    assert!(f.session.mark_read().await.is_err());
    assert_eq!(f.session.feed().unread_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn sending_offline_raises_an_alert() {
    let f = fixture();
    let conversation = Conversation::Private(PEER);
    f.session.select(conversation).await;

    f.session.send("anyone?").await;

    let alerts = f.session.take_alerts();
    assert_eq!(alerts, vec!["You are offline. The message was not sent.".to_string()]);
    assert!(f.session.take_alerts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connection_loss_is_reflected_in_view() {
    let mut f = fixture();
    let conn = f.start().await;

    conn.close(Some(1006));
    f.wait_for(|v| v.connection_state() == ConnectionState::Disconnected).await;

    let _again = f.server.accept().await.unwrap();
    f.wait_for(|v| v.connection_state() == ConnectionState::Connected).await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_connection() {
    let mut f = fixture();
    let mut conn = f.start().await;

    f.session.shutdown().await;

    assert_eq!(conn.recv().await, Some(kith_harness::ClientOutput::Close(1000)));
}
