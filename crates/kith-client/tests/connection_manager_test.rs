//! Connection manager behavior against an in-memory server.
//!
//! Tests run on tokio's paused clock, so reconnect delays elapse instantly
//! and the instants recorded below are exact.

use std::{sync::Arc, time::Duration};

use kith_client::{
    ClientConfig, ConnectionManager, ConnectionState, NotificationDispatcher, SendError,
    SessionCredential, Transport, TransportError,
};
use kith_harness::{ClientOutput, MemoryServer, MemoryTransport, SIM_EPOCH, ServerConn, SimEnv};
use kith_proto::{
    BroadcastMessage, CorrelationId, Frame, FrameKind, GroupMessage, Notification,
    NotificationKind, OutgoingMessage, PrivateMessage, Timestamp,
};
use parking_lot::Mutex;
use tokio::{sync::mpsc, time::Instant};
use url::Url;

fn config() -> ClientConfig {
    ClientConfig::new(Url::parse("http://chat.test").unwrap())
}

fn spawn(config: &ClientConfig) -> (ConnectionManager<SimEnv>, MemoryServer) {
    let (transport, server) = MemoryTransport::pair();
    let manager = ConnectionManager::spawn(config, transport, SimEnv::with_seed(1)).unwrap();
    (manager, server)
}

/// Record every published status with the virtual time it happened.
fn record_status(
    manager: &ConnectionManager<SimEnv>,
) -> (Arc<Mutex<Vec<(ConnectionState, Instant)>>>, kith_client::Subscription) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = manager.subscribe(FrameKind::ConnectionStatus, move |frame| {
        if let Frame::ConnectionStatus(status) = frame {
            sink.lock().push((status.status, Instant::now()));
        }
        Ok(())
    });
    (log, sub)
}

async fn connected(manager: &ConnectionManager<SimEnv>, server: &mut MemoryServer) -> ServerConn {
    manager.connect();
    let conn = server.accept().await.unwrap();
    manager.status().wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
    conn
}

fn private(from: u64, to: u64, content: &str) -> Frame {
    Frame::Private(PrivateMessage {
        from,
        to,
        content: content.into(),
        timestamp: Timestamp::from_millis(0),
        client_id: None,
    })
}

#[tokio::test(start_paused = true)]
async fn rapid_connects_open_one_transport() {
    let (manager, mut server) = spawn(&config());

    manager.connect();
    manager.connect();
    manager.connect();
    let _conn = server.accept().await.unwrap();
    manager.status().wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
    manager.connect();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(server.open_count(), 1);
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn endpoint_carries_session_id() {
    let config = config().with_session(SessionCredential::new("abc123"));
    let (manager, mut server) = spawn(&config);

    let conn = connected(&manager, &mut server).await;

    assert_eq!(conn.url().as_str(), "ws://chat.test/ws?session_id=abc123");
    assert_eq!(server.opened_urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn frames_are_dispatched_by_kind() {
    let (manager, mut server) = spawn(&config());
    let (tx, mut private_rx) = mpsc::unbounded_channel();
    let _private = manager.subscribe(FrameKind::Private, move |frame| {
        let _ = tx.send(frame.clone());
        Ok(())
    });
    let (tx, mut group_rx) = mpsc::unbounded_channel();
    let _group = manager.subscribe(FrameKind::Group, move |frame| {
        let _ = tx.send(frame.clone());
        Ok(())
    });

    let conn = connected(&manager, &mut server).await;
    conn.push(&private(9, 7, "hello"));
    conn.push(&Frame::Group(GroupMessage {
        from: 9,
        group_id: 3,
        content: "all".into(),
        timestamp: Timestamp::from_millis(0),
        client_id: None,
    }));

    assert_eq!(private_rx.recv().await.unwrap(), private(9, 7, "hello"));
    assert!(matches!(group_rx.recv().await.unwrap(), Frame::Group(g) if g.group_id == 3));
    assert!(private_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn handlers_run_in_arrival_order() {
    let (manager, mut server) = spawn(&config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = manager.subscribe(FrameKind::Broadcast, move |frame| {
        if let Frame::Broadcast(b) = frame {
            let _ = tx.send(b.content.clone());
        }
        Ok(())
    });

    let conn = connected(&manager, &mut server).await;
    for n in 0..5 {
        conn.push(&Frame::Broadcast(BroadcastMessage {
            from: None,
            content: n.to_string(),
            timestamp: Timestamp::from_millis(0),
        }));
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(rx.recv().await.unwrap());
    }
    assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_is_dropped_and_connection_survives() {
    let (manager, mut server) = spawn(&config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = manager.subscribe(FrameKind::Private, move |frame| {
        let _ = tx.send(frame.clone());
        Ok(())
    });

    let conn = connected(&manager, &mut server).await;
    conn.push_text("{not json");
    conn.push_text(r#"{"type":"private","from":"nine"}"#);
    conn.push(&private(9, 7, "still here"));

    assert_eq!(rx.recv().await.unwrap(), private(9, 7, "still here"));
    assert!(manager.is_connected());
    assert_eq!(server.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_status_frames_are_ignored() {
    let (manager, mut server) = spawn(&config());
    let (log, _sub) = record_status(&manager);

    let conn = connected(&manager, &mut server).await;
    conn.push_text(r#"{"type":"connection_status","status":"disconnected","timestamp":0}"#);
    conn.push(&private(9, 7, "sync"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let states: Vec<_> = log.lock().iter().map(|(s, _)| *s).collect();
    assert_eq!(states, vec![ConnectionState::Connecting, ConnectionState::Connected]);
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn status_is_published_once_per_change() {
    let (manager, mut server) = spawn(&config());
    let (log, _sub) = record_status(&manager);

    let conn = connected(&manager, &mut server).await;
    manager.connect();
    conn.close(Some(1000));
    manager.status().wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();
    manager.disconnect();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let states: Vec<_> = log.lock().iter().map(|(s, _)| *s).collect();
    assert_eq!(
        states,
        vec![ConnectionState::Connecting, ConnectionState::Connected, ConnectionState::Disconnected]
    );
}

#[tokio::test(start_paused = true)]
async fn reconnect_delays_double_until_budget_exhausted() {
    let (manager, server) = spawn(&config());
    let (log, _sub) = record_status(&manager);
    server.refuse_next(u32::MAX);

    manager.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;

    let opens: Vec<Instant> = log
        .lock()
        .iter()
        .filter(|(s, _)| *s == ConnectionState::Connecting)
        .map(|(_, at)| *at)
        .collect();
    let gaps: Vec<u64> = opens.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();

    assert_eq!(gaps, vec![1, 2, 4, 8, 10]);
    assert_eq!(server.open_count(), 6);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.reconnect_attempts(), 5);
}

#[tokio::test(start_paused = true)]
async fn manual_connect_after_exhaustion_restores_budget() {
    let (manager, mut server) = spawn(&config());
    server.refuse_next(6);

    manager.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(server.open_count(), 6);

    let _conn = connected(&manager, &mut server).await;

    assert_eq!(server.open_count(), 7);
    assert_eq!(manager.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn abnormal_close_reconnects_after_one_second() {
    let (manager, mut server) = spawn(&config());
    let conn = connected(&manager, &mut server).await;

    let closed_at = Instant::now();
    conn.close(Some(1006));
    let _again = server.accept().await.unwrap();

    assert_eq!(Instant::now() - closed_at, Duration::from_secs(1));
    manager.status().wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
    assert_eq!(manager.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_error_reconnects() {
    let (manager, mut server) = spawn(&config());
    let conn = connected(&manager, &mut server).await;

    conn.fail("reset by peer");
    let _again = server.accept().await.unwrap();

    assert_eq!(server.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn normal_close_does_not_reconnect() {
    let (manager, mut server) = spawn(&config());
    let conn = connected(&manager, &mut server).await;

    conn.close(Some(1000));
    manager.status().wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(server.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_reconnect_can_be_disabled() {
    let (manager, mut server) = spawn(&config().with_auto_reconnect(false));
    let conn = connected(&manager, &mut server).await;

    conn.close(Some(1006));
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(server.open_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_with_normal_code() {
    let (manager, mut server) = spawn(&config());
    let mut conn = connected(&manager, &mut server).await;

    manager.disconnect();

    assert_eq!(conn.recv().await, Some(ClientOutput::Close(1000)));
    manager.status().wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let (manager, server) = spawn(&config());
    server.refuse_next(1);

    manager.connect();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.open_count(), 1);
    manager.disconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(server.open_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn send_while_disconnected_is_refused() {
    let (manager, server) = spawn(&config());

    let result = manager.send(OutgoingMessage::private(9, "hi"));

    assert!(matches!(result, Err(SendError::NotConnected)));
    assert_eq!(server.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn force_disconnect_refuses_sends_immediately() {
    let (manager, mut server) = spawn(&config());
    let _conn = connected(&manager, &mut server).await;

    manager.force_disconnect();

    assert!(!manager.is_connected());
    assert!(matches!(manager.send(OutgoingMessage::broadcast("x")), Err(SendError::NotConnected)));
}

/// Transport whose handshake takes `delay` before reaching the server.
struct SlowTransport {
    inner: MemoryTransport,
    delay: Duration,
}

impl Transport for SlowTransport {
    type Link = <MemoryTransport as Transport>::Link;

    async fn open(&self, url: &Url) -> Result<Self::Link, TransportError> {
        tokio::time::sleep(self.delay).await;
        self.inner.open(url).await
    }
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_slow_open_never_reports_connected() {
    let (inner, mut server) = MemoryTransport::pair();
    let transport = SlowTransport { inner, delay: Duration::from_secs(5) };
    let manager = ConnectionManager::spawn(&config(), transport, SimEnv::with_seed(1)).unwrap();
    let (log, _sub) = record_status(&manager);

    manager.connect();
    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.force_disconnect();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let statuses: Vec<ConnectionState> = log.lock().iter().map(|(s, _)| *s).collect();
    assert_eq!(statuses, vec![ConnectionState::Connecting, ConnectionState::Disconnected]);
    assert!(!manager.is_connected());
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // The handshake still finished; that link is closed right away.
    let mut conn = server.try_accept().unwrap();
    assert_eq!(conn.recv().await, Some(ClientOutput::Close(1000)));
    assert_eq!(server.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_after_disconnect_supersedes_slow_open() {
    let (inner, mut server) = MemoryTransport::pair();
    let transport = SlowTransport { inner, delay: Duration::from_secs(5) };
    let manager = ConnectionManager::spawn(&config(), transport, SimEnv::with_seed(1)).unwrap();

    manager.connect();
    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.disconnect();
    manager.connect();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(server.open_count(), 1);
    assert!(server.try_accept().is_some());
    assert!(server.try_accept().is_none());
}

#[tokio::test(start_paused = true)]
async fn send_stamps_time_and_keeps_correlation_id() {
    let (manager, mut server) = spawn(&config());
    let mut conn = connected(&manager, &mut server).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let id = CorrelationId::from_u64(42);
    manager.send(OutgoingMessage::private(9, "hi").with_client_id(id.clone())).unwrap();

    let text = conn.recv_text().await.unwrap();
    let sent: OutgoingMessage = serde_json::from_str(&text).unwrap();
    assert_eq!(sent.kind, FrameKind::Private);
    assert_eq!(sent.to, Some(9));
    assert_eq!(sent.client_id, Some(id));
    assert_eq!(sent.timestamp, SIM_EPOCH.saturating_add(Duration::from_millis(1_500)));
}

#[tokio::test(start_paused = true)]
async fn send_message_builds_group_frame() {
    let (manager, mut server) = spawn(&config());
    let mut conn = connected(&manager, &mut server).await;

    manager.send_message(FrameKind::Group, "hey all", None, Some(3)).unwrap();

    let sent: OutgoingMessage = serde_json::from_str(&conn.recv_text().await.unwrap()).unwrap();
    assert_eq!(sent.kind, FrameKind::Group);
    assert_eq!(sent.group_id, Some(3));
    assert_eq!(sent.content, "hey all");
}

#[tokio::test(start_paused = true)]
async fn dropped_subscription_stops_delivery() {
    let (manager, mut server) = spawn(&config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = manager.subscribe(FrameKind::Private, move |frame| {
        let _ = tx.send(frame.clone());
        Ok(())
    });

    let conn = connected(&manager, &mut server).await;
    drop(sub);
    conn.push(&private(9, 7, "lost"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(rx.recv().await.is_none());
    assert_eq!(manager.bus().handler_count(&FrameKind::Private), 0);
}

#[tokio::test(start_paused = true)]
async fn dispatcher_routes_notifications_by_subtype() {
    let (manager, mut server) = spawn(&config());
    let mut dispatcher = NotificationDispatcher::new();
    dispatcher.attach(&manager);
    assert!(dispatcher.is_attached());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = dispatcher.subscribe(NotificationKind::UserConnected, move |n| {
        let _ = tx.send(n.subject());
        Ok(())
    });

    let conn = connected(&manager, &mut server).await;
    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::Follow, Timestamp::from_millis(0)).with_from(4),
    ));
    conn.push(&Frame::Notification(
        Notification::new(NotificationKind::UserConnected, Timestamp::from_millis(0)).with_user(12),
    ));

    assert_eq!(rx.recv().await.unwrap(), Some(12));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_link() {
    let (manager, mut server) = spawn(&config());
    let mut conn = connected(&manager, &mut server).await;

    manager.shutdown().await;

    assert_eq!(conn.recv().await, Some(ClientOutput::Close(1000)));
}
