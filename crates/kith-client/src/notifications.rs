//! Notification dispatcher.
//!
//! Narrows the `notification` frame stream to per-subtype subscriptions, so
//! the online-user tracker and the activity feed each see only what they
//! care about.

use kith_core::{Environment, EventBus, HandlerError, Subscription};
use kith_proto::{Frame, FrameKind, Notification, NotificationKind, UserId};

use crate::{api::ChatApi, manager::ConnectionManager};

/// Routes notifications to handlers keyed by subtype.
#[derive(Debug, Default)]
pub struct NotificationDispatcher {
    bus: EventBus<NotificationKind, Notification>,
    attachment: Option<Subscription>,
}

impl NotificationDispatcher {
    /// Dispatcher with no subscribers, not attached to any connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive `notification` frames from `manager`.
    ///
    /// Replaces any previous attachment. Detaches when the dispatcher is
    /// dropped.
    pub fn attach<E: Environment>(&mut self, manager: &ConnectionManager<E>) {
        let bus = self.bus.clone();
        let subscription = manager.subscribe(FrameKind::Notification, move |frame| {
            route(&bus, frame);
            Ok(())
        });
        self.attachment = Some(subscription);
    }

    /// Whether the dispatcher is receiving frames from a connection.
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Register a handler for notifications of `subtype`.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, subtype: NotificationKind, handler: F) -> Subscription
    where
        F: Fn(&Notification) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.bus.subscribe(subtype, handler)
    }

    /// Dispatch `frame` to the handlers of its subtype.
    ///
    /// Frames that are not notifications are ignored. Returns the number of
    /// handlers invoked.
    pub fn handle_notification(&self, frame: &Frame) -> usize {
        route(&self.bus, frame)
    }

    /// Fetch the online-user snapshot.
    ///
    /// On failure the error is logged and the result is empty. Empty means
    /// unknown, not nobody online.
    pub async fn load_online_users<A: ChatApi>(&self, api: &A) -> Vec<UserId> {
        match api.online_users().await {
            Ok(users) => {
                tracing::debug!(count = users.len(), "online users loaded");
                users
            },
            Err(error) => {
                tracing::warn!(%error, "failed to load online users");
                Vec::new()
            },
        }
    }

    /// Number of handlers registered for `subtype`.
    pub fn handler_count(&self, subtype: &NotificationKind) -> usize {
        self.bus.handler_count(subtype)
    }
}

fn route(bus: &EventBus<NotificationKind, Notification>, frame: &Frame) -> usize {
    let Frame::Notification(notification) = frame else {
        return 0;
    };

    let delivered = bus.dispatch(&notification.subtype, notification);
    if delivered == 0 {
        tracing::debug!(subtype = %notification.subtype, "no handler for notification");
    }
    delivered
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use kith_proto::{BroadcastMessage, Timestamp};

    use super::*;

    fn notification(subtype: NotificationKind) -> Frame {
        Frame::Notification(Notification::new(subtype, Timestamp::from_millis(0)).with_user(4))
    }

    fn counter(dispatcher: &NotificationDispatcher, subtype: NotificationKind) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&hits);
        let sub = dispatcher.subscribe(subtype, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (hits, sub)
    }

    #[test]
    fn routes_by_exact_subtype() {
        let dispatcher = NotificationDispatcher::new();
        let (connected, _a) = counter(&dispatcher, NotificationKind::UserConnected);
        let (follows, _b) = counter(&dispatcher, NotificationKind::Follow);

        assert_eq!(dispatcher.handle_notification(&notification(NotificationKind::UserConnected)), 1);
        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(follows.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ignores_other_frame_kinds() {
        let dispatcher = NotificationDispatcher::new();
        let (hits, _sub) = counter(&dispatcher, NotificationKind::UserConnected);

        let frame = Frame::Broadcast(BroadcastMessage {
            from: None,
            content: "maintenance".into(),
            timestamp: Timestamp::from_millis(0),
        });
        assert_eq!(dispatcher.handle_notification(&frame), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_subtype_without_subscribers_is_dropped() {
        let dispatcher = NotificationDispatcher::new();
        let frame = notification(NotificationKind::Other("post_liked".into()));
        assert_eq!(dispatcher.handle_notification(&frame), 0);
    }

    #[test]
    fn unknown_subtype_with_subscriber_is_delivered() {
        let dispatcher = NotificationDispatcher::new();
        let (hits, _sub) = counter(&dispatcher, NotificationKind::Other("post_liked".into()));
        dispatcher.handle_notification(&notification(NotificationKind::Other("post_liked".into())));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let dispatcher = NotificationDispatcher::new();
        let (hits, sub) = counter(&dispatcher, NotificationKind::FollowRequest);
        drop(sub);

        dispatcher.handle_notification(&notification(NotificationKind::FollowRequest));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.handler_count(&NotificationKind::FollowRequest), 0);
    }
}
