//! Fuzz target for the connection state machine
//!
//! # Invariants
//!
//! - A pending reconnect implies `Disconnected`
//! - Consecutive failures never exceed the attempt budget
//! - Close code 1000 never schedules a reconnect
//! - After `disconnect()`, nothing opens a transport until `connect()`

#![no_main]

use std::{ops::Add, time::Duration};

use arbitrary::Arbitrary;
use kith_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionState, NORMAL_CLOSURE};
use libfuzzer_sys::fuzz_target;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Millis(u64);

impl Add<Duration> for Millis {
    type Output = Millis;

    fn add(self, rhs: Duration) -> Millis {
        Millis(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

#[derive(Debug, Arbitrary)]
enum Event {
    Connect,
    Disconnect,
    Open,
    Error,
    Close(Option<u16>),
    Advance(u16),
}

fuzz_target!(|events: Vec<Event>| {
    let url = Url::parse("ws://chat.test/ws").expect("static url");
    let config = ConnectionConfig::default();
    let mut conn: Connection<Millis> = Connection::new(url, config);
    let mut now = Millis(0);
    let mut manual = false;

    for event in events {
        let actions = match event {
            Event::Connect => {
                manual = false;
                conn.connect()
            },
            Event::Disconnect => {
                manual = true;
                conn.disconnect()
            },
            Event::Open => conn.handle_open(),
            Event::Error => conn.handle_error(),
            Event::Close(code) => {
                let actions = conn.handle_close(code, now);
                if code == Some(NORMAL_CLOSURE) {
                    let scheduled = actions
                        .iter()
                        .any(|a| matches!(a, ConnectionAction::ReconnectScheduled { .. }));
                    assert!(!scheduled);
                }
                actions
            },
            Event::Advance(ms) => {
                now = now + Duration::from_millis(u64::from(ms));
                conn.tick(now)
            },
        };

        if manual {
            assert!(!actions.iter().any(|a| matches!(a, ConnectionAction::OpenTransport { .. })));
        }
        if conn.next_deadline().is_some() {
            assert_eq!(conn.state(), ConnectionState::Disconnected);
        }
        assert!(conn.attempts() <= config.policy.max_attempts);
    }
});
