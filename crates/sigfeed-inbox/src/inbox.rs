//! Inbox state machine.
//!
//! States: closed with unread events, closed and empty, open.
//!
//! - Event arrives: append and increment unread, whatever the state.
//! - Open (closed -> open): unread goes to 0; the list is kept.
//! - Close (open -> closed) with a non-empty list: the list is cleared,
//!   since every entry has been on screen. Unread is left alone; only an
//!   open resets it. Closing with an empty list only clears the open flag,
//!   and closing an already closed inbox changes nothing.
//!
//! Entries are keyed by `(signal id, kind, timestamp)` for rendering. The
//! inbox never deduplicates.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use sigfeed_core::{NotificationEvent, PushMessage};
use sigfeed_telemetry::Metrics;
use sigfeed_ws::{PushChannel, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Published view of the inbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InboxSnapshot {
    pub events: Vec<NotificationEvent>,
    pub unread: usize,
    pub is_open: bool,
}

#[derive(Debug, Default)]
struct InboxState {
    events: Vec<NotificationEvent>,
    unread: usize,
    is_open: bool,
}

impl InboxState {
    fn snapshot(&self) -> InboxSnapshot {
        InboxSnapshot {
            events: self.events.clone(),
            unread: self.unread,
            is_open: self.is_open,
        }
    }
}

/// Notification inbox. The only writer of its event list.
#[derive(Debug)]
pub struct NotificationInbox {
    state: Mutex<InboxState>,
    tx: watch::Sender<InboxSnapshot>,
}

impl Default for NotificationInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationInbox {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(InboxSnapshot::default());
        Self {
            state: Mutex::new(InboxState::default()),
            tx,
        }
    }

    /// Append an event and bump the unread counter.
    pub fn push_event(&self, event: NotificationEvent) {
        let mut state = self.state.lock();
        debug!(
            signal_id = %event.signal_id,
            kind = ?event.kind,
            is_open = state.is_open,
            "Notification received"
        );
        state.events.push(event);
        state.unread += 1;
        self.publish(&state);
    }

    /// Turn a push message into an event, if it describes one.
    ///
    /// Returns `true` if an event was appended.
    pub fn ingest(&self, msg: &PushMessage) -> bool {
        if !msg.kind.is_signal_change() {
            return false;
        }
        match NotificationEvent::from_push(msg, Utc::now()) {
            Some(event) => {
                self.push_event(event);
                true
            }
            None => {
                warn!(
                    kind = %msg.kind,
                    "Dropping push message without signal id, pair or direction"
                );
                false
            }
        }
    }

    /// Open the inbox: every held event becomes read.
    ///
    /// Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_open {
            return false;
        }
        state.is_open = true;
        state.unread = 0;
        debug!(events = state.events.len(), "Inbox opened");
        self.publish(&state);
        true
    }

    /// Close the inbox, discarding the events that were shown.
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_open {
            return false;
        }
        state.is_open = false;
        if !state.events.is_empty() {
            debug!(cleared = state.events.len(), "Inbox closed, events consumed");
            state.events.clear();
        }
        self.publish(&state);
        true
    }

    pub fn snapshot(&self) -> InboxSnapshot {
        self.state.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<InboxSnapshot> {
        self.tx.subscribe()
    }

    pub fn unread(&self) -> usize {
        self.state.lock().unread
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }

    /// Feed the inbox from a push channel for as long as the returned
    /// subscription is held.
    pub fn attach(self: &Arc<Self>, channel: &dyn PushChannel) -> Subscription {
        let inbox = Arc::downgrade(self);
        channel.subscribe(Arc::new(move |msg: &PushMessage| {
            if let Some(inbox) = inbox.upgrade() {
                inbox.ingest(msg);
            }
        }))
    }

    fn publish(&self, state: &InboxState) {
        Metrics::inbox_unread(state.unread);
        self.tx.send_replace(state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use serde_json::json;
    use sigfeed_core::{Direction, NotificationKind, PushKind, SignalId};
    use sigfeed_ws::PushBus;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    fn event(id: i64, kind: NotificationKind, secs: i64) -> NotificationEvent {
        NotificationEvent {
            kind,
            signal_id: SignalId::new(id),
            pair: "BTCUSDT".into(),
            direction: Direction::Long,
            strategy: None,
            timeframe: Some("4h".into()),
            quality_score: None,
            timestamp: at(secs),
        }
    }

    #[test]
    fn test_open_close_after_two_events_empties_inbox() {
        let inbox = NotificationInbox::new();
        inbox.push_event(event(1, NotificationKind::NewSignal, 0));
        inbox.push_event(event(2, NotificationKind::AiAnalysisComplete, 1));
        assert_eq!(inbox.unread(), 2);

        assert!(inbox.open());
        let opened = inbox.snapshot();
        assert_eq!(opened.unread, 0);
        assert_eq!(opened.events.len(), 2);

        assert!(inbox.close());
        assert_eq!(
            inbox.snapshot(),
            InboxSnapshot {
                events: vec![],
                unread: 0,
                is_open: false
            }
        );
    }

    #[test]
    fn test_close_when_already_closed_is_noop() {
        let inbox = NotificationInbox::new();
        inbox.push_event(event(1, NotificationKind::NewSignal, 0));
        let before = inbox.snapshot();

        assert!(!inbox.close());
        assert_eq!(inbox.snapshot(), before);
        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn test_close_with_empty_list_keeps_state() {
        let inbox = NotificationInbox::new();
        inbox.open();
        assert!(inbox.close());
        assert_eq!(inbox.snapshot(), InboxSnapshot::default());
    }

    #[test]
    fn test_event_while_open_increments_until_next_open() {
        let inbox = NotificationInbox::new();
        inbox.open();
        inbox.push_event(event(3, NotificationKind::NewSignal, 0));
        assert_eq!(inbox.unread(), 1);
        assert_eq!(inbox.snapshot().events.len(), 1);

        // Re-opening an open inbox is not a transition.
        assert!(!inbox.open());
        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn test_close_keeps_unread_from_events_received_while_open() {
        let inbox = NotificationInbox::new();
        inbox.open();
        inbox.push_event(event(4, NotificationKind::AiAnalysisComplete, 0));

        assert!(inbox.close());
        let closed = inbox.snapshot();
        assert!(closed.events.is_empty());
        assert_eq!(closed.unread, 1);
        assert!(!closed.is_open);

        assert!(inbox.open());
        assert_eq!(inbox.unread(), 0);
    }

    #[test]
    fn test_unread_never_decreases_while_closed() {
        let inbox = NotificationInbox::new();
        let mut last = 0;
        for i in 0..5 {
            inbox.push_event(event(i, NotificationKind::NewSignal, i));
            inbox.close();
            let unread = inbox.unread();
            assert!(unread > last);
            last = unread;
        }
    }

    #[test]
    fn test_duplicates_are_kept() {
        let inbox = NotificationInbox::new();
        let e = event(7, NotificationKind::AiAnalysisComplete, 5);
        inbox.push_event(e.clone());
        inbox.push_event(e.clone());
        let snap = inbox.snapshot();
        assert_eq!(snap.events.len(), 2);
        assert_eq!(snap.events[0].key(), snap.events[1].key());
    }

    #[test]
    fn test_ingest_ignores_unrelated_and_malformed() {
        let inbox = NotificationInbox::new();
        let other = PushMessage::new(PushKind::Other("system:ping".into()), json!({}));
        let malformed = PushMessage::new(PushKind::SignalsNew, json!({"pair": "BTCUSDT"}));
        let good = PushMessage::new(
            PushKind::SignalsNew,
            json!({"signal_id": 1, "pair": "BTCUSDT", "direction": "LONG"}),
        );

        assert!(!inbox.ingest(&other));
        assert!(!inbox.ingest(&malformed));
        assert!(inbox.ingest(&good));
        assert_eq!(inbox.unread(), 1);
    }

    #[tokio::test]
    async fn test_attach_feeds_from_bus_and_publishes() {
        let bus = PushBus::new();
        let inbox = Arc::new(NotificationInbox::new());
        let mut rx = inbox.subscribe();
        let sub = inbox.attach(&bus);

        bus.publish(&PushMessage::new(
            PushKind::SignalsAiComplete,
            json!({"signal_id": 9, "pair": "ETHUSDT", "direction": "SHORT"}),
        ));
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.unread, 1);
        assert_eq!(snap.events[0].kind, NotificationKind::AiAnalysisComplete);

        drop(sub);
        bus.publish(&PushMessage::new(
            PushKind::SignalsNew,
            json!({"signal_id": 10, "pair": "ETHUSDT", "direction": "SHORT"}),
        ));
        assert_eq!(inbox.unread(), 1);
    }
}
