//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps two channels behind one non-blocking `publish()`:
//! - an unbounded feed to the supervisor's listener, which delivers every
//!   event to the subscribers (no lag, no loss);
//! - a bounded [`tokio::sync::broadcast`] ring for ad-hoc raw receivers
//!   ([`Bus::subscribe`]), which may lag.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Consumers:
//!   start task #1 ──┐
//!   start task #N ──┼──────► Bus ──┬──► listener feed (unbounded) ──► SubscriberSet
//!   stop tasks    ──┤              └──► broadcast ring (bounded)  ──► raw receivers
//!   supervisor    ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Lossless listener feed**: every published event reaches the listener in order.
//! - **Lossy raw receivers**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: raw receivers only see events published after they subscribed.

use tokio::sync::{broadcast, mpsc};

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds `Arc`-backed senders).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    feed: Option<mpsc::UnboundedSender<Event>>,
}

impl Bus {
    /// Creates a bus without a listener feed (raw receivers only).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx, feed: None }
    }

    /// Creates a bus plus the lossless receiving end for its listener.
    pub fn with_listener(capacity: usize) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (feed, rx) = mpsc::unbounded_channel();
        let mut bus = Self::new(capacity);
        bus.feed = Some(feed);
        (bus, rx)
    }

    /// Publishes an event to the listener and to all raw receivers.
    ///
    /// Events nobody receives are dropped.
    pub fn publish(&self, ev: Event) {
        if let Some(feed) = &self.feed {
            let _ = feed.send(ev.clone());
        }
        let _ = self.tx.send(ev);
    }

    /// Creates a new raw receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::GroupStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::GroupStarted).with_workload("http"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::GroupStarted);
        assert_eq!(ev.workload.as_deref(), Some("http"));
    }

    #[tokio::test]
    async fn listener_feed_keeps_everything_past_the_ring_capacity() {
        let (bus, mut feed) = Bus::with_listener(4);
        for id in 1..=100 {
            bus.publish(Event::new(EventKind::InstanceRunning).with_instance(id));
        }

        let mut ids = Vec::new();
        while let Ok(ev) = feed.try_recv() {
            ids.push(ev.instance.unwrap_or_default());
        }
        assert_eq!(ids, (1..=100).collect::<Vec<u32>>());
    }
}
