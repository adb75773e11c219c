//! # Event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which gives every subscriber its own bounded
//! queue and worker task.
//!
//! ## Architecture
//! ```text
//! deliver(event) / emit(notice)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Lifecycle events are never dropped**: `deliver()` waits for queue room
//! - **Subscriber notices are best-effort**: `emit()` uses `try_send`; on a full
//!   queue the notice is dropped for that subscriber and `SubscriberOverflow` published
//! - **No feedback loops**: a notice is never queued to the subscriber it is about,
//!   and an overflow notice never causes another one
//! - **Isolation**: a panicking subscriber doesn't affect others
//! - **No cross-subscriber ordering**; per-subscriber FIFO

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());

                    let res = std::panic::AssertUnwindSafe(fut).catch_unwind().await;
                    if let Err(panic_err) = res {
                        let info = panic_message(panic_err.as_ref());
                        tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Delivers `event` to every subscriber, waiting for queue room.
    ///
    /// Subscriber notices are routed through [`SubscriberSet::emit`] instead.
    /// A subscriber that stops draining its queue stalls delivery.
    pub async fn deliver(&self, event: Event) {
        if event.kind.is_subscriber_notice() {
            self.emit(event);
            return;
        }
        let event = Arc::new(event);
        for channel in &self.channels {
            if channel.sender.send(Arc::clone(&event)).await.is_err() {
                tracing::debug!(subscriber = channel.name, seq = event.seq, "subscriber gone");
            }
        }
    }

    /// Offers `event` to every subscriber without waiting.
    ///
    /// On a full or closed queue the event is dropped for that subscriber and
    /// `SubscriberOverflow` is published, unless the event is itself an overflow
    /// notice. Notices skip the subscriber they are about.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);
        let origin = event
            .kind
            .is_subscriber_notice()
            .then(|| event.workload.clone())
            .flatten();

        for channel in &self.channels {
            if origin.as_deref() == Some(channel.name) {
                continue;
            }
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            tracing::debug!(subscriber = channel.name, reason, seq = event.seq, "event dropped");
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits until every worker drained its backlog.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    /// Counts events slowly through a one-slot queue.
    #[derive(Default)]
    struct Narrow(AtomicUsize);

    #[async_trait]
    impl Subscribe for Narrow {
        async fn on_event(&self, _ev: &Event) {
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "narrow"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn delivers_every_event_to_every_subscriber() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![a.clone(), b.clone()];
        let set = SubscriberSet::new(subs, Bus::new(16));
        assert_eq!(set.len(), 2);

        for _ in 0..3 {
            set.deliver(Event::new(EventKind::InstanceRunning)).await;
        }
        set.shutdown().await;

        assert_eq!(a.0.load(Ordering::SeqCst), 3);
        assert_eq!(b.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn deliver_waits_for_room_instead_of_dropping() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let narrow = Arc::new(Narrow::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![narrow.clone()];
        let set = SubscriberSet::new(subs, bus);

        for id in 1..=50 {
            let ev = Event::new(EventKind::InstanceRunning).with_instance(id);
            set.deliver(ev).await;
        }
        set.shutdown().await;

        assert_eq!(narrow.0.load(Ordering::SeqCst), 50);
        assert!(rx.try_recv().is_err(), "no overflow expected");
    }

    #[tokio::test]
    async fn full_queue_publishes_one_overflow_notice_without_looping() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let narrow = Arc::new(Narrow::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![narrow.clone()];
        let set = SubscriberSet::new(subs, bus);

        // The worker has not run yet: the first event fills the single slot.
        set.emit(Event::new(EventKind::InstanceStarting));
        set.emit(Event::new(EventKind::InstanceRunning));

        let notice = rx.try_recv().expect("overflow notice");
        assert_eq!(notice.kind, EventKind::SubscriberOverflow);
        assert_eq!(notice.workload.as_deref(), Some("narrow"));
        assert_eq!(notice.reason.as_deref(), Some("full"));

        // Feeding the notice back in neither reaches the full queue nor
        // produces a second notice.
        set.emit(notice.clone());
        set.deliver(notice).await;
        assert!(rx.try_recv().is_err());

        set.shutdown().await;
        assert_eq!(narrow.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_subscriber_is_reported_and_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let counter = Arc::new(Counter::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicker), counter.clone()];
        let set = SubscriberSet::new(subs, bus);

        set.deliver(Event::new(EventKind::InstanceStarting)).await;

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic event in time")
            .expect("bus open");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.workload.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));

        // The notice reaches the others but not the subscriber that panicked.
        set.deliver(ev).await;
        set.shutdown().await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(rx.try_recv().is_err(), "no second panic notice");
    }
}
