//! # Runtime events emitted by the launcher and the instance supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Group events**: a supervision group starting and finishing its start phase
//! - **Instance events**: per-instance lifecycle (starting, running, failed, stopped)
//! - **Shutdown events**: stop requests and their outcome
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries the metadata: timestamp, workload name,
//! instance id, reason and timeout.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Instances start concurrently, so events of different instances interleave freely.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use deployvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::InstanceFailed)
//!     .with_workload("http")
//!     .with_instance(2)
//!     .with_reason("address in use");
//!
//! assert_eq!(ev.kind, EventKind::InstanceFailed);
//! assert_eq!(ev.workload.as_deref(), Some("http"));
//! assert_eq!(ev.instance, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `workload`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `workload`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Group events ===
    /// A supervision group is about to create its instances.
    ///
    /// Sets:
    /// - `workload`: workload name
    /// - `count`: requested instance count
    GroupStarting,

    /// Every start attempt of the group has resolved.
    ///
    /// Sets:
    /// - `workload`: workload name
    /// - `count`: number of instances that reached `Running`
    GroupStarted,

    // === Instance events ===
    /// `Workload::start` is being called for an instance.
    ///
    /// Sets:
    /// - `workload`, `instance`
    InstanceStarting,

    /// The instance started successfully. One per running instance; this is
    /// the operator-visible confirmation.
    ///
    /// Sets:
    /// - `workload`, `instance`
    InstanceRunning,

    /// The instance failed (start error, start timeout, stop error or stop timeout).
    ///
    /// Sets:
    /// - `workload`, `instance`
    /// - `reason`: error message
    /// - `timeout_ms`: set for timeouts
    InstanceFailed,

    /// The instance acknowledged a stop request.
    ///
    /// Sets:
    /// - `workload`, `instance`
    InstanceStopped,

    /// The instance finished on its own (no stop request).
    ///
    /// Sets:
    /// - `workload`, `instance`
    InstanceClosed,

    // === Shutdown events ===
    /// A stop of the whole group was requested (signal or caller).
    ///
    /// Sets:
    /// - `workload`: workload name
    ShutdownRequested,

    /// Every instance acknowledged stop within the stop timeout.
    ///
    /// Sets:
    /// - `workload`: workload name
    AllStoppedWithin,

    /// Stop timeout exceeded; some instances were abandoned.
    ///
    /// Sets:
    /// - `workload`: workload name
    /// - `count`: number of abandoned instances
    /// - `timeout_ms`: the stop timeout
    StopTimeoutExceeded,
}

impl EventKind {
    /// True for notices about the subscriber fan-out itself (overflow, panic).
    ///
    /// These are delivered best-effort; every other kind is delivered to each
    /// subscriber without loss.
    pub fn is_subscriber_notice(&self) -> bool {
        matches!(self, EventKind::SubscriberOverflow | EventKind::SubscriberPanicked)
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Workload name (or subscriber name for subscriber events).
    pub workload: Option<Arc<str>>,
    /// Instance sequence number within its group.
    pub instance: Option<u32>,
    /// Instance count (requested or running, see [`EventKind`]).
    pub count: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            workload: None,
            instance: None,
            count: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a workload name.
    #[inline]
    pub fn with_workload(mut self, name: impl Into<Arc<str>>) -> Self {
        self.workload = Some(name.into());
        self
    }

    /// Attaches an instance id.
    #[inline]
    pub fn with_instance(mut self, id: u32) -> Self {
        self.instance = Some(id);
        self
    }

    /// Attaches an instance count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_workload(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_workload(subscriber)
            .with_reason(info)
    }

    /// Returns the timeout as a [`Duration`], if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}
