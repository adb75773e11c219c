//! # InstanceSupervisor: starts, tracks and stops groups of workload instances.
//!
//! The [`InstanceSupervisor`] owns the event bus and the subscriber fan-out for
//! one invocation. It turns a [`WorkloadFactory`] and a count into a
//! [`SupervisionGroup`] and later brings that group down again.
//!
//! ## High-level architecture
//! ```text
//! start_group(name, factory, N):
//!   validate N (> 0)
//!   for id in 1..=N:
//!       factory.create() ──► InstanceHandle{id, Starting}
//!       JoinSet.spawn(runner::start_instance(workload, ctx{id, child token}))
//!   await every start attempt ──► Running | Failed per handle
//!
//! stop_group(&mut group):
//!   group token.cancel()            (broadcast to every instance)
//!   JoinSet.spawn(runner::stop_instance) per Running instance
//!   timeout(stop_timeout, join all):
//!       ├─ Ok      → Stopped / Failed(Stop) per result, publish AllStoppedWithin
//!       └─ elapsed → leftovers Failed(StopTimeout), abort, publish StopTimeoutExceeded
//!
//! Event flow:
//!   runner / supervisor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - Start is **not atomic**: a failed instance never rolls back started ones
//! - `start_group` returns only after all N attempts resolved; no handle stays `Starting`
//! - `stop_group` always returns within `stop_timeout` (plus scheduling slack)
//! - `stop_group` is idempotent
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use deployvisor::{
//!     InstanceContext, InstanceState, InstanceSupervisor, SupervisorConfig, Workload,
//!     WorkloadError, WorkloadFactory,
//! };
//!
//! #[derive(Default)]
//! struct Noop;
//!
//! #[async_trait::async_trait]
//! impl Workload for Noop {
//!     async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
//!     async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::default();
//!     cfg.stop_timeout = Duration::from_secs(5);
//!     let sup = InstanceSupervisor::builder(cfg).build();
//!
//!     let mut group = sup.start_group("noop", &WorkloadFactory::of::<Noop>(), 3).await?;
//!     assert_eq!(group.running(), 3);
//!
//!     let report = sup.stop_group(&mut group).await;
//!     assert!(report.is_clean());
//!     assert!(group.states().iter().all(|s| *s == InstanceState::Stopped));
//!
//!     sup.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc},
    task::{JoinHandle, JoinSet},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::core::{
    builder::SupervisorBuilder,
    config::SupervisorConfig,
    group::{InstanceHandle, InstanceState, SupervisionGroup},
    runner::{publish_failed, start_instance, stop_instance},
};
use crate::{
    error::{InstanceError, LaunchError},
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    workloads::{InstanceContext, WorkloadFactory},
};

/// Outcome of one [`InstanceSupervisor::stop_group`] call.
///
/// An idempotent second call returns an empty report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Instances that acknowledged the stop, sorted by id.
    pub stopped: Vec<u32>,
    /// Instances that failed to stop (error or timeout), sorted by id.
    pub failed: Vec<InstanceError>,
}

impl StopReport {
    /// True if no instance failed to stop.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Starts, tracks and stops supervision groups; publishes lifecycle events.
pub struct InstanceSupervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    listener_stop: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl InstanceSupervisor {
    /// Returns a builder for a supervisor with the given config.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Wires the supervisor and spawns the event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        feed: mpsc::UnboundedReceiver<Event>,
        subs: SubscriberSet,
    ) -> Self {
        let listener_stop = CancellationToken::new();
        let listener = spawn_listener(feed, subs, listener_stop.clone());
        Self {
            cfg,
            bus,
            listener_stop,
            listener: Some(listener),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Raw receiver on the event bus (sees events published after this call).
    ///
    /// Bounded by `bus_capacity` and may lag; subscribers registered on the
    /// builder receive every event instead.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Creates `count` instances with `factory` and starts them concurrently.
    ///
    /// Returns once every start attempt resolved. Fails only on an invalid
    /// count; per-instance failures are recorded on the returned group.
    pub async fn start_group(
        &self,
        name: &str,
        factory: &WorkloadFactory,
        count: i64,
    ) -> Result<SupervisionGroup, LaunchError> {
        let requested = validate_count(count)?;
        let name: Arc<str> = Arc::from(name);

        self.bus.publish(
            Event::new(EventKind::GroupStarting)
                .with_workload(Arc::clone(&name))
                .with_count(requested as usize),
        );

        let group_token = CancellationToken::new();
        let mut group =
            SupervisionGroup::new(Arc::clone(&name), requested as usize, group_token.clone());
        let mut set = JoinSet::new();

        for id in 1..=requested {
            let workload = factory.create();
            let token = group_token.child_token();
            let ctx = InstanceContext::new(id, Arc::clone(&name), token.clone());

            let attempt = start_instance(
                Arc::clone(&workload),
                ctx,
                self.cfg.start_timeout(),
                self.bus.clone(),
            );
            set.spawn(async move { (id, attempt.await) });
            group.push(InstanceHandle::new(id, workload, token));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    if let Some(h) = group.get_mut(id) {
                        h.mark_running();
                    }
                }
                Ok((id, Err(e))) => {
                    tracing::warn!(
                        workload = %name,
                        instance = id,
                        error = %e,
                        label = e.as_label(),
                        "instance failed to start"
                    );
                    if let Some(h) = group.get_mut(id) {
                        h.mark_failed(e);
                    }
                }
                Err(join_err) => {
                    tracing::error!(
                        workload = %name,
                        error = %join_err,
                        "start task did not complete"
                    );
                }
            }
        }

        // A start task that never reported back counts as a failed start.
        for h in group.handles_mut() {
            if h.state() == InstanceState::Starting {
                let e = InstanceError::StartPanicked { id: h.id() };
                publish_failed(&self.bus, &name, &e);
                h.mark_failed(e);
            }
        }

        tracing::info!(
            workload = %name,
            requested,
            running = group.running(),
            failed = group.failed(),
            "start phase complete"
        );
        self.bus.publish(
            Event::new(EventKind::GroupStarted)
                .with_workload(name)
                .with_count(group.running()),
        );
        Ok(group)
    }

    /// Stops every running instance of `group` concurrently.
    ///
    /// Waits at most `stop_timeout`; instances still busy after that are
    /// marked `Failed` with [`InstanceError::StopTimeout`] and abandoned.
    pub async fn stop_group(&self, group: &mut SupervisionGroup) -> StopReport {
        if !group.begin_stop() {
            return StopReport::default();
        }

        let name = group.name_arc();
        let timeout = self.cfg.stop_timeout;
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_workload(Arc::clone(&name)));
        group.token().cancel();

        let mut set = JoinSet::new();
        let mut stop_tokens = Vec::new();
        for h in group.handles() {
            if h.state() != InstanceState::Running {
                continue;
            }
            let id = h.id();
            let token = CancellationToken::new();
            let ctx = InstanceContext::new(id, Arc::clone(&name), token.clone());
            let attempt = stop_instance(Arc::clone(h.workload()), ctx, self.bus.clone());
            set.spawn(async move { (id, attempt.await) });
            stop_tokens.push(token);
        }

        let mut outcomes = Vec::with_capacity(set.len());
        let within = time::timeout(timeout, async {
            while let Some(joined) = set.join_next().await {
                if let Ok(outcome) = joined {
                    outcomes.push(outcome);
                }
            }
        })
        .await
        .is_ok();

        let mut report = StopReport::default();
        for (id, res) in outcomes {
            let Some(h) = group.get_mut(id) else { continue };
            match res {
                Ok(()) => {
                    h.mark_stopped();
                    report.stopped.push(id);
                }
                Err(e) => {
                    tracing::warn!(
                        workload = %name,
                        instance = id,
                        error = %e,
                        "instance failed to stop"
                    );
                    h.mark_failed(e.clone());
                    report.failed.push(e);
                }
            }
        }

        if !within {
            for token in &stop_tokens {
                token.cancel();
            }
            set.abort_all();
        }

        let mut abandoned = 0usize;
        for h in group.handles_mut() {
            if h.state() != InstanceState::Running {
                continue;
            }
            let e = if within {
                InstanceError::Stop {
                    id: h.id(),
                    error: "stop task aborted".to_string(),
                }
            } else {
                InstanceError::StopTimeout { id: h.id(), timeout }
            };
            tracing::warn!(workload = %name, instance = h.id(), error = %e, "instance abandoned");
            publish_failed(&self.bus, &name, &e);
            h.mark_failed(e.clone());
            report.failed.push(e);
            abandoned += 1;
        }

        if within {
            self.bus
                .publish(Event::new(EventKind::AllStoppedWithin).with_workload(name));
        } else {
            self.bus.publish(
                Event::new(EventKind::StopTimeoutExceeded)
                    .with_workload(name)
                    .with_count(abandoned)
                    .with_timeout(timeout),
            );
        }

        report.stopped.sort_unstable();
        report.failed.sort_by_key(InstanceError::instance_id);
        report
    }

    /// Waits until every running instance of `group` finished on its own.
    ///
    /// Each instance that finishes is marked `Stopped`. Cancel-safe: dropping
    /// the future keeps the transitions already applied.
    pub async fn wait_closed(&self, group: &mut SupervisionGroup) {
        let name = group.name_arc();
        let mut set = JoinSet::new();
        for h in group.handles() {
            if h.state() == InstanceState::Running {
                let id = h.id();
                let workload = Arc::clone(h.workload());
                set.spawn(async move {
                    workload.closed().await;
                    id
                });
            }
        }

        while let Some(joined) = set.join_next().await {
            let Ok(id) = joined else { continue };
            if let Some(h) = group.get_mut(id) {
                if h.state() == InstanceState::Running {
                    h.mark_stopped();
                    self.bus.publish(
                        Event::new(EventKind::InstanceClosed)
                            .with_workload(Arc::clone(&name))
                            .with_instance(id),
                    );
                }
            }
        }
    }

    /// Flushes pending events to subscribers and stops the listener.
    pub async fn shutdown(mut self) {
        self.listener_stop.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }
}

impl Drop for InstanceSupervisor {
    fn drop(&mut self) {
        self.listener_stop.cancel();
    }
}

pub(crate) fn validate_count(count: i64) -> Result<u32, LaunchError> {
    if count <= 0 {
        return Err(LaunchError::InvalidInstanceCount { count });
    }
    u32::try_from(count).map_err(|_| LaunchError::InvalidArgument {
        reason: format!("instance count {count} is too large"),
    })
}

/// Forwards bus events to the subscriber set until `stop` fires, then drains
/// what is already queued and waits for the subscriber workers.
fn spawn_listener(
    mut feed: mpsc::UnboundedReceiver<Event>,
    subs: SubscriberSet,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = feed.recv() => match msg {
                    Some(ev) => subs.deliver(ev).await,
                    None => break,
                },
                _ = stop.cancelled() => {
                    while let Ok(ev) = feed.try_recv() {
                        subs.deliver(ev).await;
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    })
}
