//! # Single start / stop calls of one instance.
//!
//! Wraps one `Workload::start` or `Workload::stop` call with timeout, panic
//! isolation and event publishing. The supervisor spawns one of these per
//! instance so that calls of different instances run in parallel.
//!
//! ## Event flow
//! ```text
//! start:
//!   publish InstanceStarting → workload.start(ctx)
//!       ├─ Ok       → publish InstanceRunning
//!       ├─ Err      → publish InstanceFailed
//!       ├─ timeout  → cancel ctx → publish InstanceFailed (timeout_ms set)
//!       └─ panic    → publish InstanceFailed
//!
//! stop:
//!   workload.stop(ctx)
//!       ├─ Ok / Err(Canceled) → publish InstanceStopped
//!       ├─ Err                → publish InstanceFailed
//!       └─ panic              → publish InstanceFailed
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per call
//! - The stop timeout is applied by the caller over all stop calls together

use std::time::Duration;

use futures::FutureExt;
use tokio::time;

use crate::{
    error::{InstanceError, WorkloadError},
    events::{Bus, Event, EventKind},
    workloads::{InstanceContext, WorkloadRef},
};

/// Calls `start` once for the instance described by `ctx`.
///
/// On timeout the instance token is cancelled, so a workload that spawned
/// background work before hanging gets torn down.
pub(crate) async fn start_instance(
    workload: WorkloadRef,
    ctx: InstanceContext,
    timeout: Option<Duration>,
    bus: Bus,
) -> Result<(), InstanceError> {
    let id = ctx.id();
    let name = ctx.workload().to_string();
    let token = ctx.token().clone();

    bus.publish(
        Event::new(EventKind::InstanceStarting)
            .with_workload(name.as_str())
            .with_instance(id),
    );

    let call = std::panic::AssertUnwindSafe(workload.start(ctx)).catch_unwind();
    let res = match timeout {
        Some(dur) => match time::timeout(dur, call).await {
            Ok(r) => flatten_start(id, r),
            Err(_elapsed) => {
                token.cancel();
                Err(InstanceError::StartTimeout { id, timeout: dur })
            }
        },
        None => flatten_start(id, call.await),
    };

    match &res {
        Ok(()) => bus.publish(
            Event::new(EventKind::InstanceRunning)
                .with_workload(name.as_str())
                .with_instance(id),
        ),
        Err(e) => publish_failed(&bus, &name, e),
    }
    res
}

/// Calls `stop` once for the instance described by `ctx`.
///
/// A workload answering `Canceled` is treated as a graceful stop.
pub(crate) async fn stop_instance(
    workload: WorkloadRef,
    ctx: InstanceContext,
    bus: Bus,
) -> Result<(), InstanceError> {
    let id = ctx.id();
    let name = ctx.workload().to_string();

    let res = match std::panic::AssertUnwindSafe(workload.stop(ctx))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) | Ok(Err(WorkloadError::Canceled)) => Ok(()),
        Ok(Err(e)) => Err(InstanceError::Stop {
            id,
            error: e.to_string(),
        }),
        Err(_panic) => Err(InstanceError::Stop {
            id,
            error: "panicked".to_string(),
        }),
    };

    match &res {
        Ok(()) => bus.publish(
            Event::new(EventKind::InstanceStopped)
                .with_workload(name.as_str())
                .with_instance(id),
        ),
        Err(e) => publish_failed(&bus, &name, e),
    }
    res
}

/// Publishes `InstanceFailed` for `err`.
pub(crate) fn publish_failed(bus: &Bus, name: &str, err: &InstanceError) {
    let mut ev = Event::new(EventKind::InstanceFailed)
        .with_workload(name)
        .with_instance(err.instance_id())
        .with_reason(err.to_string());
    if let InstanceError::StartTimeout { timeout, .. }
    | InstanceError::StopTimeout { timeout, .. } = err
    {
        ev = ev.with_timeout(*timeout);
    }
    bus.publish(ev);
}

fn flatten_start(
    id: u32,
    res: Result<Result<(), WorkloadError>, Box<dyn std::any::Any + Send>>,
) -> Result<(), InstanceError> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(InstanceError::Start {
            id,
            error: e.to_string(),
        }),
        Err(_panic) => Err(InstanceError::StartPanicked { id }),
    }
}
