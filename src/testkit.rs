//! Test workloads and subscribers shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    Event, EventKind, InstanceContext, Subscribe, Workload, WorkloadError, WorkloadFactory,
};

/// Starts and stops immediately; counts both calls.
#[derive(Default)]
pub(crate) struct AlwaysStarts {
    pub(crate) starts: AtomicUsize,
    pub(crate) stops: AtomicUsize,
}

#[async_trait]
impl Workload for AlwaysStarts {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Start always fails.
pub(crate) struct FailsToStart;

#[async_trait]
impl Workload for FailsToStart {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Err(WorkloadError::fail("connection refused"))
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

/// Start never resolves.
pub(crate) struct HangsOnStart;

#[async_trait]
impl Workload for HangsOnStart {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        std::future::pending().await
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

/// Starts fine, then ignores stop requests.
pub(crate) struct HangsOnStop;

#[async_trait]
impl Workload for HangsOnStop {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        std::future::pending().await
    }
}

/// Starts fine and finishes on its own after `after`.
pub(crate) struct ClosesAfter {
    pub(crate) after: Duration,
}

#[async_trait]
impl Workload for ClosesAfter {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }

    async fn closed(&self) {
        tokio::time::sleep(self.after).await;
    }
}

/// Factory whose `n`-th created instance (1-based) fails to start; the others start.
pub(crate) fn fail_nth(n: usize) -> WorkloadFactory {
    let created = Arc::new(AtomicUsize::new(0));
    WorkloadFactory::new(move || {
        let k = created.fetch_add(1, Ordering::SeqCst) + 1;
        FlakyStart { fail: k == n }
    })
}

pub(crate) struct FlakyStart {
    fail: bool,
}

#[async_trait]
impl Workload for FlakyStart {
    async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        if self.fail {
            Err(WorkloadError::fail("address already in use"))
        } else {
            Ok(())
        }
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

/// Subscriber that keeps every event it sees.
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub(crate) async fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub(crate) async fn instances(&self, kind: EventKind) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.instance)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
