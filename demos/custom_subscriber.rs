//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for instance lifecycle metrics.
//! - Wire the subscriber into a [`Launcher`] in place of the default printer.
//!
//! ## Flow
//! ```text
//! Launcher::launch_until()
//!     └─► InstanceSupervisor::start_group()
//!           ├─► publish(GroupStarting)
//!           ├─► publish(InstanceStarting / InstanceRunning / InstanceFailed) per instance
//!           └─► publish(GroupStarted)
//!     ... shutdown ...
//!     └─► InstanceSupervisor::stop_group()
//!           ├─► publish(ShutdownRequested)
//!           ├─► publish(InstanceStopped / InstanceFailed) per instance
//!           └─► publish(AllStoppedWithin | StopTimeoutExceeded)
//!
//! Bus ──► listener ──► SubscriberSet ──► Tally.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use deployvisor::{
    Event, EventKind, InstanceContext, LaunchOutcome, Launcher, LauncherConfig, Registry,
    Subscribe, Workload, WorkloadError, WorkloadFactory,
};

/// Counts confirmations and failures, printing a line per instance event.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct Tally {
    running: AtomicUsize,
    failed: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        let workload = ev.workload.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::InstanceRunning => {
                self.running.fetch_add(1, Ordering::Relaxed);
                println!("[tally] up:      {workload}#{}", ev.instance.unwrap_or(0));
            }
            EventKind::InstanceFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[tally] failed:  {workload}#{} reason={}",
                    ev.instance.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::InstanceStopped | EventKind::InstanceClosed => {
                println!("[tally] down:    {workload}#{}", ev.instance.unwrap_or(0));
            }
            EventKind::GroupStarted => {
                println!(
                    "[tally] group:   {workload} running={}",
                    ev.count.unwrap_or(0)
                );
            }
            EventKind::StopTimeoutExceeded => {
                println!(
                    "[tally] timeout: {workload} abandoned={}",
                    ev.count.unwrap_or(0)
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}

/// Instance #3 fails to start; the rest come up.
#[derive(Default)]
struct Service;

#[async_trait::async_trait]
impl Workload for Service {
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        if ctx.id() == 3 {
            return Err(WorkloadError::fail("port already bound"));
        }
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let registry = Registry::from_entries([("service", WorkloadFactory::of::<Service>())])?;
    let tally = Arc::new(Tally::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![tally.clone()];
    let mut launcher = Launcher::new(registry, LauncherConfig::default()).with_subscribers(subs);

    let outcome = launcher
        .launch_until(["run", "service", "-instances", "4"], async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
        .await?;

    if let LaunchOutcome::Completed(report) = outcome {
        println!("\nstarted: {:?}", report.started);
        println!("finished: {:?}", report.finished);
    }
    println!(
        "running confirmations: {}, failures: {}",
        tally.running.load(Ordering::Relaxed),
        tally.failed.load(Ordering::Relaxed)
    );
    Ok(())
}
