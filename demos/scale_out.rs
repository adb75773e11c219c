//! # Example: scale_out
//!
//! Drives the [`InstanceSupervisor`] directly, without the command-line layer:
//! start a group, inspect per-instance state, stop it with a bounded timeout.
//!
//! One of the five workers ignores stop requests, so the stop report shows it
//! abandoned after `stop_timeout`.
//!
//! ## Run
//! ```bash
//! cargo run --example scale_out
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deployvisor::{
    InstanceContext, InstanceSupervisor, LogWriter, Subscribe, SupervisorConfig, Workload,
    WorkloadError, WorkloadFactory,
};

struct Worker {
    stubborn: bool,
}

#[async_trait]
impl Workload for Worker {
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        tokio::time::sleep(Duration::from_millis(50 * u64::from(ctx.id()))).await;
        Ok(())
    }

    async fn stop(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        if self.stubborn {
            // Holds on until the supervisor gives up on it.
            ctx.cancelled().await;
            return Err(WorkloadError::Canceled);
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = SupervisorConfig {
        stop_timeout: Duration::from_millis(500),
        ..SupervisorConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = InstanceSupervisor::builder(cfg).with_subscribers(subs).build();

    let created = Arc::new(AtomicU32::new(0));
    let factory = WorkloadFactory::new(move || Worker {
        stubborn: created.fetch_add(1, Ordering::Relaxed) == 2,
    });

    let mut group = sup.start_group("worker", &factory, 5).await?;
    for h in group.handles() {
        println!("worker #{} -> {}", h.id(), h.state());
    }

    let report = sup.stop_group(&mut group).await;
    println!("stopped: {:?}", report.stopped);
    for e in &report.failed {
        println!("not stopped: {e}");
    }

    sup.shutdown().await;
    Ok(())
}
