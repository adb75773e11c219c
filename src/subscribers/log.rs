//! # LogWriter: operator-facing event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout. The
//! launcher installs it by default so that every started instance produces
//! one visible confirmation line.
//!
//! ## Example output
//! ```text
//! [group-starting] workload=http instances=4
//! [running] workload=http instance=#2
//! [failed] workload=http instance=#3 err="execution failed: address in use"
//! [group-started] workload=http running=3
//! [shutdown-requested] workload=http
//! [stopped] workload=http instance=#2
//! [all-stopped-within-timeout] workload=http
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let workload = e.workload.as_deref().unwrap_or("?");
        let instance = e.instance.unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::GroupStarting => {
                println!(
                    "[group-starting] workload={workload} instances={}",
                    e.count.unwrap_or_default()
                );
            }
            EventKind::GroupStarted => {
                println!(
                    "[group-started] workload={workload} running={}",
                    e.count.unwrap_or_default()
                );
            }
            EventKind::InstanceStarting => {
                println!("[starting] workload={workload} instance=#{instance}");
            }
            EventKind::InstanceRunning => {
                println!("[running] workload={workload} instance=#{instance}");
            }
            EventKind::InstanceFailed => {
                println!("[failed] workload={workload} instance=#{instance} err={reason:?}");
            }
            EventKind::InstanceStopped => {
                println!("[stopped] workload={workload} instance=#{instance}");
            }
            EventKind::InstanceClosed => {
                println!("[closed] workload={workload} instance=#{instance}");
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] workload={workload}");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-timeout] workload={workload}");
            }
            EventKind::StopTimeoutExceeded => {
                println!(
                    "[stop-timeout-exceeded] workload={workload} abandoned={} timeout={:?}",
                    e.count.unwrap_or_default(),
                    e.timeout()
                );
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={workload} reason={reason}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={workload} info={reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
