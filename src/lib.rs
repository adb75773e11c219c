//! # deployvisor
//!
//! **Deployvisor** starts N supervised instances of a named workload inside one
//! process, keeps them running until the process is told to terminate, then
//! brings them down within a bounded time.
//!
//! Workloads are registered by name up front; the command line picks one and
//! how many instances to run:
//!
//! ```text
//! <program>                           default workload, 1 instance
//! <program> run <name> [-instances N] named workload, N instances
//! <program> list                      registered names
//! ```
//!
//! ## Architecture
//! ```text
//!   argv ──► Launcher ──► Request::parse ──► Registry::resolve(name) ──► WorkloadFactory
//!                │
//!                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  InstanceSupervisor (one per launch)                              │
//! │  - start_group: N × factory.create() + concurrent start           │
//! │  - SupervisionGroup: one InstanceHandle per instance              │
//! │  - stop_group: broadcast cancel + concurrent stop, bounded        │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │ instance │       │ instance │       │ instance │
//!   │    #1    │       │    #2    │       │    #N    │
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘
//!        │ InstanceStarting / InstanceRunning / InstanceFailed / ...
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │              Bus (lossless listener feed + broadcast)             │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                           listener ──► SubscriberSet
//!                                        ┌────┼────┐
//!                                        ▼    ▼    ▼
//!                                   LogWriter  custom subscribers
//! ```
//!
//! ## Launch phases
//! ```text
//! Idle ──► Resolving ──► Starting ──► Running ──► Stopping ──► Terminated
//! ```
//! Bad arguments, an unknown name or a start phase with no running instance
//! jump straight to `Terminated` with a [`LaunchError`].
//!
//! ## Features
//! | Area            | Description                                               | Key types / traits                             |
//! |-----------------|-----------------------------------------------------------|------------------------------------------------|
//! | **Workloads**   | Start/stop contract and per-instance context.             | [`Workload`], [`WorkloadFactory`], [`InstanceContext`] |
//! | **Registry**    | Name → factory table, resolved exactly once per launch.   | [`Registry`]                                   |
//! | **Supervision** | Concurrent start, bounded stop, per-instance state.       | [`InstanceSupervisor`], [`SupervisionGroup`]   |
//! | **Launcher**    | Argument grammar, phases, exit codes.                     | [`Launcher`], [`LauncherConfig`]               |
//! | **Events**      | Lifecycle events fanned out to subscribers.               | [`Subscribe`], [`Event`]                       |
//! | **Errors**      | Typed launch, instance and workload errors.               | [`LaunchError`], [`InstanceError`], [`WorkloadError`] |
//!
//! ## Optional features
//! - `logging` (default): the launcher prints lifecycle events through [`LogWriter`].
//!
//! ## Example
//! ```rust,no_run
//! use deployvisor::{
//!     InstanceContext, Launcher, LauncherConfig, Registry, Workload, WorkloadError,
//!     WorkloadFactory,
//! };
//!
//! #[derive(Default)]
//! struct Http;
//!
//! #[async_trait::async_trait]
//! impl Workload for Http {
//!     async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
//!         println!("instance #{} listening", ctx.id());
//!         Ok(())
//!     }
//!     async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     deployvisor::init_tracing();
//!     let registry = Registry::from_entries([("http", WorkloadFactory::of::<Http>())])
//!         .expect("distinct names");
//!     Launcher::new(registry, LauncherConfig::with_default("http"))
//!         .run_main(std::env::args().skip(1))
//!         .await
//! }
//! ```
mod core;
mod error;
mod events;
mod launcher;
mod subscribers;
mod telemetry;
mod workloads;

#[cfg(test)]
mod testkit;

// ---- Public re-exports ----

pub use crate::core::{
    InstanceHandle, InstanceState, InstanceSupervisor, Registry, StopReport, SupervisionGroup,
    SupervisorBuilder, SupervisorConfig, WorkloadDescriptor,
};
pub use error::{InstanceError, LaunchError, WorkloadError};
pub use events::{Event, EventKind};
pub use launcher::{
    Command, EndReason, FailurePolicy, Invocation, LaunchOutcome, LaunchPhase, LaunchReport,
    Launcher, LauncherConfig, Request,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use telemetry::init_tracing;
pub use workloads::{InstanceContext, Workload, WorkloadFactory, WorkloadRef};

// Built-in stdout event printer, installed by the launcher by default.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
