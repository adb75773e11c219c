//! Runtime core: registry, instance supervision and shutdown.
//!
//! Internal modules:
//! - [`registry`]: name → factory table;
//! - [`supervisor`]: starts and stops groups of instances;
//! - [`group`]: group and per-instance state;
//! - [`runner`]: one start / stop call with timeout, panic isolation and events;
//! - [`builder`]: supervisor construction;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod config;
mod group;
mod registry;
mod runner;
pub(crate) mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use group::{InstanceHandle, InstanceState, SupervisionGroup};
pub use registry::{Registry, WorkloadDescriptor};
pub use supervisor::{InstanceSupervisor, StopReport};
pub(crate) use supervisor::validate_count;
