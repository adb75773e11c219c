//! # Workload abstractions.
//!
//! This module provides the contract between the launcher and pluggable units of work:
//! - [`Workload`] - trait with async `start` / `stop` (and optional `closed`)
//! - [`WorkloadRef`] - shared reference to a workload (`Arc<dyn Workload>`)
//! - [`InstanceContext`] - what an instance is handed: its id, name and a cancellation token
//! - [`WorkloadFactory`] - zero-argument constructor producing fresh workloads

mod context;
mod factory;
mod workload;

pub use context::InstanceContext;
pub use factory::WorkloadFactory;
pub use workload::{Workload, WorkloadRef};
