//! # Workload contract.
//!
//! A [`Workload`] is anything the launcher can run several copies of: a server,
//! a consumer loop, a periodic job. The launcher never looks inside; it calls
//! [`start`](Workload::start) once per instance, and [`stop`](Workload::stop)
//! when the group shuts down.
//!
//! `start` should return as soon as the workload is operational (listening,
//! subscribed, ...). Long-running work belongs in a task spawned by the
//! workload itself and tied to [`InstanceContext::token`], which is cancelled
//! when the group stops.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkloadError;
use crate::workloads::InstanceContext;

/// Shared handle to a workload instance.
pub type WorkloadRef = Arc<dyn Workload>;

/// # Pluggable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use deployvisor::{InstanceContext, Workload, WorkloadError};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Workload for Ticker {
///     async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
///         let token = ctx.token().clone();
///         tokio::spawn(async move {
///             while !token.is_cancelled() {
///                 tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///             }
///         });
///         println!("ticker #{} running", ctx.id());
///         Ok(())
///     }
///
///     async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    /// Brings the instance up. Resolves once the instance is operational.
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError>;

    /// Shuts the instance down.
    ///
    /// `ctx.token()` is cancelled when the supervisor stops waiting; an
    /// implementation still running past that point is abandoned.
    async fn stop(&self, ctx: InstanceContext) -> Result<(), WorkloadError>;

    /// Resolves when the instance has finished on its own.
    ///
    /// Default: never. Workloads that can complete without being stopped
    /// (one-shot jobs, servers whose listener died) override this.
    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}
