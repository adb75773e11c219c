use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Per-call context handed to [`Workload::start`](crate::Workload::start) and
/// [`Workload::stop`](crate::Workload::stop).
///
/// Carries cancellation only; the workload learns nothing else about the
/// launcher.
#[derive(Clone, Debug)]
pub struct InstanceContext {
    id: u32,
    workload: Arc<str>,
    token: CancellationToken,
}

impl InstanceContext {
    /// Creates a context for instance `id` of `workload`.
    pub fn new(id: u32, workload: impl Into<Arc<str>>, token: CancellationToken) -> Self {
        Self {
            id,
            workload: workload.into(),
            token,
        }
    }

    /// Instance sequence number within its group (1-based).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Registered workload name.
    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// Cancellation token for this call.
    ///
    /// In `start` it stays valid for the whole life of the instance and is
    /// cancelled when the group stops (or when `start` times out). In `stop`
    /// it is cancelled when the stop timeout elapses.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Shorthand for `self.token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Shorthand for `self.token().cancelled()`.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
