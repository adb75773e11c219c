//! # Workload factory.
//!
//! [`WorkloadFactory`] wraps a closure `F: Fn() -> W`, producing a **fresh**
//! workload per call. Instances never share state through the factory; if a
//! workload wants shared state it captures an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use deployvisor::{InstanceContext, Workload, WorkloadError, WorkloadFactory};
//!
//! #[derive(Default)]
//! struct Noop;
//!
//! #[async_trait::async_trait]
//! impl Workload for Noop {
//!     async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
//!     async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
//! }
//!
//! let a = WorkloadFactory::of::<Noop>();
//! let b = a.clone();
//! assert!(a.ptr_eq(&b));
//! let _instance = a.create();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::workloads::{Workload, WorkloadRef};

type BuildFn = dyn Fn() -> WorkloadRef + Send + Sync;

/// Zero-argument constructor for a workload.
///
/// Cheap to clone; clones share the same underlying closure.
#[derive(Clone)]
pub struct WorkloadFactory {
    build: Arc<BuildFn>,
}

impl WorkloadFactory {
    /// Wraps a constructor closure.
    pub fn new<F, W>(f: F) -> Self
    where
        F: Fn() -> W + Send + Sync + 'static,
        W: Workload,
    {
        Self {
            build: Arc::new(move || Arc::new(f()) as WorkloadRef),
        }
    }

    /// Factory for a workload type with a `Default` constructor.
    pub fn of<W: Workload + Default>() -> Self {
        Self::new(W::default)
    }

    /// Produces a new, independent workload.
    pub fn create(&self) -> WorkloadRef {
        (self.build)()
    }

    /// True if both factories wrap the same constructor.
    pub fn ptr_eq(&self, other: &WorkloadFactory) -> bool {
        Arc::ptr_eq(&self.build, &other.build)
    }
}

impl fmt::Debug for WorkloadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadFactory").finish_non_exhaustive()
    }
}
