//! Error types used by the launcher, the instance supervisor and workloads.
//!
//! This module defines three error enums:
//!
//! - [`LaunchError`]: errors that abort a whole invocation (parse, resolution, startup).
//! - [`InstanceError`]: per-instance failures recorded on an instance handle.
//! - [`WorkloadError`]: errors returned by [`Workload`](crate::Workload) implementations.
//!
//! All of them provide `as_label` for logs, and [`LaunchError::exit_code`]
//! maps an aborted invocation onto a process exit status.

use std::time::Duration;
use thiserror::Error;

/// # Errors that abort a launch.
///
/// Registration and parse errors are raised before anything is started;
/// resolution errors abort before the supervisor is touched; the remaining
/// variants describe a start phase that left no usable group.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A workload with this name is already registered.
    #[error("workload {name:?} is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// No workload is registered under this name.
    #[error("unknown workload {name:?} (registered: {known:?})")]
    UnknownWorkload {
        /// The requested name.
        name: String,
        /// Sorted list of registered names, for the operator.
        known: Vec<String>,
    },

    /// The raw argument list does not match the command grammar.
    #[error("invalid arguments: {reason}")]
    InvalidArgument {
        /// Parser message.
        reason: String,
    },

    /// The requested instance count is zero or negative.
    #[error("invalid instance count {count}: must be a positive integer")]
    InvalidInstanceCount {
        /// The rejected count.
        count: i64,
    },

    /// Every instance of the group failed to start.
    #[error("no instance of {name:?} reached running ({failed} failed)")]
    NoHealthyInstances {
        /// Workload name.
        name: String,
        /// Number of failed instances.
        failed: usize,
    },

    /// Some instances failed and the failure policy forbids a partial group.
    #[error("{failed} of {requested} instances of {name:?} failed to start")]
    PartialStart {
        /// Workload name.
        name: String,
        /// Requested instance count.
        requested: usize,
        /// Number of failed instances.
        failed: usize,
    },

    /// Termination signal listeners could not be installed.
    #[error("signal handling failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use deployvisor::LaunchError;
    ///
    /// let err = LaunchError::InvalidInstanceCount { count: 0 };
    /// assert_eq!(err.as_label(), "launch_invalid_instance_count");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::DuplicateName { .. } => "launch_duplicate_name",
            LaunchError::UnknownWorkload { .. } => "launch_unknown_workload",
            LaunchError::InvalidArgument { .. } => "launch_invalid_argument",
            LaunchError::InvalidInstanceCount { .. } => "launch_invalid_instance_count",
            LaunchError::NoHealthyInstances { .. } => "launch_no_healthy_instances",
            LaunchError::PartialStart { .. } => "launch_partial_start",
            LaunchError::Signal(_) => "launch_signal",
        }
    }

    /// Process exit status for an invocation aborted by this error.
    ///
    /// - `2`: bad arguments or instance count
    /// - `3`: unknown workload
    /// - `4`: start phase left no usable group
    /// - `1`: anything else
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::InvalidArgument { .. } | LaunchError::InvalidInstanceCount { .. } => 2,
            LaunchError::UnknownWorkload { .. } => 3,
            LaunchError::NoHealthyInstances { .. } | LaunchError::PartialStart { .. } => 4,
            LaunchError::DuplicateName { .. } | LaunchError::Signal(_) => 1,
        }
    }
}

/// # Per-instance failures.
///
/// Recorded on the [`InstanceHandle`](crate::InstanceHandle) whose state became
/// `Failed`. None of these abort the group on their own.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// `Workload::start` returned an error.
    #[error("instance #{id} failed to start: {error}")]
    Start {
        /// Instance sequence number.
        id: u32,
        /// Workload error message.
        error: String,
    },

    /// `Workload::start` did not return within the configured start timeout.
    #[error("instance #{id} did not start within {timeout:?}")]
    StartTimeout {
        /// Instance sequence number.
        id: u32,
        /// The exceeded start timeout.
        timeout: Duration,
    },

    /// `Workload::start` panicked.
    #[error("instance #{id} panicked while starting")]
    StartPanicked {
        /// Instance sequence number.
        id: u32,
    },

    /// `Workload::stop` returned an error.
    #[error("instance #{id} failed to stop: {error}")]
    Stop {
        /// Instance sequence number.
        id: u32,
        /// Workload error message.
        error: String,
    },

    /// `Workload::stop` did not return within the stop timeout; the instance was abandoned.
    #[error("instance #{id} did not stop within {timeout:?}; abandoned")]
    StopTimeout {
        /// Instance sequence number.
        id: u32,
        /// The exceeded stop timeout.
        timeout: Duration,
    },
}

impl InstanceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            InstanceError::Start { .. } => "instance_start_failed",
            InstanceError::StartTimeout { .. } => "instance_start_timeout",
            InstanceError::StartPanicked { .. } => "instance_start_panicked",
            InstanceError::Stop { .. } => "instance_stop_failed",
            InstanceError::StopTimeout { .. } => "instance_stop_timeout",
        }
    }

    /// Sequence number of the instance this error belongs to.
    pub fn instance_id(&self) -> u32 {
        match self {
            InstanceError::Start { id, .. }
            | InstanceError::StartTimeout { id, .. }
            | InstanceError::StartPanicked { id }
            | InstanceError::Stop { id, .. }
            | InstanceError::StopTimeout { id, .. } => *id,
        }
    }
}

/// # Errors produced by workload implementations.
///
/// Returned from [`Workload::start`](crate::Workload::start) and
/// [`Workload::stop`](crate::Workload::stop).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkloadError {
    /// The operation failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; the workload cannot be used any more.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The workload gave up waiting on something of its own.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The operation observed cancellation of its context.
    #[error("context cancelled")]
    Canceled,
}

impl WorkloadError {
    /// Shorthand for [`WorkloadError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkloadError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use deployvisor::WorkloadError;
    ///
    /// let err = WorkloadError::fail("address in use");
    /// assert_eq!(err.as_label(), "workload_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkloadError::Fail { .. } => "workload_failed",
            WorkloadError::Fatal { .. } => "workload_fatal",
            WorkloadError::Timeout { .. } => "workload_timeout",
            WorkloadError::Canceled => "workload_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkloadError::Fail { error } => format!("error: {error}"),
            WorkloadError::Fatal { error } => format!("fatal: {error}"),
            WorkloadError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            WorkloadError::Canceled => "context cancelled".to_string(),
        }
    }
}

impl From<std::io::Error> for WorkloadError {
    fn from(err: std::io::Error) -> Self {
        WorkloadError::Fail {
            error: err.to_string(),
        }
    }
}
