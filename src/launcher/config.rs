//! # Launcher configuration.
//!
//! [`LauncherConfig`] carries what the launcher needs beyond the registry:
//! the program name shown in usage and diagnostics, the default workload for a
//! bare invocation, how partial start failures are judged, and the supervisor
//! knobs forwarded to every [`InstanceSupervisor`](crate::InstanceSupervisor).

use crate::core::{SupervisionGroup, SupervisorConfig};
use crate::error::LaunchError;

/// How the launcher judges a group after the start phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep running while at least one instance started.
    #[default]
    Tolerant,
    /// Any failed start aborts the launch; started instances are stopped.
    AllOrNothing,
}

impl FailurePolicy {
    /// Returns the error that aborts the launch, or `None` to keep running.
    ///
    /// A group with no running instance is always rejected.
    pub fn check(&self, group: &SupervisionGroup) -> Option<LaunchError> {
        let failed = group.failed();
        if group.running() == 0 {
            return Some(LaunchError::NoHealthyInstances {
                name: group.name().to_string(),
                failed,
            });
        }
        match self {
            FailurePolicy::Tolerant => None,
            FailurePolicy::AllOrNothing if failed > 0 => Some(LaunchError::PartialStart {
                name: group.name().to_string(),
                requested: group.requested(),
                failed,
            }),
            FailurePolicy::AllOrNothing => None,
        }
    }
}

/// Launcher settings.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Name used in usage text and error lines.
    pub program: String,
    /// Workload run by a bare invocation (`None` = bare invocation is an error).
    pub default_workload: Option<String>,
    /// Judgement applied after the start phase.
    pub failure_policy: FailurePolicy,
    /// Supervisor settings for each launch.
    pub supervisor: SupervisorConfig,
}

impl LauncherConfig {
    /// Config with the given default workload and everything else defaulted.
    pub fn with_default(workload: impl Into<String>) -> Self {
        Self {
            default_workload: Some(workload.into()),
            ..Self::default()
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: env!("CARGO_PKG_NAME").to_string(),
            default_workload: None,
            failure_policy: FailurePolicy::Tolerant,
            supervisor: SupervisorConfig::default(),
        }
    }
}
