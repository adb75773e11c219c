//! # Instance supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the knobs of one [`InstanceSupervisor`](crate::InstanceSupervisor).
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → no start timeout (each `start` may take as long as it needs)
//! - `stop_timeout = 0s` → don't wait: instances not stopped on the first poll are abandoned

use std::time::Duration;

/// Configuration for the instance supervisor.
///
/// ## Field semantics
/// - `stop_timeout`: upper bound for `stop_group`; unresponsive instances are abandoned after it
/// - `start_timeout`: per-instance bound for `Workload::start` (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time `stop_group` waits for instances to acknowledge stop.
    pub stop_timeout: Duration,

    /// Maximum time a single `Workload::start` may take.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = a start exceeding it is cancelled and recorded as `Failed`
    pub start_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the start timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn start_timeout(&self) -> Option<Duration> {
        if self.start_timeout == Duration::ZERO {
            None
        } else {
            Some(self.start_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `stop_timeout = 30s`
    /// - `start_timeout = 0s` (unbounded)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(30),
            start_timeout: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_start_timeout_means_unbounded() {
        let mut cfg = SupervisorConfig::default();
        assert_eq!(cfg.start_timeout(), None);

        cfg.start_timeout = Duration::from_millis(500);
        assert_eq!(cfg.start_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn bus_capacity_never_zero() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
