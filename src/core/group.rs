//! # Supervision group and instance handles.
//!
//! A [`SupervisionGroup`] is the set of instances started together by one
//! `start_group` call. It owns one [`InstanceHandle`] per requested instance.
//!
//! ## State machine (per instance)
//! ```text
//! Starting ──► Running ──► Stopped   (stop acknowledged, or closed on its own)
//!    │            └──────► Failed    (stop error / stop timeout)
//!    └───────────────────► Failed    (start error / start timeout / panic)
//! ```
//!
//! ## Rules
//! - `handles.len() == requested` once `start_group` returned
//! - Handle ids are `1..=requested`, stored in id order (lookup is by position)
//! - No handle is left `Starting` after `start_group`
//! - Handles are mutated only by the supervisor (`&mut SupervisionGroup`);
//!   workload code never sees them
//! - All read accessors are synchronous and never block

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::InstanceError;
use crate::workloads::WorkloadRef;

/// Lifecycle state of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// `start` has been issued and has not resolved yet.
    Starting,
    /// `start` succeeded; the instance is live.
    Running,
    /// Start failed, or the instance could not be stopped cleanly.
    Failed,
    /// The instance stopped (on request or on its own).
    Stopped,
}

impl InstanceState {
    /// Returns a short stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Starting => "starting",
            InstanceState::Running => "running",
            InstanceState::Failed => "failed",
            InstanceState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instance of a workload inside a group.
pub struct InstanceHandle {
    id: u32,
    workload: WorkloadRef,
    state: InstanceState,
    error: Option<InstanceError>,
    token: CancellationToken,
}

impl InstanceHandle {
    pub(crate) fn new(id: u32, workload: WorkloadRef, token: CancellationToken) -> Self {
        Self {
            id,
            workload,
            state: InstanceState::Starting,
            error: None,
            token,
        }
    }

    /// Sequence number, unique within the group (1-based).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// Error behind a `Failed` state (the latest one, if several happened).
    pub fn error(&self) -> Option<&InstanceError> {
        self.error.as_ref()
    }

    /// The workload object backing this instance.
    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn mark_running(&mut self) {
        self.state = InstanceState::Running;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.state = InstanceState::Stopped;
        self.token.cancel();
    }

    pub(crate) fn mark_failed(&mut self, error: InstanceError) {
        self.state = InstanceState::Failed;
        self.error = Some(error);
        self.token.cancel();
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// The instances started together for one invocation.
#[derive(Debug)]
pub struct SupervisionGroup {
    name: Arc<str>,
    requested: usize,
    handles: Vec<InstanceHandle>,
    token: CancellationToken,
    stop_requested: bool,
}

impl SupervisionGroup {
    pub(crate) fn new(name: Arc<str>, requested: usize, token: CancellationToken) -> Self {
        Self {
            name,
            requested,
            handles: Vec::with_capacity(requested),
            token,
            stop_requested: false,
        }
    }

    /// Workload name this group runs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested instance count.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// All handles, ordered by id.
    pub fn handles(&self) -> &[InstanceHandle] {
        &self.handles
    }

    /// Handle for instance `id`.
    pub fn get(&self, id: u32) -> Option<&InstanceHandle> {
        self.handles.get(slot(id)?).filter(|h| h.id == id)
    }

    /// States of all instances, ordered by id.
    pub fn states(&self) -> Vec<InstanceState> {
        self.handles.iter().map(InstanceHandle::state).collect()
    }

    /// Number of instances currently in `state`.
    pub fn count(&self, state: InstanceState) -> usize {
        self.handles.iter().filter(|h| h.state == state).count()
    }

    /// Number of `Running` instances.
    pub fn running(&self) -> usize {
        self.count(InstanceState::Running)
    }

    /// Number of `Failed` instances.
    pub fn failed(&self) -> usize {
        self.count(InstanceState::Failed)
    }

    /// True while at least one instance is `Running`.
    pub fn is_healthy(&self) -> bool {
        self.running() > 0
    }

    /// True once `stop_group` has been called on this group.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Errors recorded on failed instances, ordered by id.
    pub fn errors(&self) -> Vec<&InstanceError> {
        self.handles.iter().filter_map(InstanceHandle::error).collect()
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn push(&mut self, handle: InstanceHandle) {
        self.handles.push(handle);
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut InstanceHandle> {
        self.handles.get_mut(slot(id)?).filter(|h| h.id == id)
    }

    pub(crate) fn handles_mut(&mut self) -> impl Iterator<Item = &mut InstanceHandle> {
        self.handles.iter_mut()
    }

    /// Flags the group as stopping; returns `false` if it already was.
    pub(crate) fn begin_stop(&mut self) -> bool {
        !std::mem::replace(&mut self.stop_requested, true)
    }
}

/// Position of instance `id` in `handles`: ids are 1-based and pushed in order.
fn slot(id: u32) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::AlwaysStarts;

    fn group_of(n: u32) -> SupervisionGroup {
        let token = CancellationToken::new();
        let mut group = SupervisionGroup::new("http".into(), n as usize, token.clone());
        for id in 1..=n {
            group.push(InstanceHandle::new(
                id,
                Arc::new(AlwaysStarts::default()),
                token.child_token(),
            ));
        }
        group
    }

    #[test]
    fn counts_follow_transitions() {
        let mut group = group_of(3);
        assert_eq!(group.count(InstanceState::Starting), 3);
        assert!(!group.is_healthy());

        group.get_mut(1).expect("#1").mark_running();
        group.get_mut(3).expect("#3").mark_running();
        group
            .get_mut(2)
            .expect("#2")
            .mark_failed(InstanceError::StartPanicked { id: 2 });

        assert_eq!(
            group.states(),
            vec![
                InstanceState::Running,
                InstanceState::Failed,
                InstanceState::Running
            ]
        );
        assert_eq!(group.running(), 2);
        assert_eq!(group.failed(), 1);
        assert!(group.is_healthy());
        assert_eq!(group.errors().len(), 1);
        assert_eq!(group.errors()[0].instance_id(), 2);
    }

    #[test]
    fn failing_an_instance_cancels_only_its_token() {
        let mut group = group_of(2);
        group
            .get_mut(1)
            .expect("#1")
            .mark_failed(InstanceError::StartPanicked { id: 1 });

        assert!(group.get(1).expect("#1").token().is_cancelled());
        assert!(!group.get(2).expect("#2").token().is_cancelled());
        assert!(!group.token().is_cancelled());
    }

    #[test]
    fn lookup_by_id_is_positional() {
        let mut group = group_of(3);
        assert!(group.get(0).is_none());
        assert!(group.get(4).is_none());
        for id in 1..=3 {
            assert_eq!(group.get(id).expect("present").id(), id);
            assert_eq!(group.get_mut(id).expect("present").id(), id);
        }
    }

    #[test]
    fn begin_stop_is_one_shot() {
        let mut group = group_of(1);
        assert!(group.begin_stop());
        assert!(!group.begin_stop());
        assert!(group.is_stop_requested());
    }
}
