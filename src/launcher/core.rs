//! # Launcher: one invocation from raw arguments to process exit.
//!
//! ```text
//! launch(args)
//!   Idle ──► parse ──► list / help ──► return
//!          │
//!          ▼
//!   Resolving ──► registry.resolve(name) ──► UnknownWorkload ──► Terminated
//!          │
//!          ▼
//!   Starting ──► supervisor.start_group(name, factory, N)
//!          │       └─ failure policy rejects ──► stop_group ──► Terminated
//!          ▼
//!   Running ──► select { termination signal, every instance closed }
//!          │
//!          ▼
//!   Stopping ──► stop_group (bounded) ──► flush subscribers ──► Terminated
//! ```
//!
//! Each launch builds a fresh [`InstanceSupervisor`], so events of one launch
//! never leak into the next. Launch methods take `&mut self`: one launch at a
//! time per [`Launcher`].

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{
    InstanceState, InstanceSupervisor, Registry, StopReport, SupervisionGroup, shutdown,
};
use crate::error::{InstanceError, LaunchError};
use crate::subscribers::Subscribe;

use super::config::LauncherConfig;
use super::invocation::{Invocation, Request};
use super::phase::LaunchPhase;

/// What ended the `Running` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A termination signal (or the caller's shutdown future) fired.
    Signal,
    /// Every running instance finished on its own.
    AllClosed,
}

/// Summary of a launch that reached `Running`.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    /// Resolved workload name.
    pub workload: String,
    /// Requested instance count.
    pub requested: u32,
    /// Instance states right after the start phase, ordered by id.
    pub started: Vec<InstanceState>,
    /// Start failures tolerated by the failure policy, ordered by id.
    pub start_failures: Vec<InstanceError>,
    /// What ended the run.
    pub ended_by: EndReason,
    /// Result of stopping the group.
    pub stop: StopReport,
    /// Instance states after the stop, ordered by id.
    pub finished: Vec<InstanceState>,
}

/// Non-error result of [`Launcher::launch`].
#[derive(Debug, Clone)]
pub enum LaunchOutcome {
    /// The workload ran and was brought down.
    Completed(LaunchReport),
    /// `list`: registered names, sorted.
    Listed(Vec<String>),
    /// `--help`: rendered usage text.
    Help(String),
}

/// Turns an argument list into a running, supervised group of instances.
pub struct Launcher {
    registry: Arc<Registry>,
    cfg: LauncherConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    phase: watch::Sender<LaunchPhase>,
}

impl Launcher {
    /// Creates a launcher over `registry`.
    ///
    /// With the `logging` feature the launcher prints lifecycle events through
    /// [`LogWriter`](crate::LogWriter) unless [`Launcher::with_subscribers`]
    /// replaces it.
    pub fn new(registry: impl Into<Arc<Registry>>, cfg: LauncherConfig) -> Self {
        let (phase, _) = watch::channel(LaunchPhase::Idle);
        Self {
            registry: registry.into(),
            cfg,
            subscribers: default_subscribers(),
            phase,
        }
    }

    /// Replaces the event subscribers used for every launch.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registry in use.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Configuration in use.
    pub fn config(&self) -> &LauncherConfig {
        &self.cfg
    }

    /// Current phase.
    pub fn phase(&self) -> LaunchPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<LaunchPhase> {
        self.phase.subscribe()
    }

    /// Runs one invocation until a termination signal (SIGINT/SIGTERM/SIGQUIT).
    pub async fn launch<I, S>(&mut self, args: I) -> Result<LaunchOutcome, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch_until(args, shutdown::wait_for_shutdown_signal())
            .await
    }

    /// Runs one invocation until `shutdown` resolves or every instance closed.
    ///
    /// An `Err` from `shutdown` still stops the group, then surfaces as
    /// [`LaunchError::Signal`].
    pub async fn launch_until<I, S, F>(
        &mut self,
        args: I,
        shutdown: F,
    ) -> Result<LaunchOutcome, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Future<Output = io::Result<()>>,
    {
        self.phase.send_replace(LaunchPhase::Idle);

        let invocation = match Request::parse(&self.cfg.program, args) {
            Ok(Request::Launch(invocation)) => invocation,
            Ok(Request::List) => return Ok(LaunchOutcome::Listed(self.registry.names())),
            Ok(Request::Help(text)) => return Ok(LaunchOutcome::Help(text)),
            Err(e) => return Err(self.abort(e)),
        };

        self.advance(LaunchPhase::Resolving);
        let name = match invocation.target(self.cfg.default_workload.as_deref()) {
            Ok(name) => name,
            Err(e) => return Err(self.abort(e)),
        };
        let factory = match self.registry.resolve(name) {
            Ok(factory) => factory,
            Err(e) => return Err(self.abort(e)),
        };

        self.advance(LaunchPhase::Starting);
        let sup = InstanceSupervisor::builder(self.cfg.supervisor.clone())
            .with_subscribers(self.subscribers.clone())
            .build();

        let mut group = match sup
            .start_group(name, factory, i64::from(invocation.instances()))
            .await
        {
            Ok(group) => group,
            Err(e) => {
                sup.shutdown().await;
                return Err(self.abort(e));
            }
        };

        if let Some(e) = self.cfg.failure_policy.check(&group) {
            sup.stop_group(&mut group).await;
            sup.shutdown().await;
            return Err(self.abort(e));
        }

        let started = group.states();
        let start_failures: Vec<InstanceError> = group.errors().into_iter().cloned().collect();
        self.advance(LaunchPhase::Running);

        tokio::pin!(shutdown);
        let (ended_by, signal) = tokio::select! {
            res = &mut shutdown => (EndReason::Signal, res),
            _ = sup.wait_closed(&mut group) => (EndReason::AllClosed, Ok(())),
        };
        tracing::info!(workload = %name, ended_by = ?ended_by, "running phase ended");

        self.advance(LaunchPhase::Stopping);
        let stop = sup.stop_group(&mut group).await;
        sup.shutdown().await;
        self.advance(LaunchPhase::Terminated);

        if let Err(e) = signal {
            let e = LaunchError::from(e);
            tracing::error!(error = %e, label = e.as_label(), "launch failed");
            return Err(e);
        }

        Ok(LaunchOutcome::Completed(report(
            &invocation,
            &group,
            started,
            start_failures,
            ended_by,
            stop,
        )))
    }

    /// Runs [`Launcher::launch`] and maps the result to a process exit code.
    ///
    /// `list` and `--help` output goes to stdout; errors go to stderr.
    pub async fn run_main<I, S>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.launch(args).await {
            Ok(LaunchOutcome::Completed(report)) => {
                if !report.stop.is_clean() {
                    tracing::warn!(
                        workload = %report.workload,
                        failed = report.stop.failed.len(),
                        "some instances did not stop cleanly"
                    );
                }
                ExitCode::SUCCESS
            }
            Ok(LaunchOutcome::Listed(names)) => {
                for name in names {
                    println!("{name}");
                }
                ExitCode::SUCCESS
            }
            Ok(LaunchOutcome::Help(text)) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", self.cfg.program);
                ExitCode::from(e.exit_code())
            }
        }
    }

    /// Moves to `next`; an illegal transition is logged and ignored.
    fn advance(&self, next: LaunchPhase) {
        let prev = self.phase();
        if !prev.can_transition_to(next) {
            tracing::warn!(from = %prev, to = %next, "illegal launch phase transition ignored");
            return;
        }
        self.phase.send_replace(next);
        tracing::debug!(from = %prev, to = %next, "launch phase");
    }

    fn abort(&self, e: LaunchError) -> LaunchError {
        tracing::error!(error = %e, label = e.as_label(), "launch aborted");
        self.advance(LaunchPhase::Terminated);
        e
    }
}

fn report(
    invocation: &Invocation,
    group: &SupervisionGroup,
    started: Vec<InstanceState>,
    start_failures: Vec<InstanceError>,
    ended_by: EndReason,
    stop: StopReport,
) -> LaunchReport {
    LaunchReport {
        workload: group.name().to_string(),
        requested: invocation.instances(),
        started,
        start_failures,
        ended_by,
        stop,
        finished: group.states(),
    }
}

#[cfg(feature = "logging")]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    let log: Arc<dyn Subscribe> = Arc::new(crate::subscribers::LogWriter::new());
    vec![log]
}

#[cfg(not(feature = "logging"))]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SupervisorConfig;
    use crate::events::EventKind;
    use crate::launcher::FailurePolicy;
    use crate::testkit::{AlwaysStarts, ClosesAfter, FailsToStart, Recorder, fail_nth};
    use crate::workloads::WorkloadFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn launcher(registry: Registry, cfg: LauncherConfig) -> (Launcher, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        (Launcher::new(registry, cfg).with_subscribers(subs), recorder)
    }

    fn http_registry() -> Registry {
        Registry::from_entries([
            ("http", WorkloadFactory::of::<AlwaysStarts>()),
            ("worker", WorkloadFactory::of::<AlwaysStarts>()),
        ])
        .expect("distinct names")
    }

    fn never() -> std::future::Pending<io::Result<()>> {
        std::future::pending()
    }

    async fn soon() -> io::Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }

    fn completed(outcome: Result<LaunchOutcome, LaunchError>) -> LaunchReport {
        match outcome {
            Ok(LaunchOutcome::Completed(report)) => report,
            other => panic!("expected a completed launch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_n_instances_and_confirms_each() {
        let (mut launcher, recorder) = launcher(http_registry(), LauncherConfig::default());

        let report = completed(
            launcher
                .launch_until(["run", "http", "-instances", "4"], soon())
                .await,
        );

        assert_eq!(report.workload, "http");
        assert_eq!(report.requested, 4);
        assert_eq!(report.started, vec![InstanceState::Running; 4]);
        assert_eq!(report.ended_by, EndReason::Signal);
        assert!(report.stop.is_clean());
        assert_eq!(report.finished, vec![InstanceState::Stopped; 4]);
        assert_eq!(
            recorder.instances(EventKind::InstanceRunning).await,
            vec![1, 2, 3, 4]
        );
        assert_eq!(recorder.count(EventKind::InstanceStopped).await, 4);
        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn unknown_name_starts_nothing() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let registry = Registry::from_entries([(
            "http",
            WorkloadFactory::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                AlwaysStarts::default()
            }),
        )])
        .expect("registry");
        let (mut launcher, recorder) = launcher(registry, LauncherConfig::default());

        let err = launcher
            .launch_until(["run", "unknown-name"], soon())
            .await
            .expect_err("unknown name");

        match &err {
            LaunchError::UnknownWorkload { name, known } => {
                assert_eq!(name, "unknown-name");
                assert_eq!(known, &vec!["http".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_ne!(err.exit_code(), 0);
        assert_eq!(created.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.count(EventKind::InstanceStarting).await, 0);
        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn partial_failure_keeps_running_when_tolerant() {
        let registry = Registry::from_entries([("http", fail_nth(2))]).expect("registry");
        let (mut launcher, _) = launcher(registry, LauncherConfig::default());

        let report = completed(
            launcher
                .launch_until(["run", "http", "-instances", "3"], soon())
                .await,
        );

        assert_eq!(
            report.started,
            vec![
                InstanceState::Running,
                InstanceState::Failed,
                InstanceState::Running
            ]
        );
        assert_eq!(report.start_failures.len(), 1);
        assert_eq!(report.start_failures[0].instance_id(), 2);
        assert_eq!(report.stop.stopped, vec![1, 3]);
    }

    #[tokio::test]
    async fn partial_failure_aborts_when_all_or_nothing() {
        let registry = Registry::from_entries([("http", fail_nth(2))]).expect("registry");
        let cfg = LauncherConfig {
            failure_policy: FailurePolicy::AllOrNothing,
            ..LauncherConfig::default()
        };
        let (mut launcher, recorder) = launcher(registry, cfg);

        let err = launcher
            .launch_until(["run", "http", "-instances", "3"], never())
            .await
            .expect_err("partial start");

        assert!(matches!(
            err,
            LaunchError::PartialStart {
                requested: 3,
                failed: 1,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(recorder.instances(EventKind::InstanceStopped).await, vec![1, 3]);
        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn all_failed_is_no_healthy_instances() {
        let registry = Registry::from_entries([(
            "http",
            WorkloadFactory::new(|| FailsToStart),
        )])
        .expect("registry");
        let (mut launcher, _) = launcher(registry, LauncherConfig::default());

        let err = launcher
            .launch_until(["run", "http", "-instances", "2"], never())
            .await
            .expect_err("nothing started");

        assert!(matches!(
            err,
            LaunchError::NoHealthyInstances { failed: 2, .. }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn bad_counts_never_reach_the_factory() {
        let (mut launcher, recorder) = launcher(http_registry(), LauncherConfig::default());

        let err = launcher
            .launch_until(["run", "http", "-instances", "0"], soon())
            .await
            .expect_err("zero");
        assert!(matches!(err, LaunchError::InvalidInstanceCount { count: 0 }));
        assert_eq!(err.exit_code(), 2);

        let err = launcher
            .launch_until(["run", "http", "-instances", "four"], soon())
            .await
            .expect_err("non-numeric");
        assert!(matches!(err, LaunchError::InvalidArgument { .. }));
        assert_eq!(err.exit_code(), 2);

        assert_eq!(recorder.count(EventKind::InstanceStarting).await, 0);
        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn bare_invocation_runs_the_default_once() {
        let (mut launcher, recorder) =
            launcher(http_registry(), LauncherConfig::with_default("worker"));

        let report = completed(launcher.launch_until(Vec::<String>::new(), soon()).await);

        assert_eq!(report.workload, "worker");
        assert_eq!(report.requested, 1);
        assert_eq!(recorder.instances(EventKind::InstanceRunning).await, vec![1]);
    }

    #[tokio::test]
    async fn bare_invocation_without_default_is_rejected() {
        let (mut launcher, _) = launcher(http_registry(), LauncherConfig::default());

        let err = launcher
            .launch_until(Vec::<String>::new(), soon())
            .await
            .expect_err("no default");
        assert!(matches!(err, LaunchError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn ends_when_every_instance_closed() {
        let registry = Registry::from_entries([(
            "batch",
            WorkloadFactory::new(|| ClosesAfter {
                after: Duration::from_millis(10),
            }),
        )])
        .expect("registry");
        let (mut launcher, recorder) = launcher(registry, LauncherConfig::default());

        let report = completed(
            launcher
                .launch_until(["run", "batch", "-instances", "2"], never())
                .await,
        );

        assert_eq!(report.ended_by, EndReason::AllClosed);
        assert_eq!(report.finished, vec![InstanceState::Stopped; 2]);
        assert!(report.stop.stopped.is_empty());
        assert_eq!(recorder.count(EventKind::InstanceClosed).await, 2);
    }

    #[tokio::test]
    async fn runs_only_while_phase_is_running() {
        let (mut launcher, _) = launcher(http_registry(), LauncherConfig::default());
        let phase = launcher.watch_phase();

        let shutdown = async move {
            assert_eq!(*phase.borrow(), LaunchPhase::Running);
            Ok::<(), io::Error>(())
        };
        completed(launcher.launch_until(["run", "http"], shutdown).await);

        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn failed_signal_setup_still_stops_the_group() {
        let (mut launcher, recorder) = launcher(http_registry(), LauncherConfig::default());

        let err = launcher
            .launch_until(["run", "http", "-instances", "2"], async {
                Err::<(), _>(io::Error::other("no signal support"))
            })
            .await
            .expect_err("signal failure");

        assert!(matches!(err, LaunchError::Signal(_)));
        assert_eq!(recorder.count(EventKind::InstanceStopped).await, 2);
        assert_eq!(launcher.phase(), LaunchPhase::Terminated);
    }

    #[tokio::test]
    async fn list_and_help_start_nothing() {
        let (mut launcher, recorder) = launcher(http_registry(), LauncherConfig::default());

        match launcher.launch_until(["list"], soon()).await {
            Ok(LaunchOutcome::Listed(names)) => assert_eq!(names, vec!["http", "worker"]),
            other => panic!("expected listing, got {other:?}"),
        }
        assert!(matches!(
            launcher.launch_until(["--help"], soon()).await,
            Ok(LaunchOutcome::Help(_))
        ));
        assert_eq!(recorder.count(EventKind::GroupStarting).await, 0);
    }

    #[tokio::test]
    async fn exposes_config_and_registry() {
        let cfg = LauncherConfig {
            supervisor: SupervisorConfig {
                stop_timeout: Duration::from_millis(50),
                ..SupervisorConfig::default()
            },
            ..LauncherConfig::default()
        };
        let (launcher, _) = launcher(http_registry(), cfg);
        assert_eq!(
            launcher.config().supervisor.stop_timeout,
            Duration::from_millis(50)
        );
        assert!(launcher.registry().contains("http"));
    }

    #[tokio::test]
    async fn back_to_back_launches_each_run_the_full_phase_cycle() {
        let (mut launcher, recorder) = launcher(http_registry(), LauncherConfig::default());

        for _ in 0..2 {
            let report = completed(launcher.launch_until(["run", "http"], soon()).await);
            assert_eq!(report.finished, vec![InstanceState::Stopped]);
            assert_eq!(launcher.phase(), LaunchPhase::Terminated);
        }
        assert_eq!(recorder.count(EventKind::InstanceRunning).await, 2);
    }

    #[test]
    fn illegal_phase_transition_is_ignored_not_fatal() {
        let launcher = Launcher::new(http_registry(), LauncherConfig::default());

        launcher.advance(LaunchPhase::Running);
        assert_eq!(launcher.phase(), LaunchPhase::Idle);

        launcher.advance(LaunchPhase::Resolving);
        launcher.advance(LaunchPhase::Resolving);
        assert_eq!(launcher.phase(), LaunchPhase::Resolving);
    }
}
