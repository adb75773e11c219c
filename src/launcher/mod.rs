//! Command-line front end: argument grammar, launch phases and the launcher.
//!
//! - [`invocation`]: `run <name> [-instances N]`, `list`, `--help`;
//! - [`config`]: [`LauncherConfig`] and [`FailurePolicy`];
//! - [`phase`]: [`LaunchPhase`] state machine;
//! - [`core`]: [`Launcher`], which drives one invocation end to end.

mod config;
mod core;
mod invocation;
mod phase;

pub use self::core::{EndReason, LaunchOutcome, LaunchReport, Launcher};
pub use config::{FailurePolicy, LauncherConfig};
pub use invocation::{Command, Invocation, Request};
pub use phase::LaunchPhase;
