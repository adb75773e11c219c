//! # Command grammar.
//!
//! ```text
//! <program>                          → default workload, 1 instance
//! <program> run <name>               → <name>, 1 instance
//! <program> run <name> -instances N  → <name>, N instances (N > 0)
//! <program> list                     → print registered workload names
//! <program> -h | --help              → usage
//! ```
//!
//! The single-dash long flag `-instances` is rewritten to `--instances` before
//! the arguments reach clap; both spellings (and `=N` forms) are accepted.

use clap::{Parser, Subcommand, error::ErrorKind};

use crate::core::validate_count;
use crate::error::LaunchError;

#[derive(Parser, Debug)]
#[command(
    disable_version_flag = true,
    about = "Run supervised instances of a registered workload"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Start instances of a registered workload and run until terminated
    Run {
        /// Registered workload name
        name: String,

        /// Number of instances to start
        #[arg(
            long = "instances",
            value_name = "N",
            default_value_t = 1,
            allow_negative_numbers = true
        )]
        instances: i64,
    },
    /// List registered workloads
    List,
}

/// Which form of the launch command was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Bare invocation: run the configured default workload.
    DefaultRun,
    /// `run <name>`.
    Run,
}

/// A parsed launch request. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: Command,
    workload: Option<String>,
    instances: u32,
}

impl Invocation {
    /// Which form was used.
    pub fn command(&self) -> Command {
        self.command
    }

    /// Workload name given on the command line (`None` for a bare invocation).
    pub fn workload(&self) -> Option<&str> {
        self.workload.as_deref()
    }

    /// Requested instance count (always >= 1).
    pub fn instances(&self) -> u32 {
        self.instances
    }

    /// The workload to run: the explicit name, or `default` for a bare invocation.
    pub fn target<'a>(&'a self, default: Option<&'a str>) -> Result<&'a str, LaunchError> {
        self.workload
            .as_deref()
            .or(default)
            .ok_or_else(|| LaunchError::InvalidArgument {
                reason: "no workload given and no default workload configured".to_string(),
            })
    }
}

/// Everything the argument list can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Start a workload.
    Launch(Invocation),
    /// Print registered workload names.
    List,
    /// Print usage; carries the rendered help text.
    Help(String),
}

impl Request {
    /// Parses the raw argument list (program name excluded).
    pub fn parse<I, S>(program: &str, args: I) -> Result<Request, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv = std::iter::once(program.to_string())
            .chain(args.into_iter().map(|a| normalize_flag(a.into())));

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => {
                return Ok(Request::Help(err.render().to_string()));
            }
            Err(err) => {
                return Err(LaunchError::InvalidArgument {
                    reason: first_line(&err.to_string()),
                });
            }
        };

        match cli.command {
            None => Ok(Request::Launch(Invocation {
                command: Command::DefaultRun,
                workload: None,
                instances: 1,
            })),
            Some(CliCommand::List) => Ok(Request::List),
            Some(CliCommand::Run { name, instances }) => Ok(Request::Launch(Invocation {
                command: Command::Run,
                workload: Some(name),
                instances: validate_count(instances)?,
            })),
        }
    }
}

fn normalize_flag(arg: String) -> String {
    match arg.strip_prefix("-instances") {
        Some(rest) if rest.is_empty() || rest.starts_with('=') => format!("--instances{rest}"),
        _ => arg,
    }
}

fn first_line(msg: &str) -> String {
    let line = msg.lines().next().unwrap_or(msg).trim();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
