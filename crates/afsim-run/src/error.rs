//! Run controller errors.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use afsim_core::{ErrorKind, RunId, RunState, TransitionError};
use afsim_scenario::ValidationIssue;

use crate::config::ConfigError;

/// Errors from [`RunController`](crate::RunController) operations.
///
/// Launch failures after validation (missing binary, spawn failure) are
/// not errors: they are recorded on a FAILED run and returned as data.
#[derive(Debug)]
pub enum RunError {
    /// Controller configuration is invalid.
    Config(ConfigError),
    /// The scenario has error-severity validation issues.
    InvalidScenario {
        /// Scenario name.
        scenario: String,
        /// The error-severity issues.
        issues: Vec<ValidationIssue>,
    },
    /// No run with this id.
    RunNotFound {
        /// The requested id.
        id: RunId,
    },
    /// The run is in a state that does not allow the operation.
    NotTerminal {
        /// The run.
        id: RunId,
        /// Its current state.
        state: RunState,
    },
    /// An illegal state transition was attempted.
    Transition(TransitionError),
    /// A stop needed the forced kill after the grace period.
    StopTimeout {
        /// The run.
        id: RunId,
        /// Grace period that elapsed.
        grace: Duration,
    },
    /// `wait` gave up before the run finished.
    WaitTimeout {
        /// The run.
        id: RunId,
        /// State when the wait ended.
        state: RunState,
    },
    /// The output directory could not be created.
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The supervisor thread could not be started.
    SupervisorSpawn(io::Error),
    /// The supervisor thread is gone.
    SupervisorGone,
}

impl RunError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::InvalidScenario { .. } => ErrorKind::Validation,
            Self::RunNotFound { .. } => ErrorKind::NotFound,
            Self::NotTerminal { .. } => ErrorKind::Conflict,
            Self::Transition(e) => e.kind(),
            Self::StopTimeout { .. } | Self::WaitTimeout { .. } => ErrorKind::Timeout,
            Self::Io { .. } => ErrorKind::Io,
            Self::SupervisorSpawn(_) | Self::SupervisorGone => ErrorKind::Process,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::InvalidScenario { scenario, issues } => {
                write!(f, "scenario '{scenario}' has {} error(s)", issues.len())?;
                for issue in issues {
                    write!(f, "; {issue}")?;
                }
                Ok(())
            }
            Self::RunNotFound { id } => write!(f, "simulation run {id} not found"),
            Self::NotTerminal { id, state } => {
                write!(f, "simulation run {id} is {state}, not finished")
            }
            Self::Transition(e) => write!(f, "{e}"),
            Self::StopTimeout { id, grace } => write!(
                f,
                "simulation run {id} ignored SIGTERM for {}ms and was killed",
                grace.as_millis()
            ),
            Self::WaitTimeout { id, state } => {
                write!(f, "timed out waiting for simulation run {id} (still {state})")
            }
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::SupervisorSpawn(e) => write!(f, "could not start run supervisor: {e}"),
            Self::SupervisorGone => write!(f, "run supervisor has shut down"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Transition(e) => Some(e),
            Self::Io { source, .. } | Self::SupervisorSpawn(source) => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TransitionError> for RunError {
    fn from(e: TransitionError) -> Self {
        Self::Transition(e)
    }
}
