//! Simulation-run records and their lifecycle state machine.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::id::{RunId, ScenarioId};

// ── RunState ────────────────────────────────────────────────────

/// Lifecycle state of a simulation run.
///
/// ```text
/// PENDING ──► RUNNING ──► COMPLETED | FAILED | STOPPED
///    └──────────────────► COMPLETED | FAILED
/// ```
///
/// Only a running process can be stopped.
///
/// The three right-hand states are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Recorded, process not yet started.
    Pending,
    /// External process is alive.
    Running,
    /// Process exited with status 0, or dry run.
    Completed,
    /// Spawn failed, or process exited nonzero or by signal.
    Failed,
    /// Stopped on request.
    Stopped,
}

impl RunState {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// The transition table.
    pub fn can_transition_to(self, to: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, to),
            (Pending, Running | Completed | Failed)
                | (Running, Completed | Failed | Stopped)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// A transition the table forbids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionError {
    /// State the run was in.
    pub from: RunState,
    /// State that was requested.
    pub to: RunState,
}

impl TransitionError {
    /// Always [`ErrorKind::Conflict`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Conflict
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal run transition {} -> {}", self.from, self.to)
    }
}

impl Error for TransitionError {}

// ── SimulationRun ───────────────────────────────────────────────

/// One invocation of the external simulator.
///
/// State only moves forward through [`RunState::can_transition_to`]; the
/// output directory is fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    id: RunId,
    /// Scenario the run was launched from.
    pub scenario_id: ScenarioId,
    /// Scenario name at launch time.
    pub scenario_name: String,
    state: RunState,
    /// OS process id while or after running.
    pub pid: Option<u32>,
    /// When the run record was created.
    pub created_at: DateTime<Utc>,
    /// When the process was spawned.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    output_dir: PathBuf,
    /// Rendered scenario file handed to the simulator.
    pub scenario_file: Option<PathBuf>,
    /// Combined stdout/stderr of the simulator.
    pub log_file: Option<PathBuf>,
    /// Process exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Failure description.
    pub error: Option<String>,
    /// Non-fatal notes, e.g. forced termination.
    pub warnings: Vec<String>,
    /// Whether the run was recorded without spawning anything.
    pub dry_run: bool,
}

impl SimulationRun {
    /// A fresh PENDING run.
    pub fn new(
        scenario_id: ScenarioId,
        scenario_name: impl Into<String>,
        output_dir: PathBuf,
        dry_run: bool,
    ) -> Self {
        Self::with_id(RunId::new(), scenario_id, scenario_name, output_dir, dry_run)
    }

    /// A fresh PENDING run with a caller-chosen id.
    pub fn with_id(
        id: RunId,
        scenario_id: ScenarioId,
        scenario_name: impl Into<String>,
        output_dir: PathBuf,
        dry_run: bool,
    ) -> Self {
        Self {
            id,
            scenario_id,
            scenario_name: scenario_name.into(),
            state: RunState::Pending,
            pid: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            output_dir,
            scenario_file: None,
            log_file: None,
            exit_code: None,
            error: None,
            warnings: Vec::new(),
            dry_run,
        }
    }

    /// Run id.
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Directory the simulator writes into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Move to `to` if the table allows it. Terminal states stamp `ended_at`.
    pub fn transition(&mut self, to: RunState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        if to.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    /// PENDING → RUNNING with the spawned process id.
    pub fn start(&mut self, pid: u32) -> Result<(), TransitionError> {
        self.transition(RunState::Running)?;
        self.pid = Some(pid);
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// → COMPLETED.
    pub fn complete(&mut self, exit_code: Option<i32>) -> Result<(), TransitionError> {
        self.transition(RunState::Completed)?;
        self.exit_code = exit_code;
        Ok(())
    }

    /// → FAILED, recording why.
    pub fn fail(
        &mut self,
        exit_code: Option<i32>,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.transition(RunState::Failed)?;
        self.exit_code = exit_code;
        self.error = Some(message.into());
        Ok(())
    }

    /// → STOPPED.
    pub fn stop(&mut self, exit_code: Option<i32>) -> Result<(), TransitionError> {
        self.transition(RunState::Stopped)?;
        self.exit_code = exit_code;
        Ok(())
    }

    /// Attach a non-fatal note.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Wall-clock seconds between start (or creation) and end, if ended.
    pub fn elapsed_s(&self) -> Option<f64> {
        let end = self.ended_at?;
        let start = self.started_at.unwrap_or(self.created_at);
        Some((end - start).num_milliseconds() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run() -> SimulationRun {
        SimulationRun::new(ScenarioId::new(), "s", PathBuf::from("/tmp/out"), false)
    }

    #[test]
    fn normal_lifecycle() {
        let mut r = run();
        assert_eq!(r.state(), RunState::Pending);
        r.start(4242).unwrap();
        assert_eq!(r.pid, Some(4242));
        assert!(r.started_at.is_some());
        r.complete(Some(0)).unwrap();
        assert_eq!(r.state(), RunState::Completed);
        assert!(r.ended_at.is_some());
        assert!(r.elapsed_s().unwrap() >= 0.0);
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut r = run();
        r.fail(None, "simulator binary not found").unwrap();
        let err = r.start(1).unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: RunState::Failed,
                to: RunState::Running
            }
        );
        assert!(r.stop(None).is_err());
        assert_eq!(r.error.as_deref(), Some("simulator binary not found"));
    }

    #[test]
    fn pending_run_cannot_be_stopped() {
        let mut r = run();
        assert!(!RunState::Pending.can_transition_to(RunState::Stopped));
        assert!(r.stop(None).is_err());
        assert_eq!(r.state(), RunState::Pending);
        r.complete(None).unwrap();
        assert_eq!(r.state(), RunState::Completed);
    }

    #[test]
    fn running_cannot_return_to_pending() {
        let mut r = run();
        r.start(1).unwrap();
        assert!(r.transition(RunState::Pending).is_err());
        assert!(r.transition(RunState::Running).is_err());
    }

    #[test]
    fn state_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&RunState::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    fn arb_state() -> impl Strategy<Value = RunState> {
        prop_oneof![
            Just(RunState::Pending),
            Just(RunState::Running),
            Just(RunState::Completed),
            Just(RunState::Failed),
            Just(RunState::Stopped),
        ]
    }

    proptest! {
        #[test]
        fn transitions_are_monotonic(seq in prop::collection::vec(arb_state(), 0..24)) {
            let mut r = run();
            let dir = r.output_dir().to_path_buf();
            let mut reached_terminal: Option<RunState> = None;
            for to in seq {
                let before = r.state();
                let res = r.transition(to);
                if let Some(t) = reached_terminal {
                    prop_assert!(res.is_err());
                    prop_assert_eq!(r.state(), t);
                } else if res.is_ok() {
                    prop_assert!(before.can_transition_to(to));
                    prop_assert_ne!(r.state(), RunState::Pending);
                } else {
                    prop_assert_eq!(r.state(), before);
                }
                if r.state().is_terminal() {
                    reached_terminal = Some(r.state());
                }
            }
            prop_assert_eq!(r.output_dir(), dir.as_path());
        }
    }
}
