//! The run registry and its public operations.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use afsim_core::fs::write_atomic;
use afsim_core::{RunId, Scenario, SimulationRun};
use afsim_scenario::{afsim_text, file_stem, validate, Severity};
use crossbeam_channel::Sender;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{is_executable, ControllerConfig, Installation, SimulatorConfig};
use crate::error::RunError;
use crate::process::Launch;
use crate::supervisor::{lock, Request, RunSlot, StopOutcome, Supervisor};

/// Per-launch options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Record a COMPLETED run without starting the simulator.
    pub dry_run: bool,
    /// Appended to the simulator command line.
    pub extra_args: Vec<String>,
}

impl RunOptions {
    /// Options for a dry run.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

struct SupervisorHandle {
    tx: Option<Sender<Request>>,
    thread: Option<JoinHandle<()>>,
}

/// Launches simulator processes and tracks their runs.
///
/// Runs stay in the registry after they finish until [`purge`](Self::purge)
/// removes them. Dropping the controller stops every running process with
/// the usual grace period.
pub struct RunController {
    config: ControllerConfig,
    simulator: RwLock<SimulatorConfig>,
    runs: RwLock<IndexMap<RunId, RunSlot>>,
    supervisor: Mutex<SupervisorHandle>,
}

impl RunController {
    /// Validate `config` and start the supervisor thread.
    ///
    /// A relative output root is made absolute against the current
    /// directory, since the simulator runs inside its output directory.
    pub fn new(mut config: ControllerConfig) -> Result<Self, RunError> {
        config.validate()?;
        config.output_root =
            std::path::absolute(&config.output_root).map_err(|source| RunError::Io {
                path: config.output_root.clone(),
                source,
            })?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let supervisor = Supervisor::new(rx, config.poll_interval, config.stop_grace);
        let thread = thread::Builder::new()
            .name("afsim-supervisor".into())
            .spawn(move || supervisor.run())
            .map_err(RunError::SupervisorSpawn)?;
        info!(output_root = %config.output_root.display(), "run controller started");
        Ok(Self {
            simulator: RwLock::new(config.simulator.clone()),
            config,
            runs: RwLock::new(IndexMap::new()),
            supervisor: Mutex::new(SupervisorHandle {
                tx: Some(tx),
                thread: Some(thread),
            }),
        })
    }

    /// The configuration in effect (with an absolute output root).
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ── Launch ──────────────────────────────────────────────────

    /// Validate and launch `scenario`.
    ///
    /// Fails only for invalid scenarios and a dead supervisor. Problems
    /// starting the simulator produce a FAILED run instead.
    pub fn run_simulation(
        &self,
        scenario: &Scenario,
        options: RunOptions,
    ) -> Result<SimulationRun, RunError> {
        let errors: Vec<_> = validate(scenario)
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .collect();
        if !errors.is_empty() {
            return Err(RunError::InvalidScenario {
                scenario: scenario.name.clone(),
                issues: errors,
            });
        }

        let id = RunId::new();
        let stem = file_stem(&scenario.name);
        let output_dir = self
            .config
            .output_root
            .join(format!("{stem}_{}", id.short()));
        let mut run = SimulationRun::with_id(
            id,
            scenario.id(),
            scenario.name.clone(),
            output_dir.clone(),
            options.dry_run,
        );
        info!(run = %id, scenario = %scenario.name, dry_run = options.dry_run, "launching simulation");

        let scenario_file = output_dir.join(format!("{stem}.txt"));
        let written = write_atomic(&scenario_file, afsim_text::render(scenario).as_bytes())
            .map_err(|e| format!("could not write {}: {e}", scenario_file.display()));

        if options.dry_run {
            // A dry run completes even when the rendered file cannot be kept.
            match written {
                Ok(()) => run.scenario_file = Some(scenario_file),
                Err(message) => {
                    warn!(run = %id, "{message}");
                    run.push_warning(message);
                }
            }
            run.complete(None)?;
            debug!(run = %id, "dry run recorded");
            self.register(run.clone());
            return Ok(run);
        }
        if let Err(message) = written {
            return self.register_failed(run, message);
        }
        run.scenario_file = Some(scenario_file.clone());

        let binary = self.simulator_config().resolve_binary();
        let binary = match binary {
            Some(path) if is_executable(&path) => path,
            Some(path) => {
                let message = format!("simulator binary not found: {}", path.display());
                return self.register_failed(run, message);
            }
            None => {
                let message =
                    "simulator binary not found (set AFSIM_BINARY or AFSIM_HOME)".to_string();
                return self.register_failed(run, message);
            }
        };

        let output_flag = self.simulator_config().output_flag;
        let launch = Launch {
            binary: &binary,
            scenario_file: &scenario_file,
            output_flag: &output_flag,
            output_dir: &output_dir,
            extra_args: &options.extra_args,
        };
        let (child, log_file) = match launch.spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                let message = format!("failed to start {}: {e}", binary.display());
                return self.register_failed(run, message);
            }
        };
        run.log_file = Some(log_file);
        run.start(child.id())?;
        info!(run = %id, pid = child.id(), binary = %binary.display(), args = ?launch.args(), "simulator started");

        // The supervisor must own the child before a stop request can
        // find the run in the registry.
        let snapshot = run.clone();
        let slot = Arc::new(Mutex::new(run));
        let adopted = self.send(Request::Adopt {
            slot: Arc::clone(&slot),
            child,
        });
        self.insert(id, slot);
        adopted?;
        Ok(snapshot)
    }

    fn register(&self, run: SimulationRun) {
        let id = run.id();
        self.insert(id, Arc::new(Mutex::new(run)));
    }

    fn insert(&self, id: RunId, slot: RunSlot) {
        self.write_runs().insert(id, slot);
    }

    fn register_failed(
        &self,
        mut run: SimulationRun,
        message: String,
    ) -> Result<SimulationRun, RunError> {
        warn!(run = %run.id(), "{message}");
        run.fail(None, message)?;
        self.register(run.clone());
        Ok(run)
    }

    // ── Control ─────────────────────────────────────────────────

    /// Stop a run. Finished runs are returned unchanged.
    ///
    /// Blocks until the process exits, at most the grace period plus one
    /// poll interval.
    pub fn stop_simulation(&self, id: RunId) -> Result<StopOutcome, RunError> {
        let slot = self.slot(id)?;
        {
            let run = lock(&slot);
            if run.state().is_terminal() {
                debug!(run = %id, state = %run.state(), "stop on finished run");
                return Ok(StopOutcome::unchanged(run.clone()));
            }
        }
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(Request::Stop {
            slot,
            reply: reply_tx,
        })?;
        let outcome = reply_rx.recv().map_err(|_| RunError::SupervisorGone)?;
        info!(run = %id, state = %outcome.state(), escalated = outcome.escalated_after.is_some(), "stop handled");
        Ok(outcome)
    }

    /// Block until the run finishes or `timeout` elapses.
    pub fn wait(&self, id: RunId, timeout: Duration) -> Result<SimulationRun, RunError> {
        let slot = self.slot(id)?;
        let start = Instant::now();
        loop {
            let run = lock(&slot).clone();
            if run.state().is_terminal() {
                return Ok(run);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(RunError::WaitTimeout {
                    id,
                    state: run.state(),
                });
            }
            thread::sleep(self.config.poll_interval.min(timeout - elapsed));
        }
    }

    /// Remove a finished run from the registry. Its output stays on disk.
    pub fn purge(&self, id: RunId) -> Result<SimulationRun, RunError> {
        let mut runs = self.write_runs();
        let slot = runs.get(&id).ok_or(RunError::RunNotFound { id })?;
        let run = lock(slot).clone();
        if !run.state().is_terminal() {
            return Err(RunError::NotTerminal {
                id,
                state: run.state(),
            });
        }
        runs.shift_remove(&id);
        info!(run = %id, "run purged");
        Ok(run)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Snapshot of one run.
    pub fn get_simulation_status(&self, id: RunId) -> Result<SimulationRun, RunError> {
        Ok(lock(&self.slot(id)?).clone())
    }

    /// Snapshots of every registered run, oldest first.
    pub fn list_runs(&self) -> Vec<SimulationRun> {
        self.read_runs().values().map(|s| lock(s).clone()).collect()
    }

    // ── Simulator ───────────────────────────────────────────────

    /// Use `path` as the simulator binary; `None` returns to discovery.
    pub fn set_binary(&self, path: Option<PathBuf>) {
        info!(binary = ?path, "simulator binary set");
        self.simulator
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .binary = path;
    }

    /// The binary the next launch would use, if any resolves.
    pub fn binary(&self) -> Option<PathBuf> {
        self.simulator_config().resolve_binary()
    }

    /// Current simulator settings.
    pub fn simulator_config(&self) -> SimulatorConfig {
        self.simulator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Probe for every AFSIM tool.
    pub fn detect_installation(&self) -> Installation {
        self.simulator_config().detect_installation()
    }

    /// Output directory runs are created under.
    pub fn output_root(&self) -> &Path {
        &self.config.output_root
    }

    // ── Shutdown ────────────────────────────────────────────────

    /// Stop every running process and the supervisor. Returns what was
    /// stopped. Later calls return nothing and later launches fail with
    /// [`RunError::SupervisorGone`].
    pub fn shutdown(&self) -> Vec<StopOutcome> {
        let mut handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = handle.tx.take() else {
            return Vec::new();
        };
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let stopped = match tx.send(Request::Shutdown { reply: reply_tx }) {
            Ok(()) => reply_rx.recv().unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        drop(tx);
        if let Some(thread) = handle.thread.take() {
            if thread.join().is_err() {
                warn!("run supervisor panicked");
            }
        }
        info!(stopped = stopped.len(), "run controller shut down");
        stopped
    }

    // ── Internals ───────────────────────────────────────────────

    fn send(&self, request: Request) -> Result<(), RunError> {
        let tx = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tx
            .clone();
        let sent = match tx {
            Some(tx) => tx.send(request).map_err(|e| e.into_inner()),
            None => Err(request),
        };
        sent.map_err(|request| {
            // A child nobody supervises must not outlive the controller.
            if let Request::Adopt { slot, mut child } = request {
                let _ = child.kill();
                let _ = child.wait();
                let _ = lock(&slot).fail(None, RunError::SupervisorGone.to_string());
            }
            RunError::SupervisorGone
        })
    }

    fn slot(&self, id: RunId) -> Result<RunSlot, RunError> {
        self.read_runs()
            .get(&id)
            .cloned()
            .ok_or(RunError::RunNotFound { id })
    }

    fn read_runs(&self) -> RwLockReadGuard<'_, IndexMap<RunId, RunSlot>> {
        self.runs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_runs(&self) -> RwLockWriteGuard<'_, IndexMap<RunId, RunSlot>> {
        self.runs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
