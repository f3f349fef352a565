//! [`AfsimService`]: every operation behind one handle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use afsim_core::{
    Component, ComponentKind, Parameters, Platform, PlatformSpec, PlatformUpdate, ResultFormat,
    RunId, Scenario, ScenarioId, SimulationRun,
};
use afsim_results::{
    DirectorySummary, JsonExport, QueryOptions, QueryResult, ResultFileInfo, ResultSummary,
};
use afsim_run::{Installation, RunController, RunOptions, StopOutcome};
use afsim_scenario::{ScenarioSpec, ScenarioStore, ScenarioSummary, ValidationIssue};
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::Result;

/// The scenario store, the run controller and the result engine behind
/// one handle.
///
/// All methods take `&self`; the service can be shared across threads.
/// Dropping it stops every running simulation.
pub struct AfsimService {
    config: ServiceConfig,
    scenarios: ScenarioStore,
    runs: RunController,
}

impl AfsimService {
    /// Start the service. Fails if the controller settings are invalid.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let runs = RunController::new(config.controller())?;
        let scenarios = ScenarioStore::new(config.scenarios_dir.clone());
        info!(
            scenarios_dir = %config.scenarios_dir.display(),
            output_dir = %runs.output_root().display(),
            "AFSIM service started"
        );
        Ok(Self {
            config,
            scenarios,
            runs,
        })
    }

    /// Start with [`ServiceConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env())
    }

    /// Configuration the service was started with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The underlying scenario store.
    pub fn scenarios(&self) -> &ScenarioStore {
        &self.scenarios
    }

    /// The underlying run controller.
    pub fn runs(&self) -> &RunController {
        &self.runs
    }

    // ── Scenarios ───────────────────────────────────────────────

    /// Create an empty scenario.
    pub fn create_scenario(&self, name: &str, duration_s: f64) -> Result<Scenario> {
        Ok(self.scenarios.create(name, duration_s)?)
    }

    /// Create an empty scenario with description and time step.
    pub fn create_scenario_with(&self, spec: ScenarioSpec) -> Result<Scenario> {
        Ok(self.scenarios.create_with(spec)?)
    }

    /// Load a scenario file (JSON, or AFSIM text by extension).
    pub fn load_scenario(&self, path: &Path) -> Result<Scenario> {
        Ok(self.scenarios.load(path)?)
    }

    /// Save a scenario, by default to `<scenarios_dir>/<name>.json`.
    pub fn save_scenario(&self, id: ScenarioId, path: Option<&Path>) -> Result<PathBuf> {
        Ok(self.scenarios.save(id, path)?)
    }

    /// Structural checks.
    pub fn validate_scenario(&self, id: ScenarioId) -> Result<Vec<ValidationIssue>> {
        Ok(self.scenarios.validate(id)?)
    }

    /// Summaries of every registered scenario.
    pub fn list_scenarios(&self) -> Vec<ScenarioSummary> {
        self.scenarios.list()
    }

    /// Snapshot of one scenario.
    pub fn get_scenario(&self, id: ScenarioId) -> Result<Scenario> {
        Ok(self.scenarios.get(id)?)
    }

    /// Unregister a scenario. Files on disk stay.
    pub fn delete_scenario(&self, id: ScenarioId) -> Result<Scenario> {
        Ok(self.scenarios.delete(id)?)
    }

    /// Scenario documents in the scenarios directory.
    pub fn list_scenario_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.scenarios.list_files()?)
    }

    /// AFSIM text for a scenario.
    pub fn render_scenario(&self, id: ScenarioId) -> Result<String> {
        Ok(self.scenarios.render(id)?)
    }

    // ── Platforms and components ────────────────────────────────

    /// Add a platform and return it.
    pub fn add_platform(&self, scenario: ScenarioId, spec: PlatformSpec) -> Result<Platform> {
        Ok(self
            .scenarios
            .edit(scenario, |em| em.add_platform(spec).cloned())?)
    }

    /// Remove a platform and its components.
    pub fn delete_platform(&self, scenario: ScenarioId, name: &str) -> Result<Platform> {
        Ok(self.scenarios.edit(scenario, |em| em.delete_platform(name))?)
    }

    /// Apply a partial update and return the platform as it now is.
    pub fn modify_platform(
        &self,
        scenario: ScenarioId,
        name: &str,
        update: PlatformUpdate,
    ) -> Result<Platform> {
        Ok(self
            .scenarios
            .edit(scenario, |em| em.modify_platform(name, update).cloned())?)
    }

    /// One platform.
    pub fn get_platform(&self, scenario: ScenarioId, name: &str) -> Result<Platform> {
        Ok(self
            .scenarios
            .edit(scenario, |em| em.get_platform(name).cloned())?)
    }

    /// Every platform, in insertion order.
    pub fn list_platforms(&self, scenario: ScenarioId) -> Result<Vec<Platform>> {
        Ok(self.scenarios.edit(scenario, |em| {
            Ok(em.list_platforms().into_iter().cloned().collect())
        })?)
    }

    /// Attach a component and return its slot.
    pub fn add_component(
        &self,
        scenario: ScenarioId,
        platform: &str,
        kind: ComponentKind,
        type_tag: Option<String>,
        parameters: Parameters,
    ) -> Result<String> {
        Ok(self.scenarios.edit(scenario, |em| {
            em.add_component(platform, kind, type_tag, parameters)
        })?)
    }

    /// Detach a component.
    pub fn remove_component(
        &self,
        scenario: ScenarioId,
        platform: &str,
        slot: &str,
    ) -> Result<Component> {
        Ok(self
            .scenarios
            .edit(scenario, |em| em.remove_component(platform, slot))?)
    }

    /// Components of one platform.
    pub fn list_components(&self, scenario: ScenarioId, platform: &str) -> Result<Vec<Component>> {
        Ok(self.scenarios.edit(scenario, |em| {
            Ok(em.list_components(platform)?.into_iter().cloned().collect())
        })?)
    }

    // ── Runs ────────────────────────────────────────────────────

    /// Launch the current state of a registered scenario.
    pub fn run_simulation(&self, scenario: ScenarioId, options: RunOptions) -> Result<SimulationRun> {
        let snapshot = self.scenarios.get(scenario)?;
        Ok(self.runs.run_simulation(&snapshot, options)?)
    }

    /// Stop a run, escalating to a kill after the grace period.
    pub fn stop_simulation(&self, run: RunId) -> Result<StopOutcome> {
        Ok(self.runs.stop_simulation(run)?)
    }

    /// Snapshot of one run.
    pub fn get_simulation_status(&self, run: RunId) -> Result<SimulationRun> {
        Ok(self.runs.get_simulation_status(run)?)
    }

    /// Every registered run, oldest first.
    pub fn list_runs(&self) -> Vec<SimulationRun> {
        self.runs.list_runs()
    }

    /// Block until the run finishes or `timeout` elapses.
    pub fn wait_for_run(&self, run: RunId, timeout: Duration) -> Result<SimulationRun> {
        Ok(self.runs.wait(run, timeout)?)
    }

    /// Forget a finished run.
    pub fn purge_run(&self, run: RunId) -> Result<SimulationRun> {
        Ok(self.runs.purge(run)?)
    }

    /// Use `path` as the simulator binary; `None` returns to discovery.
    pub fn set_binary(&self, path: Option<PathBuf>) {
        self.runs.set_binary(path);
    }

    /// The binary the next launch would use.
    pub fn binary(&self) -> Option<PathBuf> {
        self.runs.binary()
    }

    /// Probe for every AFSIM tool.
    pub fn detect_installation(&self) -> Installation {
        self.runs.detect_installation()
    }

    // ── Results ─────────────────────────────────────────────────

    /// Result files under `dir`, optionally restricted to `formats`.
    pub fn list_result_files(
        &self,
        dir: &Path,
        formats: Option<&[ResultFormat]>,
    ) -> Result<Vec<ResultFileInfo>> {
        Ok(afsim_results::list_result_files(dir, formats)?)
    }

    /// Result files in a run's output directory.
    pub fn list_run_results(
        &self,
        run: RunId,
        formats: Option<&[ResultFormat]>,
    ) -> Result<Vec<ResultFileInfo>> {
        let run = self.runs.get_simulation_status(run)?;
        self.list_result_files(run.output_dir(), formats)
    }

    /// Query any supported result file.
    pub fn query_results(&self, path: &Path, options: &QueryOptions) -> Result<QueryResult> {
        Ok(afsim_results::query_results(path, options)?)
    }

    /// Query a CSV result file.
    pub fn query_csv_results(&self, path: &Path, options: &QueryOptions) -> Result<QueryResult> {
        Ok(afsim_results::query_csv_results(path, options)?)
    }

    /// Query an event log.
    pub fn query_evt_results(&self, path: &Path, options: &QueryOptions) -> Result<QueryResult> {
        Ok(afsim_results::query_evt_results(path, options)?)
    }

    /// Query a binary AER file.
    pub fn query_aer_results(&self, path: &Path, options: &QueryOptions) -> Result<QueryResult> {
        Ok(afsim_results::query_aer_results(path, options)?)
    }

    /// Counts and per-field statistics for one file.
    pub fn get_results_summary(&self, path: &Path) -> Result<ResultSummary> {
        Ok(afsim_results::get_results_summary(path)?)
    }

    /// File counts and sizes for a directory of results.
    pub fn summarize_directory(&self, dir: &Path) -> Result<DirectorySummary> {
        Ok(afsim_results::summarize_directory(dir)?)
    }

    /// Write every record of `path` as one JSON document.
    pub fn export_results_to_json(&self, path: &Path, output: Option<&Path>) -> Result<PathBuf> {
        Ok(afsim_results::export_results_to_json(path, output)?)
    }

    /// Read back a JSON export.
    pub fn read_json_export(&self, path: &Path) -> Result<JsonExport> {
        Ok(afsim_results::read_json_export(path)?)
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Stop every running simulation. Also happens on drop.
    pub fn shutdown(&self) -> Vec<StopOutcome> {
        self.runs.shutdown()
    }
}
