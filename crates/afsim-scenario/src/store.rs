//! The in-memory scenario registry.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use afsim_core::{EntityError, EntityManager, Scenario, ScenarioId};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::afsim_text;
use crate::error::ScenarioError;
use crate::persist::{self, FileFormat};
use crate::validate::{self, ValidationIssue};

type Slot = Arc<Mutex<Scenario>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Scenario> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings for [`ScenarioStore::create_with`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioSpec {
    /// Scenario name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Duration in seconds.
    pub duration_s: f64,
    /// Time step in seconds; `None` keeps the default.
    pub time_step_s: Option<f64>,
}

impl ScenarioSpec {
    /// Name and duration only.
    pub fn new(name: impl Into<String>, duration_s: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            duration_s,
            time_step_s: None,
        }
    }
}

/// One row of [`ScenarioStore::list`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario id.
    pub id: ScenarioId,
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Number of platforms.
    pub platform_count: usize,
    /// Duration in seconds.
    pub duration_s: f64,
    /// Last save/load location.
    pub file_path: Option<PathBuf>,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id(),
            name: s.name.clone(),
            description: s.description.clone(),
            platform_count: s.platform_count(),
            duration_s: s.duration_s,
            file_path: s.file_path.clone(),
        }
    }
}

/// Registry of scenarios under edit.
///
/// The map is behind an `RwLock`; each scenario has its own `Mutex`, so an
/// edit to one scenario never blocks reads of another and a caller never
/// sees a half-applied edit.
pub struct ScenarioStore {
    dir: PathBuf,
    scenarios: RwLock<IndexMap<ScenarioId, Slot>>,
}

impl ScenarioStore {
    /// A store whose default save location is `scenarios_dir`. The
    /// directory is created on first save.
    pub fn new(scenarios_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: scenarios_dir.into(),
            scenarios: RwLock::new(IndexMap::new()),
        }
    }

    /// Default save directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create and register an empty scenario.
    pub fn create(&self, name: &str, duration_s: f64) -> Result<Scenario, ScenarioError> {
        self.create_with(ScenarioSpec::new(name, duration_s))
    }

    /// Create and register an empty scenario with full settings.
    pub fn create_with(&self, spec: ScenarioSpec) -> Result<Scenario, ScenarioError> {
        let mut scenario = Scenario::new(spec.name, spec.duration_s)?.with_description(spec.description);
        if let Some(step) = spec.time_step_s {
            scenario = scenario.with_time_step(step)?;
        }
        info!(id = %scenario.id(), name = %scenario.name, "scenario created");
        self.register(scenario.clone());
        Ok(scenario)
    }

    /// Load a scenario file and register it, replacing any scenario with
    /// the same id.
    pub fn load(&self, path: &Path) -> Result<Scenario, ScenarioError> {
        let scenario = persist::read(path)?;
        info!(id = %scenario.id(), path = %path.display(), platforms = scenario.platform_count(), "scenario loaded");
        self.register(scenario.clone());
        Ok(scenario)
    }

    /// Save atomically to `path`, or to `<dir>/<name>.json`. The format
    /// follows the extension (`.afsim`/`.txt` render AFSIM text).
    pub fn save(&self, id: ScenarioId, path: Option<&Path>) -> Result<PathBuf, ScenarioError> {
        let slot = self.slot(id)?;
        let mut scenario = lock(&slot);
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self.dir.join(format!("{}.json", file_stem(&scenario.name))),
        };
        persist::write(&*scenario, &target)?;
        scenario.file_path = Some(target.clone());
        info!(id = %id, path = %target.display(), "scenario saved");
        Ok(target)
    }

    /// Structural checks. Fails only if the id is unknown.
    pub fn validate(&self, id: ScenarioId) -> Result<Vec<ValidationIssue>, ScenarioError> {
        let slot = self.slot(id)?;
        let scenario = lock(&slot);
        let issues = validate::validate(&*scenario);
        debug!(
            id = %id,
            errors = issues.iter().filter(|i| i.severity == validate::Severity::Error).count(),
            warnings = issues.iter().filter(|i| i.severity == validate::Severity::Warning).count(),
            "scenario validated"
        );
        Ok(issues)
    }

    /// Summaries of every registered scenario, in registration order.
    pub fn list(&self) -> Vec<ScenarioSummary> {
        let slots: Vec<Slot> = self.read_map().values().cloned().collect();
        slots.iter().map(|s| ScenarioSummary::from(&*lock(s))).collect()
    }

    /// Unregister a scenario. Files on disk are left alone.
    pub fn delete(&self, id: ScenarioId) -> Result<Scenario, ScenarioError> {
        let removed = self
            .scenarios
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&id)
            .ok_or(ScenarioError::NotFound { id })?;
        info!(id = %id, "scenario deleted");
        let scenario = lock(&removed).clone();
        Ok(scenario)
    }

    /// Snapshot of a scenario.
    pub fn get(&self, id: ScenarioId) -> Result<Scenario, ScenarioError> {
        let slot = self.slot(id)?;
        let scenario = lock(&slot).clone();
        Ok(scenario)
    }

    /// Run `f` against the scenario's platform graph under its lock.
    pub fn edit<R>(
        &self,
        id: ScenarioId,
        f: impl FnOnce(&mut EntityManager<'_>) -> Result<R, EntityError>,
    ) -> Result<R, ScenarioError> {
        let slot = self.slot(id)?;
        let mut scenario = lock(&slot);
        let mut em = EntityManager::new(&mut *scenario);
        Ok(f(&mut em)?)
    }

    /// Run `f` against the scenario's top-level settings under its lock.
    pub fn update<R>(&self, id: ScenarioId, f: impl FnOnce(&mut Scenario) -> R) -> Result<R, ScenarioError> {
        let slot = self.slot(id)?;
        let mut scenario = lock(&slot);
        Ok(f(&mut *scenario))
    }

    /// Scenario documents in the scenarios directory, sorted. A missing
    /// directory yields an empty list.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, ScenarioError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ScenarioError::io(&self.dir, e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ScenarioError::io(&self.dir, e))?.path();
            if path.is_file() && FileFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// AFSIM text for the simulator.
    pub fn render(&self, id: ScenarioId) -> Result<String, ScenarioError> {
        let slot = self.slot(id)?;
        let text = afsim_text::render(&*lock(&slot));
        Ok(text)
    }

    fn register(&self, scenario: Scenario) {
        let id = scenario.id();
        let mut map = self.scenarios.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(&id) {
            *lock(existing) = scenario;
        } else {
            map.insert(id, Arc::new(Mutex::new(scenario)));
        }
    }

    fn slot(&self, id: ScenarioId) -> Result<Slot, ScenarioError> {
        self.read_map()
            .get(&id)
            .cloned()
            .ok_or(ScenarioError::NotFound { id })
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<ScenarioId, Slot>> {
        self.scenarios.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// File stem for a scenario name: path separators and control characters
/// become `_`.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if stem.is_empty() || stem == "." || stem == ".." {
        "scenario".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afsim_core::{ErrorKind, PlatformSpec};

    #[test]
    fn create_rejects_invalid_settings() {
        let store = ScenarioStore::new("unused");
        assert_eq!(store.create("", 10.0).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(store.create("x", -5.0).unwrap_err().kind(), ErrorKind::Validation);
        let mut spec = ScenarioSpec::new("x", 10.0);
        spec.time_step_s = Some(0.0);
        assert_eq!(store.create_with(spec).unwrap_err().kind(), ErrorKind::Validation);
        assert!(store.list().is_empty());
    }

    #[test]
    fn edit_is_visible_in_snapshots() {
        let store = ScenarioStore::new("unused");
        let id = store.create("e", 10.0).unwrap().id();
        store
            .edit(id, |em| em.add_platform(PlatformSpec::new("p")).map(|_| ()))
            .unwrap();
        assert_eq!(store.get(id).unwrap().platform_count(), 1);
        assert_eq!(store.list()[0].platform_count, 1);

        let err = store
            .edit(id, |em| em.delete_platform("nope").map(|_| ()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_unregisters_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScenarioStore::new(dir.path());
        let id = store.create("d", 10.0).unwrap().id();
        let path = store.save(id, None).unwrap();
        store.delete(id).unwrap();
        assert!(path.exists());
        assert_eq!(store.get(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(store.delete(id).is_err());
    }

    #[test]
    fn file_stem_sanitizes() {
        assert_eq!(file_stem("a/b\\c"), "a_b_c");
        assert_eq!(file_stem(".."), "scenario");
        assert_eq!(file_stem(" ok "), "ok");
    }
}
