//! The scenario document: top-level settings plus the platform graph.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::id::ScenarioId;
use crate::keyed;
use crate::platform::Platform;
use crate::Parameters;

/// Time step used when the caller does not set one, in seconds.
pub const DEFAULT_TIME_STEP_S: f64 = 1.0;

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP_S
}

/// A simulation scenario.
///
/// The serialized form is the native `.json` scenario document. Platforms
/// are written as a list in insertion order; `file_path` is runtime state
/// and never part of the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    id: ScenarioId,
    /// Display name, also the default file stem.
    pub name: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Simulated duration in seconds.
    pub duration_s: f64,
    /// Simulation time step in seconds.
    #[serde(default = "default_time_step")]
    pub time_step_s: f64,
    #[serde(default, with = "keyed")]
    platforms: IndexMap<String, Platform>,
    /// Free-form settings rendered as top-level `key value` lines.
    #[serde(default)]
    pub metadata: Parameters,
    /// Where the scenario was last saved or loaded from.
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl Scenario {
    /// Create an empty scenario with a fresh id.
    pub fn new(name: impl Into<String>, duration_s: f64) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyName { what: "scenario" });
        }
        if !(duration_s.is_finite() && duration_s > 0.0) {
            return Err(ModelError::InvalidDuration { value: duration_s });
        }
        Ok(Self {
            id: ScenarioId::new(),
            name,
            description: String::new(),
            duration_s,
            time_step_s: DEFAULT_TIME_STEP_S,
            platforms: IndexMap::new(),
            metadata: Parameters::new(),
            file_path: None,
        })
    }

    /// Builder-style time step setter with validation.
    pub fn with_time_step(mut self, time_step_s: f64) -> Result<Self, ModelError> {
        if !(time_step_s.is_finite() && time_step_s > 0.0) {
            return Err(ModelError::InvalidTimeStep { value: time_step_s });
        }
        self.time_step_s = time_step_s;
        Ok(self)
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Stable identifier, persisted in the document.
    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// Platforms in insertion order.
    pub fn platforms(&self) -> impl ExactSizeIterator<Item = &Platform> {
        self.platforms.values()
    }

    /// Platform named `name`, if present.
    pub fn platform(&self, name: &str) -> Option<&Platform> {
        self.platforms.get(name)
    }

    /// Number of platforms.
    pub fn platform_count(&self) -> usize {
        self.platforms.len()
    }

    /// Whether every platform is filed under its own name.
    pub fn keys_consistent(&self) -> bool {
        self.platforms.iter().all(|(k, p)| k == p.name())
    }

    pub(crate) fn platforms_mut(&mut self) -> &mut IndexMap<String, Platform> {
        &mut self.platforms
    }
}
