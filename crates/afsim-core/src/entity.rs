//! In-place mutation of a scenario's platform graph.
//!
//! [`EntityManager`] borrows one [`Scenario`] mutably for the duration of
//! an edit. Every operation either applies completely or leaves the
//! scenario untouched.

use tracing::{debug, info};

use crate::component::{Component, ComponentKind};
use crate::error::{EntityError, ModelError};
use crate::platform::{Platform, Position, DEFAULT_PLATFORM_TYPE};
use crate::scenario::Scenario;
use crate::Parameters;

// ── Inputs ──────────────────────────────────────────────────────

/// Everything needed to add a platform.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformSpec {
    /// Unique platform name.
    pub name: String,
    /// Type tag; `None` means [`DEFAULT_PLATFORM_TYPE`].
    pub type_tag: Option<String>,
    /// Initial position.
    pub position: Position,
    /// Initial parameters.
    pub parameters: Parameters,
}

impl PlatformSpec {
    /// A platform at the origin with the default type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: None,
            position: Position::default(),
            parameters: Parameters::new(),
        }
    }

    /// Set the type tag.
    pub fn with_type(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    /// Set the position. Range checks happen when the platform is added.
    pub fn at(mut self, latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        self.position = Position {
            latitude,
            longitude,
            altitude_m,
        };
        self
    }

    /// Add one parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Partial platform update. `None` fields are left as they are;
/// `parameters` are merged key by key over the existing map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlatformUpdate {
    /// New latitude.
    pub latitude: Option<f64>,
    /// New longitude.
    pub longitude: Option<f64>,
    /// New altitude.
    pub altitude_m: Option<f64>,
    /// New type tag.
    pub type_tag: Option<String>,
    /// Parameters to insert or overwrite.
    pub parameters: Option<Parameters>,
}

impl PlatformUpdate {
    /// Whether applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.altitude_m.is_none()
            && self.type_tag.is_none()
            && self.parameters.is_none()
    }
}

// ── EntityManager ───────────────────────────────────────────────

/// Mutating view over one scenario's platforms and components.
pub struct EntityManager<'a> {
    scenario: &'a mut Scenario,
}

impl<'a> EntityManager<'a> {
    /// Borrow `scenario` for editing.
    pub fn new(scenario: &'a mut Scenario) -> Self {
        Self { scenario }
    }

    /// The scenario being edited.
    pub fn scenario(&self) -> &Scenario {
        self.scenario
    }

    /// Add a platform. A duplicate name is rejected and the existing
    /// platform is left untouched.
    pub fn add_platform(&mut self, spec: PlatformSpec) -> Result<&Platform, EntityError> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyName { what: "platform" }.into());
        }
        spec.position.check()?;
        if self.scenario.platform(&name).is_some() {
            return Err(EntityError::DuplicatePlatform { name });
        }
        let type_tag = match spec.type_tag {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_PLATFORM_TYPE.to_string(),
        };
        let platform = Platform::new(name.clone(), type_tag, spec.position, spec.parameters);
        info!(scenario = %self.scenario.name, platform = %name, "platform added");
        let platforms = self.scenario.platforms_mut();
        let (idx, _) = platforms.insert_full(name, platform);
        Ok(&platforms[idx])
    }

    /// Remove a platform and all its components.
    pub fn delete_platform(&mut self, name: &str) -> Result<Platform, EntityError> {
        let removed = self
            .scenario
            .platforms_mut()
            .shift_remove(name)
            .ok_or_else(|| EntityError::PlatformNotFound {
                name: name.to_string(),
            })?;
        info!(scenario = %self.scenario.name, platform = %name, "platform deleted");
        Ok(removed)
    }

    /// Apply a partial update. The resulting position is checked before
    /// anything is written.
    pub fn modify_platform(
        &mut self,
        name: &str,
        update: PlatformUpdate,
    ) -> Result<&Platform, EntityError> {
        let platform = self.platform_mut(name)?;
        let position = Position {
            latitude: update.latitude.unwrap_or(platform.position.latitude),
            longitude: update.longitude.unwrap_or(platform.position.longitude),
            altitude_m: update.altitude_m.unwrap_or(platform.position.altitude_m),
        };
        position.check()?;

        platform.position = position;
        if let Some(t) = update.type_tag.filter(|t| !t.trim().is_empty()) {
            platform.type_tag = t;
        }
        if let Some(params) = update.parameters {
            platform.parameters.extend(params);
        }
        debug!(platform = %name, "platform modified");
        Ok(platform)
    }

    /// Look up a platform.
    pub fn get_platform(&self, name: &str) -> Result<&Platform, EntityError> {
        self.scenario
            .platform(name)
            .ok_or_else(|| EntityError::PlatformNotFound {
                name: name.to_string(),
            })
    }

    /// All platforms in insertion order.
    pub fn list_platforms(&self) -> Vec<&Platform> {
        self.scenario.platforms().collect()
    }

    /// Attach a component and return its slot id.
    ///
    /// A mover always lands in slot `mover` and is rejected if one exists.
    /// Other kinds take `<kind>_<n>` with the lowest free `n >= 1`.
    pub fn add_component(
        &mut self,
        platform: &str,
        kind: ComponentKind,
        type_tag: Option<String>,
        parameters: Parameters,
    ) -> Result<String, EntityError> {
        let p = self.platform_mut(platform)?;
        let slot = if kind.is_singular() {
            if p.count_of(kind) > 0 || p.component(kind.as_str()).is_some() {
                return Err(EntityError::SlotOccupied {
                    platform: platform.to_string(),
                    kind,
                });
            }
            kind.as_str().to_string()
        } else {
            next_free_slot(p, kind)
        };
        let component = Component::new(slot.clone(), kind, type_tag, parameters);
        info!(platform = %platform, slot = %slot, type_tag = %component.type_tag, "component added");
        p.components_mut().insert(slot.clone(), component);
        Ok(slot)
    }

    /// Detach the component in `slot`.
    pub fn remove_component(&mut self, platform: &str, slot: &str) -> Result<Component, EntityError> {
        let p = self.platform_mut(platform)?;
        let removed =
            p.components_mut()
                .shift_remove(slot)
                .ok_or_else(|| EntityError::ComponentNotFound {
                    platform: platform.to_string(),
                    slot: slot.to_string(),
                })?;
        info!(platform = %platform, slot = %slot, "component removed");
        Ok(removed)
    }

    /// Components of one platform in insertion order.
    pub fn list_components(&self, platform: &str) -> Result<Vec<&Component>, EntityError> {
        Ok(self.get_platform(platform)?.components().collect())
    }

    fn platform_mut(&mut self, name: &str) -> Result<&mut Platform, EntityError> {
        self.scenario
            .platforms_mut()
            .get_mut(name)
            .ok_or_else(|| EntityError::PlatformNotFound {
                name: name.to_string(),
            })
    }
}

fn next_free_slot(p: &Platform, kind: ComponentKind) -> String {
    let mut n = 1usize;
    loop {
        let slot = format!("{}_{n}", kind.as_str());
        if p.component(&slot).is_none() {
            return slot;
        }
        n += 1;
    }
}
