//! Platforms and their geographic positions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentKind};
use crate::error::ModelError;
use crate::keyed::{self, Keyed};
use crate::Parameters;

/// Platform type tag used when none is given.
pub const DEFAULT_PLATFORM_TYPE: &str = "wsf_platform";

/// Geodetic position: degrees of latitude/longitude, metres of altitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees north, `[-90, 90]`.
    pub latitude: f64,
    /// Degrees east, `[-180, 180]`.
    pub longitude: f64,
    /// Metres above the reference ellipsoid.
    pub altitude_m: f64,
}

impl Position {
    /// Construct a checked position.
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Result<Self, ModelError> {
        let p = Self {
            latitude,
            longitude,
            altitude_m,
        };
        p.check()?;
        Ok(p)
    }

    /// Re-check the range invariants, e.g. after a document was edited by hand.
    pub fn check(&self) -> Result<(), ModelError> {
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(ModelError::LatitudeOutOfRange {
                value: self.latitude,
            });
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(ModelError::LongitudeOutOfRange {
                value: self.longitude,
            });
        }
        if !self.altitude_m.is_finite() {
            return Err(ModelError::NonFiniteAltitude {
                value: self.altitude_m,
            });
        }
        Ok(())
    }
}

/// A simulated entity: an aircraft, ship, ground site or similar.
///
/// The name is fixed once the platform joins a scenario; components are
/// changed only through [`EntityManager`](crate::EntityManager).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    name: String,
    /// Simulator type tag, default [`DEFAULT_PLATFORM_TYPE`].
    pub type_tag: String,
    /// Current position.
    pub position: Position,
    /// Free-form parameters rendered as `key value` lines.
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default, with = "keyed")]
    components: IndexMap<String, Component>,
}

impl Platform {
    pub(crate) fn new(
        name: String,
        type_tag: String,
        position: Position,
        parameters: Parameters,
    ) -> Self {
        Self {
            name,
            type_tag,
            position,
            parameters,
            components: IndexMap::new(),
        }
    }

    /// Unique name within the owning scenario.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Components in insertion order.
    pub fn components(&self) -> impl ExactSizeIterator<Item = &Component> {
        self.components.values()
    }

    /// Component in `slot`, if any.
    pub fn component(&self, slot: &str) -> Option<&Component> {
        self.components.get(slot)
    }

    /// The platform's mover, if it has one.
    pub fn mover(&self) -> Option<&Component> {
        self.components
            .values()
            .find(|c| c.kind() == ComponentKind::Mover)
    }

    /// Number of components of `kind`.
    pub fn count_of(&self, kind: ComponentKind) -> usize {
        self.components.values().filter(|c| c.kind() == kind).count()
    }

    pub(crate) fn components_mut(&mut self) -> &mut IndexMap<String, Component> {
        &mut self.components
    }
}

impl Keyed for Platform {
    fn key(&self) -> &str {
        &self.name
    }
}
