//! Components attached to a platform: movers, sensors, weapons and others.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keyed::Keyed;
use crate::Parameters;

/// Well-known simulator type tags. Type tags stay open strings; these are
/// the defaults and the common alternatives.
pub mod types {
    /// Default mover.
    pub const ROUTE_MOVER: &str = "wsf_route_mover";
    /// Stationary mover.
    pub const FIXED_MOVER: &str = "wsf_fixed_mover";
    /// Air vehicle mover.
    pub const AIR_MOVER: &str = "wsf_air_mover";
    /// Ground vehicle mover.
    pub const GROUND_MOVER: &str = "wsf_ground_mover";
    /// Default sensor.
    pub const RADAR_SENSOR: &str = "wsf_radar_sensor";
    /// Electro-optical sensor.
    pub const EO_SENSOR: &str = "wsf_eo_sensor";
    /// Infrared sensor.
    pub const IR_SENSOR: &str = "wsf_ir_sensor";
    /// Default weapon.
    pub const MISSILE: &str = "wsf_missile";
    /// Gravity bomb.
    pub const BOMB: &str = "wsf_bomb";
    /// Default for [`ComponentKind::Other`](super::ComponentKind::Other).
    pub const GENERIC_COMPONENT: &str = "wsf_component";
}

/// Role of a component on its platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Moves the platform. At most one per platform.
    Mover,
    /// Detects other platforms.
    Sensor,
    /// Engages other platforms.
    Weapon,
    /// Anything else the simulator understands (comms, processors, ...).
    Other,
}

impl ComponentKind {
    /// All kinds, in rendering order.
    pub const ALL: [ComponentKind; 4] = [Self::Mover, Self::Sensor, Self::Weapon, Self::Other];

    /// Lowercase name used in slot ids and rendered text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mover => "mover",
            Self::Sensor => "sensor",
            Self::Weapon => "weapon",
            Self::Other => "other",
        }
    }

    /// Type tag used when the caller does not supply one.
    pub fn default_type(self) -> &'static str {
        match self {
            Self::Mover => types::ROUTE_MOVER,
            Self::Sensor => types::RADAR_SENSOR,
            Self::Weapon => types::MISSILE,
            Self::Other => types::GENERIC_COMPONENT,
        }
    }

    /// Whether a platform may hold only one component of this kind.
    pub fn is_singular(self) -> bool {
        matches!(self, Self::Mover)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mover" => Ok(Self::Mover),
            "sensor" => Ok(Self::Sensor),
            "weapon" => Ok(Self::Weapon),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown component kind '{s}'")),
        }
    }
}

/// A mover, sensor, weapon or other component owned by one platform.
///
/// Constructed only through [`EntityManager::add_component`](crate::EntityManager::add_component),
/// which assigns the slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    slot: String,
    kind: ComponentKind,
    /// Simulator type tag, e.g. `wsf_radar_sensor`.
    pub type_tag: String,
    /// Free-form parameters rendered as `key value` lines.
    #[serde(default)]
    pub parameters: Parameters,
}

impl Component {
    pub(crate) fn new(
        slot: String,
        kind: ComponentKind,
        type_tag: Option<String>,
        parameters: Parameters,
    ) -> Self {
        let type_tag = match type_tag {
            Some(t) if !t.trim().is_empty() => t,
            _ => kind.default_type().to_string(),
        };
        Self {
            slot,
            kind,
            type_tag,
            parameters,
        }
    }

    /// Slot id, unique within the owning platform.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Component role.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }
}

impl Keyed for Component {
    fn key(&self) -> &str {
        &self.slot
    }
}
