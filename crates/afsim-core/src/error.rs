//! Error taxonomy shared across the workspace.
//!
//! Every subsystem defines its own error enum; each one classifies itself
//! into an [`ErrorKind`] so the calling layer can report a stable kind next
//! to the human-readable detail.

use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::component::ComponentKind;

/// Coarse classification of every error the core surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input; retry with corrected input.
    Validation,
    /// A referenced scenario, platform, component, run or file is absent.
    NotFound,
    /// Duplicate name, occupied slot, or an operation illegal in the
    /// current state.
    Conflict,
    /// A scenario or result file could not be parsed.
    Parse,
    /// The external simulator is missing, failed to spawn, or misbehaved.
    Process,
    /// A bounded wait expired.
    Timeout,
    /// Filesystem failure unrelated to parsing.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Parse => "parse",
            Self::Process => "process",
            Self::Timeout => "timeout",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

// ── ModelError ──────────────────────────────────────────────────

/// A value rejected by a data-model constructor.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// A name (scenario, platform) is empty or whitespace.
    EmptyName {
        /// What was being named.
        what: &'static str,
    },
    /// Duration is zero, negative, or not finite.
    InvalidDuration {
        /// The rejected value.
        value: f64,
    },
    /// Time step is zero, negative, or not finite.
    InvalidTimeStep {
        /// The rejected value.
        value: f64,
    },
    /// Latitude outside `[-90, 90]` or not finite.
    LatitudeOutOfRange {
        /// The rejected value.
        value: f64,
    },
    /// Longitude outside `[-180, 180]` or not finite.
    LongitudeOutOfRange {
        /// The rejected value.
        value: f64,
    },
    /// Altitude is NaN or infinite.
    NonFiniteAltitude {
        /// The rejected value.
        value: f64,
    },
}

impl ModelError {
    /// Always [`ErrorKind::Validation`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName { what } => write!(f, "{what} name must not be empty"),
            Self::InvalidDuration { value } => {
                write!(f, "duration must be finite and positive, got {value}")
            }
            Self::InvalidTimeStep { value } => {
                write!(f, "time step must be finite and positive, got {value}")
            }
            Self::LatitudeOutOfRange { value } => {
                write!(f, "latitude {value} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange { value } => {
                write!(f, "longitude {value} is outside [-180, 180]")
            }
            Self::NonFiniteAltitude { value } => write!(f, "altitude must be finite, got {value}"),
        }
    }
}

impl Error for ModelError {}

// ── EntityError ─────────────────────────────────────────────────

/// Errors from [`EntityManager`](crate::EntityManager) graph mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityError {
    /// The supplied platform data is invalid.
    Invalid(ModelError),
    /// No platform with this name exists in the scenario.
    PlatformNotFound {
        /// The requested platform name.
        name: String,
    },
    /// A platform with this name already exists.
    DuplicatePlatform {
        /// The conflicting name.
        name: String,
    },
    /// The platform has no component in this slot.
    ComponentNotFound {
        /// Owning platform.
        platform: String,
        /// The requested slot.
        slot: String,
    },
    /// The platform already holds the single component this kind allows.
    SlotOccupied {
        /// Owning platform.
        platform: String,
        /// The singular kind that is already present.
        kind: ComponentKind,
    },
}

impl EntityError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(e) => e.kind(),
            Self::PlatformNotFound { .. } | Self::ComponentNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicatePlatform { .. } | Self::SlotOccupied { .. } => ErrorKind::Conflict,
        }
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid platform: {e}"),
            Self::PlatformNotFound { name } => write!(f, "platform '{name}' not found"),
            Self::DuplicatePlatform { name } => write!(f, "platform '{name}' already exists"),
            Self::ComponentNotFound { platform, slot } => {
                write!(f, "platform '{platform}' has no component in slot '{slot}'")
            }
            Self::SlotOccupied { platform, kind } => {
                write!(f, "platform '{platform}' already has a {kind}")
            }
        }
    }
}

impl Error for EntityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for EntityError {
    fn from(e: ModelError) -> Self {
        Self::Invalid(e)
    }
}
