//! Error type for scenario registry and file operations.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use afsim_core::{EntityError, ErrorKind, ModelError, ScenarioId};

/// Errors from [`ScenarioStore`](crate::ScenarioStore) operations.
#[derive(Debug)]
pub enum ScenarioError {
    /// Scenario settings were rejected.
    Invalid(ModelError),
    /// A platform or component edit was rejected.
    Entity(EntityError),
    /// No scenario with this id is registered.
    NotFound {
        /// The requested id.
        id: ScenarioId,
    },
    /// The scenario file does not exist.
    FileNotFound {
        /// The requested path.
        path: PathBuf,
    },
    /// The file extension is not a scenario format.
    UnsupportedExtension {
        /// The offending path.
        path: PathBuf,
    },
    /// The scenario file is malformed.
    Parse {
        /// File being read.
        path: PathBuf,
        /// 1-based line, 0 when unknown.
        line: usize,
        /// 1-based column, 0 when unknown.
        column: usize,
        /// What was wrong.
        detail: String,
    },
    /// Filesystem failure.
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

impl ScenarioError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(e) => e.kind(),
            Self::Entity(e) => e.kind(),
            Self::NotFound { .. } | Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::UnsupportedExtension { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid scenario: {e}"),
            Self::Entity(e) => write!(f, "{e}"),
            Self::NotFound { id } => write!(f, "scenario {id} not found"),
            Self::FileNotFound { path } => {
                write!(f, "scenario file not found: {}", path.display())
            }
            Self::UnsupportedExtension { path } => write!(
                f,
                "unsupported scenario file '{}' (expected .json, .afsim or .txt)",
                path.display()
            ),
            Self::Parse {
                path,
                line,
                column,
                detail,
            } => write!(
                f,
                "{}:{line}:{column}: {detail}",
                path.display()
            ),
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
        }
    }
}

impl Error for ScenarioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            Self::Entity(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ModelError> for ScenarioError {
    fn from(e: ModelError) -> Self {
        Self::Invalid(e)
    }
}

impl From<EntityError> for ScenarioError {
    fn from(e: EntityError) -> Self {
        Self::Entity(e)
    }
}
