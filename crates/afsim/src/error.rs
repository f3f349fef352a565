//! The facade's unified error.

use std::fmt;

use afsim_core::{EntityError, ErrorKind, ModelError};
use afsim_results::ResultError;
use afsim_run::{ConfigError, RunError};
use afsim_scenario::ScenarioError;

use crate::config::ConfigFileError;

/// Any failure an [`AfsimService`](crate::AfsimService) call can report.
///
/// Callers usually branch on [`kind`](Self::kind) and show the message.
#[derive(Debug)]
pub enum Error {
    /// Scenario registry, file or entity error.
    Scenario(ScenarioError),
    /// Run controller error.
    Run(RunError),
    /// Result discovery, parsing or export error.
    Results(ResultError),
    /// Service configuration file error.
    Config(ConfigFileError),
}

impl Error {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Scenario(e) => e.kind(),
            Self::Run(e) => e.kind(),
            Self::Results(e) => e.kind(),
            Self::Config(e) => e.kind(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scenario(e) => write!(f, "{e}"),
            Self::Run(e) => write!(f, "{e}"),
            Self::Results(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scenario(e) => Some(e),
            Self::Run(e) => Some(e),
            Self::Results(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<ScenarioError> for Error {
    fn from(e: ScenarioError) -> Self {
        Self::Scenario(e)
    }
}

impl From<EntityError> for Error {
    fn from(e: EntityError) -> Self {
        Self::Scenario(ScenarioError::Entity(e))
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Self::Scenario(ScenarioError::Invalid(e))
    }
}

impl From<RunError> for Error {
    fn from(e: RunError) -> Self {
        Self::Run(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Run(RunError::Config(e))
    }
}

impl From<ResultError> for Error {
    fn from(e: ResultError) -> Self {
        Self::Results(e)
    }
}

impl From<ConfigFileError> for Error {
    fn from(e: ConfigFileError) -> Self {
        Self::Config(e)
    }
}

/// Result alias for facade calls.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use afsim_core::ScenarioId;

    #[test]
    fn kinds_pass_through() {
        let e: Error = ScenarioError::NotFound {
            id: ScenarioId::new(),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let e: Error = EntityError::DuplicatePlatform { name: "a".into() }.into();
        assert_eq!(e.kind(), ErrorKind::Conflict);

        let e: Error = ConfigError::ZeroPollInterval.into();
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert!(e.to_string().contains("poll interval"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
