//! Service configuration: JSON file, defaults and environment overlay.

use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use afsim_core::ErrorKind;
use afsim_run::{ControllerConfig, SimulatorConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable overriding [`ServiceConfig::scenarios_dir`].
pub const SCENARIOS_DIR_ENV: &str = "AFSIM_SCENARIOS_DIR";
/// Environment variable overriding [`ServiceConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "AFSIM_OUTPUT_DIR";

/// Everything [`AfsimService`](crate::AfsimService) needs to start.
///
/// Every field has a default, so a config file only lists what differs:
///
/// ```json
/// { "output_dir": "/data/runs", "stop_grace_ms": 2000,
///   "simulator": { "afsim_home": "/opt/afsim", "tool": "mission" } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Default location for saved scenarios.
    pub scenarios_dir: PathBuf,
    /// Parent of every run's output directory.
    pub output_dir: PathBuf,
    /// Milliseconds between SIGTERM and the forced kill.
    pub stop_grace_ms: u64,
    /// Milliseconds between supervisor polls.
    pub poll_interval_ms: u64,
    /// Simulator discovery and invocation.
    pub simulator: SimulatorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: controller.output_root,
            stop_grace_ms: duration_ms(controller.stop_grace),
            poll_interval_ms: duration_ms(controller.poll_interval),
            simulator: controller.simulator,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl ServiceConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigFileError::Parse {
            path: path.to_path_buf(),
            line: e.line(),
            column: e.column(),
            detail: e.to_string(),
        })?;
        info!(path = %path.display(), "service configuration loaded");
        Ok(config)
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `AFSIM_SCENARIOS_DIR`, `AFSIM_OUTPUT_DIR`, `AFSIM_HOME` and
    /// `AFSIM_BINARY` where set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(dir) = env_path(SCENARIOS_DIR_ENV) {
            self.scenarios_dir = dir;
        }
        if let Some(dir) = env_path(OUTPUT_DIR_ENV) {
            self.output_dir = dir;
        }
        self.simulator.apply_env();
    }

    /// Run controller settings derived from this config.
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            output_root: self.output_dir.clone(),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            simulator: self.simulator.clone(),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// A config file could not be read.
#[derive(Debug)]
pub enum ConfigFileError {
    /// The file could not be opened or read.
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file is not a valid config document.
    Parse {
        /// Config file path.
        path: PathBuf,
        /// 1-based line.
        line: usize,
        /// 1-based column.
        column: usize,
        /// What was wrong.
        detail: String,
    },
}

impl ConfigFileError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }
}

impl fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse {
                path,
                line,
                column,
                detail,
            } => write!(f, "{}:{line}:{column}: {detail}", path.display()),
        }
    }
}

impl std::error::Error for ConfigFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { .. } => None,
        }
    }
}
