//! Simulator discovery and controller configuration.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use afsim_core::ErrorKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming the AFSIM installation root.
pub const AFSIM_HOME_ENV: &str = "AFSIM_HOME";
/// Environment variable naming the simulator binary explicitly.
pub const AFSIM_BINARY_ENV: &str = "AFSIM_BINARY";

// ── SimulatorTool ───────────────────────────────────────────────

/// The AFSIM executables this crate knows how to find.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SimulatorTool {
    /// Scenario builder.
    Wizard,
    /// Mission planner.
    Mission,
    /// Batch runner. Used for simulation runs.
    #[default]
    Warlock,
    /// Post-processor.
    Mystic,
}

impl SimulatorTool {
    /// Every tool, in discovery order.
    pub const ALL: [SimulatorTool; 4] = [Self::Wizard, Self::Mission, Self::Warlock, Self::Mystic];

    /// Lowercase key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wizard => "wizard",
            Self::Mission => "mission",
            Self::Warlock => "warlock",
            Self::Mystic => "mystic",
        }
    }

    /// Executable file name, without platform suffix.
    pub fn executable(self) -> &'static str {
        match self {
            Self::Wizard => "wsf_wizard",
            Self::Mission => "wsf_mission",
            Self::Warlock => "wsf_warlock",
            Self::Mystic => "wsf_mystic",
        }
    }
}

impl fmt::Display for SimulatorTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulatorTool {
    type Err = ConfigError;

    /// Accepts the key or the executable name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower || t.executable() == lower)
            .ok_or_else(|| ConfigError::UnknownTool {
                name: s.to_string(),
            })
    }
}

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected by [`ControllerConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The output root is an empty path.
    EmptyOutputRoot,
    /// The supervisor poll interval is zero.
    ZeroPollInterval,
    /// The simulator output flag is blank.
    EmptyOutputFlag,
    /// A tool name matched none of the known tools.
    UnknownTool {
        /// The name given.
        name: String,
    },
}

impl ConfigError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOutputRoot => write!(f, "output root must not be empty"),
            Self::ZeroPollInterval => write!(f, "poll interval must be positive"),
            Self::EmptyOutputFlag => write!(f, "simulator output flag must not be blank"),
            Self::UnknownTool { name } => write!(
                f,
                "unknown AFSIM tool '{name}' (expected wizard, mission, warlock or mystic)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── SimulatorConfig ─────────────────────────────────────────────

/// Where the simulator lives and how it is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Explicit binary for [`tool`](Self::tool). Wins over everything else.
    pub binary: Option<PathBuf>,
    /// Installation root; executables are looked up in `<home>/bin`.
    pub afsim_home: Option<PathBuf>,
    /// Executable used for runs.
    pub tool: SimulatorTool,
    /// Flag preceding the output directory argument.
    pub output_flag: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            binary: None,
            afsim_home: None,
            tool: SimulatorTool::default(),
            output_flag: "-o".to_string(),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl SimulatorConfig {
    /// Defaults overlaid with `AFSIM_BINARY` and `AFSIM_HOME`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `AFSIM_BINARY` and `AFSIM_HOME` where set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(binary) = env_path(AFSIM_BINARY_ENV) {
            self.binary = Some(binary);
        }
        if let Some(home) = env_path(AFSIM_HOME_ENV) {
            self.afsim_home = Some(home);
        }
    }

    /// Binary used for runs: explicit path, then `<home>/bin`, then `PATH`.
    ///
    /// An explicit path is returned even if it does not exist, so the
    /// failure names what was configured.
    pub fn resolve_binary(&self) -> Option<PathBuf> {
        self.resolve_tool(self.tool)
    }

    /// Resolve any tool. The explicit binary only applies to the run tool.
    pub fn resolve_tool(&self, tool: SimulatorTool) -> Option<PathBuf> {
        if tool == self.tool {
            if let Some(binary) = &self.binary {
                return Some(binary.clone());
            }
        }
        let exe = tool.executable();
        if let Some(home) = &self.afsim_home {
            let candidate = home.join("bin").join(exe);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
        find_in_path(exe)
    }

    /// Report every tool's resolution.
    pub fn detect_installation(&self) -> Installation {
        let mut config = self.clone();
        if config.afsim_home.is_none() {
            config.afsim_home = env_path(AFSIM_HOME_ENV);
        }
        let binaries: IndexMap<_, _> = SimulatorTool::ALL
            .into_iter()
            .map(|tool| (tool, config.resolve_tool(tool)))
            .collect();
        let all_found = binaries.values().all(Option::is_some);
        debug!(?binaries, all_found, "AFSIM installation probed");
        Installation {
            afsim_home: config.afsim_home,
            binaries,
            all_found,
        }
    }
}

/// Result of probing for AFSIM executables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// Installation root used for the probe.
    pub afsim_home: Option<PathBuf>,
    /// Resolved path per tool.
    pub binaries: IndexMap<SimulatorTool, Option<PathBuf>>,
    /// Every tool resolved.
    pub all_found: bool,
}

/// Whether `path` is a file the current user could execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn find_in_path(exe: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(exe);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let with_ext = candidate.with_extension("exe");
            if is_executable(&with_ext) {
                return Some(with_ext);
            }
        }
        None
    })
}

// ── ControllerConfig ────────────────────────────────────────────

/// Settings for [`RunController`](crate::RunController).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Parent of every run's output directory.
    pub output_root: PathBuf,
    /// Time between SIGTERM and the forced kill.
    pub stop_grace: Duration,
    /// How often the supervisor polls its children.
    pub poll_interval: Duration,
    /// Simulator discovery and invocation.
    pub simulator: SimulatorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("simulation_output"),
            stop_grace: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Defaults rooted at `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputRoot);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.simulator.output_flag.trim().is_empty() {
            return Err(ConfigError::EmptyOutputFlag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names() {
        assert_eq!("Warlock".parse::<SimulatorTool>().unwrap(), SimulatorTool::Warlock);
        assert_eq!("wsf_mystic".parse::<SimulatorTool>().unwrap(), SimulatorTool::Mystic);
        assert!(matches!(
            "sage".parse::<SimulatorTool>(),
            Err(ConfigError::UnknownTool { .. })
        ));
        assert_eq!(SimulatorTool::default().executable(), "wsf_warlock");
    }

    #[test]
    fn explicit_binary_wins_even_if_missing() {
        let config = SimulatorConfig {
            binary: Some(PathBuf::from("/nonexistent/wsf_warlock")),
            ..SimulatorConfig::default()
        };
        assert_eq!(
            config.resolve_binary(),
            Some(PathBuf::from("/nonexistent/wsf_warlock"))
        );
        // Only the run tool is overridden.
        assert_ne!(
            config.resolve_tool(SimulatorTool::Wizard),
            Some(PathBuf::from("/nonexistent/wsf_warlock"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn home_bin_lookup_requires_executable() {
        use std::os::unix::fs::PermissionsExt;
        let home = tempfile::tempdir().unwrap();
        let bin = home.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join("wsf_warlock");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        let config = SimulatorConfig {
            afsim_home: Some(home.path().to_path_buf()),
            ..SimulatorConfig::default()
        };
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_ne!(config.resolve_binary(), Some(exe.clone()));
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(config.resolve_binary(), Some(exe));

        let install = config.detect_installation();
        assert_eq!(install.binaries.len(), 4);
        assert!(install.binaries[&SimulatorTool::Warlock].is_some());
    }

    #[test]
    fn controller_defaults_and_validation() {
        let config = ControllerConfig::new("/tmp/out");
        assert_eq!(config.stop_grace, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert!(config.validate().is_ok());

        let bad = ControllerConfig {
            poll_interval: Duration::ZERO,
            ..config.clone()
        };
        assert_eq!(bad.validate(), Err(ConfigError::ZeroPollInterval));
        let bad = ControllerConfig::new("");
        assert_eq!(bad.validate(), Err(ConfigError::EmptyOutputRoot));
        let mut bad = config;
        bad.simulator.output_flag = " ".into();
        assert_eq!(bad.validate(), Err(ConfigError::EmptyOutputFlag));
    }

    #[test]
    fn simulator_config_deserializes_partially() {
        let config: SimulatorConfig = serde_json::from_str(r#"{"tool": "mission"}"#).unwrap();
        assert_eq!(config.tool, SimulatorTool::Mission);
        assert_eq!(config.output_flag, "-o");
        assert_eq!(config.binary, None);
    }
}
