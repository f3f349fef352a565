//! Simulation-run lifecycle for the AFSIM simulator.
//!
//! [`RunController`] validates a scenario, renders it into a fresh output
//! directory, starts the simulator binary and hands the child process to a
//! supervisor thread. The supervisor polls every child, applies exit
//! transitions, and enforces the grace period on stop requests:
//!
//! ```text
//! PENDING ──spawn──▶ RUNNING ──exit 0──▶ COMPLETED
//!    │                  ├──exit ≠ 0──▶ FAILED
//!    │                  └──stop──────▶ STOPPED  (SIGTERM, SIGKILL after grace)
//!    ├──dry run──────▶ COMPLETED
//!    └──no binary / spawn error──▶ FAILED
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod process;
mod supervisor;

pub use config::{
    ConfigError, ControllerConfig, Installation, SimulatorConfig, SimulatorTool, AFSIM_BINARY_ENV,
    AFSIM_HOME_ENV,
};
pub use controller::{RunController, RunOptions};
pub use error::RunError;
pub use process::LOG_FILE;
pub use supervisor::StopOutcome;
