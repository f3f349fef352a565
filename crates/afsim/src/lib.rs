//! Drive the AFSIM simulator through a typed API.
//!
//! This is the facade crate. [`AfsimService`] exposes every scenario, run
//! and result operation as a method returning serializable values or an
//! [`Error`] with an [`ErrorKind`](prelude::ErrorKind). A transport layer
//! only has to map method calls and render the results.
//!
//! # Quick start
//!
//! ```no_run
//! use afsim::prelude::*;
//!
//! # fn main() -> afsim::Result<()> {
//! let afsim = AfsimService::new(ServiceConfig::from_env())?;
//! let scenario = afsim.create_scenario("intercept", 600.0)?;
//! afsim.add_platform(
//!     scenario.id(),
//!     PlatformSpec::new("blue_1").with_type("F-16").at(38.8, -77.0, 9000.0),
//! )?;
//! let run = afsim.run_simulation(scenario.id(), RunOptions::default())?;
//! let run = afsim.wait_for_run(run.id(), std::time::Duration::from_secs(600))?;
//! for file in afsim.list_run_results(run.id(), None)? {
//!     let summary = afsim.get_results_summary(&file.path)?;
//!     println!("{}: {} records", file.path.display(), summary.records);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `afsim-core` | Scenario graph, entity manager, runs, records, error kinds |
//! | [`scenario`] | `afsim-scenario` | Scenario store, validation, AFSIM text |
//! | [`run`] | `afsim-run` | Run controller, simulator discovery |
//! | [`results`] | `afsim-results` | Result discovery, parsers, query, summary, export |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigFileError, ServiceConfig, OUTPUT_DIR_ENV, SCENARIOS_DIR_ENV};
pub use error::{Error, Result};
pub use service::AfsimService;

/// Scenario graph, run records and shared error kinds (`afsim-core`).
pub use afsim_core as types;

/// Scenario registry, persistence and validation (`afsim-scenario`).
pub use afsim_scenario as scenario;

/// Simulator process supervision (`afsim-run`).
pub use afsim_run as run;

/// Result-file engine (`afsim-results`).
pub use afsim_results as results;

/// Common imports.
///
/// ```rust
/// use afsim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{AfsimService, Error, ServiceConfig};

    // Model
    pub use afsim_core::{
        Component, ComponentKind, ErrorKind, FieldValue, Parameters, Platform, PlatformSpec,
        PlatformUpdate, Position, ResultFormat, ResultRecord, RunId, RunState, Scenario,
        ScenarioId, SimulationRun,
    };

    // Scenarios
    pub use afsim_scenario::{ScenarioSpec, Severity, ValidationIssue};

    // Runs
    pub use afsim_run::{RunOptions, SimulatorTool, StopOutcome};

    // Results
    pub use afsim_results::{Filter, QueryOptions, QueryResult, ResultSummary};
}
