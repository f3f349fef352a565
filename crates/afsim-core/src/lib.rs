//! Core types for driving an AFSIM simulator.
//!
//! This is the leaf crate of the workspace. It defines the scenario graph
//! (scenarios, platforms, components), the [`EntityManager`] that mutates
//! that graph while enforcing its invariants, the simulation-run state
//! machine, the normalized result-record representation, and the error
//! taxonomy shared by every other crate.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod component;
pub mod entity;
pub mod error;
pub mod fs;
pub mod id;
pub mod platform;
pub mod record;
pub mod run;
pub mod scenario;

mod keyed;

pub use component::{Component, ComponentKind};
pub use entity::{EntityManager, PlatformSpec, PlatformUpdate};
pub use error::{EntityError, ErrorKind, ModelError};
pub use id::{RunId, ScenarioId};
pub use platform::{Platform, Position};
pub use record::{Field, FieldValue, ResultFormat, ResultRecord};
pub use run::{RunState, SimulationRun, TransitionError};
pub use scenario::Scenario;

/// Free-form parameter map attached to scenarios, platforms and components.
///
/// Insertion order is preserved so rendered scenario text is stable.
pub type Parameters = indexmap::IndexMap<String, serde_json::Value>;
