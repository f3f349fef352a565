//! Scenario registry and persistence.
//!
//! [`ScenarioStore`] holds every scenario the caller is working on, keyed by
//! [`ScenarioId`](afsim_core::ScenarioId). Scenarios are saved as JSON
//! documents (lossless) and rendered to AFSIM scenario text for the
//! simulator. AFSIM text can also be imported, with the loss described in
//! [`afsim_text`].
//!
//! Structural checks live in [`validate`]; they report every problem found
//! rather than stopping at the first.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod afsim_text;
pub mod error;
pub mod persist;
pub mod store;
pub mod validate;

pub use error::ScenarioError;
pub use store::{file_stem, ScenarioSpec, ScenarioStore, ScenarioSummary};
pub use validate::{has_errors, validate, IssueCode, Severity, ValidationIssue};
