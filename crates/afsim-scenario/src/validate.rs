//! Structural scenario checks.
//!
//! [`validate`] never mutates and never fails: every problem becomes a
//! [`ValidationIssue`]. Only [`Severity::Error`] issues block a run.

use std::collections::HashSet;
use std::fmt;

use afsim_core::{ComponentKind, Parameters, Scenario};
use serde::Serialize;

use crate::afsim_text::is_reserved_key;

/// How serious an issue is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The simulator would reject or misinterpret the scenario.
    Error,
    /// Legal but probably unintended.
    Warning,
}

/// Stable machine-readable issue code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Scenario name is empty.
    EmptyName,
    /// Duration is not a positive finite number.
    InvalidDuration,
    /// Time step is not a positive finite number.
    InvalidTimeStep,
    /// Time step exceeds the duration.
    TimeStepExceedsDuration,
    /// The scenario contains no platforms.
    NoPlatforms,
    /// Two platforms share a name.
    DuplicatePlatform,
    /// A platform name is empty.
    EmptyPlatformName,
    /// A platform position is missing, non-finite or out of range.
    InvalidPosition,
    /// A platform has more than one mover.
    MultipleMovers,
    /// A metadata or parameter key is a scenario-text keyword and would
    /// be dropped from the simulator input.
    ReservedKey,
}

impl IssueCode {
    /// Snake-case code string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::InvalidDuration => "invalid_duration",
            Self::InvalidTimeStep => "invalid_time_step",
            Self::TimeStepExceedsDuration => "time_step_exceeds_duration",
            Self::NoPlatforms => "no_platforms",
            Self::DuplicatePlatform => "duplicate_platform",
            Self::EmptyPlatformName => "empty_platform_name",
            Self::InvalidPosition => "invalid_position",
            Self::MultipleMovers => "multiple_movers",
            Self::ReservedKey => "reserved_key",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Error or warning.
    pub severity: Severity,
    /// Stable code.
    pub code: IssueCode,
    /// Human-readable explanation.
    pub message: String,
    /// Platform concerned, if any.
    pub platform: Option<String>,
}

impl ValidationIssue {
    fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            platform: None,
        }
    }

    fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    fn on(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.platform {
            Some(p) => write!(f, "{sev}[{}] {p}: {}", self.code, self.message),
            None => write!(f, "{sev}[{}] {}", self.code, self.message),
        }
    }
}

/// Whether any issue is error-severity.
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Check `scenario` and report every issue found.
pub fn validate(scenario: &Scenario) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if scenario.name.trim().is_empty() {
        issues.push(ValidationIssue::error(
            IssueCode::EmptyName,
            "scenario name is empty",
        ));
    }
    let duration_ok = scenario.duration_s.is_finite() && scenario.duration_s > 0.0;
    if !duration_ok {
        issues.push(ValidationIssue::error(
            IssueCode::InvalidDuration,
            format!(
                "simulation duration must be positive (got {})",
                scenario.duration_s
            ),
        ));
    }
    let step_ok = scenario.time_step_s.is_finite() && scenario.time_step_s > 0.0;
    if !step_ok {
        issues.push(ValidationIssue::error(
            IssueCode::InvalidTimeStep,
            format!("time step must be positive (got {})", scenario.time_step_s),
        ));
    } else if duration_ok && scenario.time_step_s > scenario.duration_s {
        issues.push(ValidationIssue::warning(
            IssueCode::TimeStepExceedsDuration,
            format!(
                "time step {} s is larger than duration {} s",
                scenario.time_step_s, scenario.duration_s
            ),
        ));
    }
    if scenario.platform_count() == 0 {
        issues.push(ValidationIssue::warning(
            IssueCode::NoPlatforms,
            "scenario has no platforms",
        ));
    }

    if !scenario.keys_consistent() {
        issues.push(ValidationIssue::error(
            IssueCode::DuplicatePlatform,
            "platform registry is inconsistent with platform names",
        ));
    }
    for key in reserved_keys(&scenario.metadata) {
        issues.push(ValidationIssue::error(
            IssueCode::ReservedKey,
            format!("metadata key '{key}' is reserved"),
        ));
    }
    let mut seen = HashSet::new();
    for p in scenario.platforms() {
        let name = p.name();
        if name.trim().is_empty() {
            issues.push(ValidationIssue::error(
                IssueCode::EmptyPlatformName,
                "platform name is empty",
            ));
        }
        if !seen.insert(name) {
            issues.push(
                ValidationIssue::error(
                    IssueCode::DuplicatePlatform,
                    format!("duplicate platform name '{name}'"),
                )
                .on(name),
            );
        }
        if let Err(e) = p.position.check() {
            issues.push(
                ValidationIssue::error(IssueCode::InvalidPosition, format!("invalid position: {e}"))
                    .on(name),
            );
        }
        let movers = p.count_of(ComponentKind::Mover);
        if movers > 1 {
            issues.push(
                ValidationIssue::error(
                    IssueCode::MultipleMovers,
                    format!("platform has {movers} movers, at most one is allowed"),
                )
                .on(name),
            );
        }
        for key in reserved_keys(&p.parameters) {
            issues.push(
                ValidationIssue::error(IssueCode::ReservedKey, format!("parameter key '{key}' is reserved"))
                    .on(name),
            );
        }
        for c in p.components() {
            for key in reserved_keys(&c.parameters) {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::ReservedKey,
                        format!("{} parameter key '{key}' is reserved", c.slot()),
                    )
                    .on(name),
                );
            }
        }
    }

    issues
}

fn reserved_keys(params: &Parameters) -> impl Iterator<Item = &str> {
    params.keys().map(String::as_str).filter(|k| is_reserved_key(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afsim_core::{EntityManager, PlatformSpec};

    #[test]
    fn fresh_scenario_only_warns_about_platforms() {
        let s = Scenario::new("empty", 60.0).unwrap();
        let issues = validate(&s);
        assert!(!has_errors(&issues));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::NoPlatforms);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn hand_edited_fields_are_reported() {
        let mut s = Scenario::new("x", 60.0).unwrap();
        EntityManager::new(&mut s)
            .add_platform(PlatformSpec::new("a"))
            .unwrap();
        s.name = String::new();
        s.duration_s = -1.0;
        s.time_step_s = 0.0;
        let codes: Vec<_> = validate(&s).into_iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            [
                IssueCode::EmptyName,
                IssueCode::InvalidDuration,
                IssueCode::InvalidTimeStep
            ]
        );
    }

    #[test]
    fn large_time_step_is_a_warning() {
        let s = Scenario::new("x", 10.0)
            .unwrap()
            .with_time_step(20.0)
            .unwrap();
        let issues = validate(&s);
        assert!(!has_errors(&issues));
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::TimeStepExceedsDuration));
    }

    #[test]
    fn out_of_range_position_from_document_is_an_error() {
        let doc = r#"{"id":"6c1f0c1e-52f0-4b43-9d5e-0e7f7a0b3b11","name":"bad","duration_s":10,
            "platforms":[{"name":"p","type_tag":"wsf_platform",
            "position":{"latitude":120.0,"longitude":0.0,"altitude_m":0.0}}]}"#;
        let s: Scenario = serde_json::from_str(doc).unwrap();
        let issues = validate(&s);
        assert!(has_errors(&issues));
        let issue = &issues[0];
        assert_eq!(issue.code, IssueCode::InvalidPosition);
        assert_eq!(issue.platform.as_deref(), Some("p"));
        assert!(issue.to_string().starts_with("error[invalid_position] p:"));
    }

    #[test]
    fn reserved_setting_keys_are_errors() {
        let mut s = Scenario::new("k", 60.0).unwrap();
        s.metadata.insert("platform".into(), serde_json::json!("ghost"));
        let mut em = EntityManager::new(&mut s);
        em.add_platform(PlatformSpec::new("a").param("end_platform", 1).param("side", "red"))
            .unwrap();
        let mut params = afsim_core::Parameters::new();
        params.insert("position".into(), serde_json::json!("0 0 0"));
        em.add_component("a", ComponentKind::Sensor, None, params).unwrap();

        let issues: Vec<_> = validate(&s)
            .into_iter()
            .filter(|i| i.code == IssueCode::ReservedKey)
            .collect();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
        assert_eq!(issues[0].platform, None);
        assert_eq!(issues[1].platform.as_deref(), Some("a"));
        assert!(issues[2].message.starts_with("sensor_1 parameter key 'position'"));
    }

    #[test]
    fn two_movers_in_document_are_an_error() {
        let doc = r#"{"id":"6c1f0c1e-52f0-4b43-9d5e-0e7f7a0b3b11","name":"m","duration_s":10,
            "platforms":[{"name":"p","type_tag":"wsf_platform",
            "position":{"latitude":0.0,"longitude":0.0,"altitude_m":0.0},
            "components":[
              {"slot":"mover","kind":"mover","type_tag":"wsf_air_mover"},
              {"slot":"mover_2","kind":"mover","type_tag":"wsf_ground_mover"}]}]}"#;
        let s: Scenario = serde_json::from_str(doc).unwrap();
        let issues = validate(&s);
        assert!(issues.iter().any(|i| i.code == IssueCode::MultipleMovers));
    }
}
