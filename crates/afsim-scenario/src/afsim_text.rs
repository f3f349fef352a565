//! AFSIM scenario text.
//!
//! [`render`] produces the input file handed to the simulator:
//!
//! ```text
//! # Scenario: strike
//! # Description: two-ship sweep
//!
//! simulation_duration 600 s
//! time_step 1 s
//!
//! platform blue_1
//!   platform_type F-16
//!   position 38.5deg -77.25deg 9144m
//!   side blue
//!   mover wsf_air_mover
//!     speed 250
//!   end_mover
//!   sensor sensor_1 wsf_radar_sensor
//!   end_sensor
//! end_platform
//! ```
//!
//! [`parse`] reads that subset back. The import is lossy: the scenario gets
//! a fresh id, top-level metadata is dropped, component slots are
//! reassigned in file order, and parameter values are re-typed (numbers and
//! booleans become JSON numbers and booleans, everything else a string).

use std::fmt::Write as _;
use std::path::Path;

use afsim_core::{ComponentKind, EntityManager, Parameters, PlatformSpec, Scenario};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ScenarioError;

/// Duration assumed when a text file does not set one, in seconds.
pub const DEFAULT_DURATION_S: f64 = 3600.0;

// ── Rendering ───────────────────────────────────────────────────

fn block_keyword(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Mover => "mover",
        ComponentKind::Sensor => "sensor",
        ComponentKind::Weapon => "weapon",
        ComponentKind::Other => "component",
    }
}

/// Keywords that structure the text. A metadata or parameter key that
/// renders to one of these would change the block layout.
const KEYWORDS: &[&str] = &[
    "platform",
    "platform_type",
    "position",
    "mover",
    "sensor",
    "weapon",
    "component",
    "simulation_duration",
    "end_time",
    "time_step",
];

/// Whether `key` cannot be rendered as a setting without being read back
/// as structure.
pub fn is_reserved_key(key: &str) -> bool {
    let key = token(key);
    key.is_empty() || key.starts_with('#') || key.starts_with("end_") || KEYWORDS.contains(&key.as_str())
}

fn pieces(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|piece| !piece.is_empty())
}

/// Collapse whitespace and control characters so `s` stays on one line.
fn one_line(s: &str) -> String {
    pieces(s).collect::<Vec<_>>().join(" ")
}

/// Collapse `s` into a single whitespace-free word.
fn token(s: &str) -> String {
    pieces(s).collect::<Vec<_>>().join("_")
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => one_line(s),
        other => one_line(&other.to_string()),
    }
}

fn render_setting(out: &mut String, indent: &str, key: &str, value: &Value) {
    if is_reserved_key(key) {
        warn!(key, "setting not rendered, its key is reserved");
        return;
    }
    let _ = writeln!(out, "{indent}{} {}", token(key), render_value(value));
}

/// Render `scenario` as AFSIM scenario text.
///
/// Names and keys are collapsed to single words and values to single
/// lines. Settings whose keys are reserved words are left out.
pub fn render(scenario: &Scenario) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Scenario: {}", one_line(&scenario.name));
    if !scenario.description.is_empty() {
        let _ = writeln!(out, "# Description: {}", one_line(&scenario.description));
    }
    let _ = writeln!(out, "# Id: {}", scenario.id());
    out.push('\n');
    let _ = writeln!(out, "simulation_duration {} s", scenario.duration_s);
    let _ = writeln!(out, "time_step {} s", scenario.time_step_s);
    out.push('\n');

    if !scenario.metadata.is_empty() {
        for (k, v) in &scenario.metadata {
            render_setting(&mut out, "", k, v);
        }
        out.push('\n');
    }

    for p in scenario.platforms() {
        let _ = writeln!(out, "platform {}", token(p.name()));
        let _ = writeln!(out, "  platform_type {}", token(&p.type_tag));
        let _ = writeln!(
            out,
            "  position {}deg {}deg {}m",
            p.position.latitude, p.position.longitude, p.position.altitude_m
        );
        for (k, v) in &p.parameters {
            render_setting(&mut out, "  ", k, v);
        }
        for c in p.components() {
            let kw = block_keyword(c.kind());
            if c.kind().is_singular() {
                let _ = writeln!(out, "  {kw} {}", token(&c.type_tag));
            } else {
                let _ = writeln!(out, "  {kw} {} {}", token(c.slot()), token(&c.type_tag));
            }
            for (k, v) in &c.parameters {
                render_setting(&mut out, "    ", k, v);
            }
            let _ = writeln!(out, "  end_{kw}");
        }
        out.push_str("end_platform\n\n");
    }
    out
}

// ── Parsing ─────────────────────────────────────────────────────

struct PendingComponent {
    kind: ComponentKind,
    type_tag: Option<String>,
    parameters: Parameters,
    line: usize,
}

struct PendingPlatform {
    spec: PlatformSpec,
    components: Vec<PendingComponent>,
    line: usize,
}

struct Parser<'a> {
    path: &'a Path,
}

impl Parser<'_> {
    fn err(&self, line: usize, column: usize, detail: impl Into<String>) -> ScenarioError {
        ScenarioError::Parse {
            path: self.path.to_path_buf(),
            line,
            column,
            detail: detail.into(),
        }
    }

    fn seconds(&self, line: usize, rest: &str) -> Result<f64, ScenarioError> {
        let rest = rest.trim();
        let (num, unit) = match rest.split_once(char::is_whitespace) {
            Some((n, u)) => (n, u.trim()),
            None => match rest.strip_suffix('s') {
                Some(n) => (n, "s"),
                None => (rest, "s"),
            },
        };
        let scale = match unit {
            "s" | "sec" | "secs" | "seconds" => 1.0,
            "min" | "mins" | "minutes" => 60.0,
            "h" | "hr" | "hrs" | "hours" => 3600.0,
            other => return Err(self.err(line, 1, format!("unknown time unit '{other}'"))),
        };
        num.parse::<f64>()
            .map(|v| v * scale)
            .map_err(|_| self.err(line, 1, format!("expected a time value, got '{rest}'")))
    }

    fn position(&self, line: usize, rest: &str) -> Result<(f64, f64, f64), ScenarioError> {
        let toks: Vec<&str> = rest.split_whitespace().collect();
        if toks.len() != 3 {
            return Err(self.err(line, 1, "position needs latitude, longitude and altitude"));
        }
        let strip = |t: &str, suffix: &str| -> Result<f64, ScenarioError> {
            t.strip_suffix(suffix)
                .unwrap_or(t)
                .parse::<f64>()
                .map_err(|_| self.err(line, 1, format!("bad position value '{t}'")))
        };
        Ok((
            strip(toks[0], "deg")?,
            strip(toks[1], "deg")?,
            strip(toks[2], "m")?,
        ))
    }
}

fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

fn component_kind(keyword: &str) -> Option<ComponentKind> {
    match keyword {
        "mover" => Some(ComponentKind::Mover),
        "sensor" => Some(ComponentKind::Sensor),
        "weapon" => Some(ComponentKind::Weapon),
        "component" => Some(ComponentKind::Other),
        _ => None,
    }
}

/// Parse AFSIM scenario text. `path` names the source in errors and
/// supplies the scenario name when the text has no `# Scenario:` header.
pub fn parse(text: &str, path: &Path) -> Result<Scenario, ScenarioError> {
    let parser = Parser { path };
    let mut name: Option<String> = None;
    let mut description = String::new();
    let mut duration = DEFAULT_DURATION_S;
    let mut time_step = afsim_core::scenario::DEFAULT_TIME_STEP_S;
    let mut platforms: Vec<PendingPlatform> = Vec::new();
    let mut current: Option<PendingPlatform> = None;
    let mut component: Option<PendingComponent> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let indent = raw.len() - raw.trim_start().len();
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if let Some(n) = comment.strip_prefix("Scenario:") {
                name = Some(n.trim().to_string());
            } else if let Some(d) = comment.strip_prefix("Description:") {
                description = d.trim().to_string();
            }
            continue;
        }
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };
        let col = indent + 1;

        if let Some(c) = component.as_mut() {
            if keyword.starts_with("end_") {
                let expected = format!("end_{}", block_keyword(c.kind));
                if keyword != expected {
                    return Err(parser.err(line_no, col, format!("expected '{expected}', found '{keyword}'")));
                }
                if let (Some(done), Some(p)) = (component.take(), current.as_mut()) {
                    p.components.push(done);
                }
            } else {
                c.parameters.insert(keyword.to_string(), parse_value(rest));
            }
            continue;
        }

        if let Some(p) = current.as_mut() {
            match keyword {
                "end_platform" => {
                    if let Some(done) = current.take() {
                        platforms.push(done);
                    }
                }
                "platform_type" => p.spec.type_tag = Some(rest.to_string()),
                "position" => {
                    let (lat, lon, alt) = parser.position(line_no, rest)?;
                    p.spec.position.latitude = lat;
                    p.spec.position.longitude = lon;
                    p.spec.position.altitude_m = alt;
                }
                kw => match component_kind(kw) {
                    Some(kind) => {
                        let toks: Vec<&str> = rest.split_whitespace().collect();
                        let type_tag = match (kind.is_singular(), toks.as_slice()) {
                            (true, [t, ..]) => Some(t.to_string()),
                            (false, [_slot, t, ..]) => Some(t.to_string()),
                            _ => None,
                        };
                        component = Some(PendingComponent {
                            kind,
                            type_tag,
                            parameters: Parameters::new(),
                            line: line_no,
                        });
                    }
                    None => {
                        p.spec.parameters.insert(kw.to_string(), parse_value(rest));
                    }
                },
            }
            continue;
        }

        match keyword {
            "platform" => {
                if rest.is_empty() {
                    return Err(parser.err(line_no, col, "platform needs a name"));
                }
                let pname = rest.split_whitespace().next().unwrap_or(rest);
                current = Some(PendingPlatform {
                    spec: PlatformSpec::new(pname),
                    components: Vec::new(),
                    line: line_no,
                });
            }
            "simulation_duration" | "end_time" => duration = parser.seconds(line_no, rest)?,
            "time_step" => time_step = parser.seconds(line_no, rest)?,
            kw if kw.starts_with("end_") => {
                return Err(parser.err(line_no, col, format!("unexpected '{kw}'")));
            }
            kw => debug!(path = %path.display(), line = line_no, keyword = kw, "ignoring top-level setting"),
        }
    }

    if let Some(c) = component {
        return Err(parser.err(c.line, 1, format!("unterminated {} block", block_keyword(c.kind))));
    }
    if let Some(p) = current {
        return Err(parser.err(p.line, 1, format!("unterminated platform '{}'", p.spec.name)));
    }

    let name = name
        .filter(|n| !n.is_empty())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let mut scenario = Scenario::new(name, duration)
        .and_then(|s| s.with_time_step(time_step))
        .map_err(|e| parser.err(0, 0, e.to_string()))?
        .with_description(description);

    let mut em = EntityManager::new(&mut scenario);
    for p in platforms {
        let pname = p.spec.name.clone();
        em.add_platform(p.spec)
            .map_err(|e| parser.err(p.line, 1, e.to_string()))?;
        for c in p.components {
            em.add_component(&pname, c.kind, c.type_tag, c.parameters)
                .map_err(|e| parser.err(c.line, 1, e.to_string()))?;
        }
    }
    Ok(scenario)
}
