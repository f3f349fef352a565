//! Normalized result records shared by every result-file parser.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// On-disk result format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFormat {
    /// Comma/semicolon/tab separated values with a header row.
    Csv,
    /// Line-oriented event log (`.evt`).
    EventLog,
    /// Binary replay records (`.aer`).
    BinaryAer,
}

impl ResultFormat {
    /// All formats.
    pub const ALL: [ResultFormat; 3] = [Self::Csv, Self::EventLog, Self::BinaryAer];

    /// Stable tag: `csv`, `event-log` or `binary-aer`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::EventLog => "event-log",
            Self::BinaryAer => "binary-aer",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::EventLog => "evt",
            Self::BinaryAer => "aer",
        }
    }

    /// Classify by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "evt" => Some(Self::EventLog),
            "aer" => Some(Self::BinaryAer),
            _ => None,
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = String;

    /// Accepts the tag or the extension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "event-log" | "evt" => Ok(Self::EventLog),
            "binary-aer" | "aer" => Ok(Self::BinaryAer),
            other => Err(format!("unknown result format '{other}'")),
        }
    }
}

/// A single typed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    /// Any numeric quantity.
    Number(f64),
    /// Free text.
    Text(String),
    /// Simulation time in seconds.
    Timestamp(f64),
}

impl FieldValue {
    /// Numeric view of numbers and timestamps.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) | Self::Timestamp(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text view, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A named value within a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Column or key name.
    pub name: String,
    /// Parsed value.
    pub value: FieldValue,
}

/// One row, event or binary record, normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// File the record came from.
    pub source: PathBuf,
    /// Format of that file.
    pub format: ResultFormat,
    /// 1-based line number for text formats, 1-based record index for AER.
    pub ordinal: u64,
    /// Fields in source order.
    pub fields: SmallVec<[Field; 8]>,
}

impl ResultRecord {
    /// An empty record.
    pub fn new(source: PathBuf, format: ResultFormat, ordinal: u64) -> Self {
        Self {
            source,
            format,
            ordinal,
            fields: SmallVec::new(),
        }
    }

    /// Append a field.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
    }

    /// Set `name` to `value`. An existing field of that name is overwritten
    /// in place, so the last write wins.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
    }

    /// First field named `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Keep only fields whose names appear in `names`, in record order.
    pub fn project(&mut self, names: &[String]) {
        self.fields.retain(|f| names.iter().any(|n| *n == f.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_classification() {
        assert_eq!(ResultFormat::from_path(Path::new("a/b.CSV")), Some(ResultFormat::Csv));
        assert_eq!(ResultFormat::from_path(Path::new("x.evt")), Some(ResultFormat::EventLog));
        assert_eq!(ResultFormat::from_path(Path::new("x.aer")), Some(ResultFormat::BinaryAer));
        assert_eq!(ResultFormat::from_path(Path::new("x.log")), None);
        assert_eq!(ResultFormat::from_path(Path::new("noext")), None);
        assert_eq!("aer".parse::<ResultFormat>().unwrap(), ResultFormat::BinaryAer);
        assert_eq!(
            serde_json::to_string(&ResultFormat::EventLog).unwrap(),
            "\"event-log\""
        );
    }

    #[test]
    fn record_lookup_and_projection() {
        let mut r = ResultRecord::new(PathBuf::from("r.csv"), ResultFormat::Csv, 2);
        r.push("time", FieldValue::Timestamp(1.5));
        r.push("platform", FieldValue::Text("blue_1".into()));
        r.push("alt", FieldValue::Number(300.0));
        assert_eq!(r.get("alt").and_then(FieldValue::as_f64), Some(300.0));
        assert_eq!(r.get("platform").and_then(FieldValue::as_text), Some("blue_1"));
        assert_eq!(r.get("missing"), None);
        r.project(&["alt".to_string(), "time".to_string()]);
        let names: Vec<_> = r.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "alt"]);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut r = ResultRecord::new(PathBuf::from("r.evt"), ResultFormat::EventLog, 1);
        r.push("time", FieldValue::Timestamp(1.0));
        r.push("event", FieldValue::Text("A".into()));
        r.set("time", FieldValue::Timestamp(2.0));
        r.set("extra", FieldValue::Number(3.0));
        let names: Vec<_> = r.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "event", "extra"]);
        assert_eq!(r.get("time"), Some(&FieldValue::Timestamp(2.0)));
    }

    #[test]
    fn value_display_drops_trailing_zero() {
        assert_eq!(FieldValue::Number(3.0).to_string(), "3");
        assert_eq!(FieldValue::Number(0.25).to_string(), "0.25");
    }
}
