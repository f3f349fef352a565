//! Line-oriented event logs (`.evt`).
//!
//! Each line is `<time> <EVENT_TYPE> <fields...>` where time is seconds or
//! `HH:MM:SS[.fff]`. `key=value` tokens become named fields; bare tokens are
//! positional and take their names from the event type's schema, falling
//! back to `arg<n>`. Event types without a schema keep their remainder as a
//! single `payload` field. `#` comments and blank lines are ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use afsim_core::{FieldValue, ResultFormat, ResultRecord};

use crate::error::ResultError;
use crate::source::{Lines, ReadItem, RecordSource, RecordStream, SkipReason, SourceLocation};
use crate::value::{parse_time, type_cell};

/// Positional field names for event types with a known layout.
pub fn schema(event: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match event {
        "SIMULATION_STARTING" | "SIMULATION_COMPLETE" => &[],
        "PLATFORM_ADDED" => &["platform", "platform_type", "side"],
        "PLATFORM_DELETED" | "PLATFORM_BROKEN" => &["platform"],
        "SENSOR_TRACK_INITIATED" | "SENSOR_TRACK_UPDATED" | "SENSOR_TRACK_DROPPED" => {
            &["platform", "sensor", "target"]
        }
        "SENSOR_DETECTION_ATTEMPT" => &["platform", "sensor", "target", "result"],
        "WEAPON_FIRED" | "WEAPON_HIT" | "WEAPON_MISSED" | "WEAPON_TERMINATED" => {
            &["platform", "weapon", "target"]
        }
        "MESSAGE_TRANSMITTED" | "MESSAGE_RECEIVED" => &["platform", "comm", "recipient"],
        "MOVER_UPDATED" => &["platform", "lat", "lon", "alt"],
        _ => return None,
    };
    Some(names)
}

fn is_event_token(tok: &str) -> bool {
    let mut bytes = tok.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Parse one non-comment line into a record, or explain why not.
pub fn parse_line(path: &Path, line_no: u64, line: &str) -> Result<ResultRecord, String> {
    let line = line.trim();
    let (time_tok, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| "expected '<time> <EVENT_TYPE>'".to_string())?;
    let time = parse_time(time_tok).ok_or_else(|| format!("bad time '{time_tok}'"))?;
    let rest = rest.trim_start();
    let (event, payload) = match rest.split_once(char::is_whitespace) {
        Some((e, p)) => (e, p.trim()),
        None => (rest, ""),
    };
    if !is_event_token(event) {
        return Err(format!("bad event type '{event}'"));
    }

    let mut record = ResultRecord::new(path.to_path_buf(), ResultFormat::EventLog, line_no);
    record.push("time", FieldValue::Timestamp(time));
    record.push("event", FieldValue::Text(event.to_string()));

    let Some(names) = schema(event) else {
        record.push("payload", FieldValue::Text(payload.to_string()));
        return Ok(record);
    };
    let mut positional = 0usize;
    for tok in payload.split_whitespace() {
        match tok.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                record.set(key, type_cell(key, value));
            }
            _ => {
                let name = match names.get(positional) {
                    Some(n) => (*n).to_string(),
                    None => format!("arg{}", positional + 1),
                };
                positional += 1;
                let value = type_cell(&name, tok);
                record.set(name, value);
            }
        }
    }
    Ok(record)
}

/// An event-log result file.
#[derive(Clone, Debug)]
pub struct EvtSource {
    path: PathBuf,
}

impl EvtSource {
    /// Read `path` as an event log regardless of its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for EvtSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::EventLog
    }

    fn records(&self) -> Result<RecordStream, ResultError> {
        let file = File::open(&self.path).map_err(|e| ResultError::io(&self.path, e))?;
        Ok(Box::new(EvtStream {
            path: self.path.clone(),
            lines: Lines::new(BufReader::new(file)),
            done: false,
        }))
    }
}

struct EvtStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    done: bool,
}

impl Iterator for EvtStream {
    type Item = Result<ReadItem, ResultError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let (line_no, text) = match self.lines.next_line() {
                Ok(Some(l)) => l,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ResultError::io(&self.path, e)));
                }
            };
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let item = match parse_line(&self.path, line_no, trimmed) {
                Ok(record) => ReadItem::Record(record),
                Err(detail) => ReadItem::Skipped {
                    location: SourceLocation::Line(line_no),
                    reason: SkipReason::Malformed(detail),
                },
            };
            return Some(Ok(item));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ResultRecord {
        parse_line(Path::new("e.evt"), 1, line).unwrap()
    }

    #[test]
    fn known_event_names_positionals() {
        let r = parse("12.5 WEAPON_FIRED blue_1 aim120 red_1 speed=900");
        assert_eq!(r.get("time"), Some(&FieldValue::Timestamp(12.5)));
        assert_eq!(r.get("event"), Some(&FieldValue::Text("WEAPON_FIRED".into())));
        assert_eq!(r.get("platform"), Some(&FieldValue::Text("blue_1".into())));
        assert_eq!(r.get("weapon"), Some(&FieldValue::Text("aim120".into())));
        assert_eq!(r.get("target"), Some(&FieldValue::Text("red_1".into())));
        assert_eq!(r.get("speed"), Some(&FieldValue::Number(900.0)));
    }

    #[test]
    fn extra_positionals_get_generic_names() {
        let r = parse("00:01:00.250 PLATFORM_DELETED red_1 destroyed");
        assert_eq!(r.get("time"), Some(&FieldValue::Timestamp(60.25)));
        assert_eq!(r.get("arg2"), Some(&FieldValue::Text("destroyed".into())));
    }

    #[test]
    fn payload_keys_overwrite_reserved_names() {
        let r = parse("4 WEAPON_FIRED blue_1 event=LAUNCH time=5 speed=1 speed=2");
        let names: Vec<_> = r.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "event", "platform", "speed"]);
        assert_eq!(r.get("time"), Some(&FieldValue::Timestamp(5.0)));
        assert_eq!(r.get("event"), Some(&FieldValue::Text("LAUNCH".into())));
        assert_eq!(r.get("speed"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn unknown_event_is_opaque() {
        let r = parse("3 CUSTOM_THING  a b=c   d ");
        let names: Vec<_> = r.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "event", "payload"]);
        assert_eq!(r.get("payload"), Some(&FieldValue::Text("a b=c   d".into())));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let p = Path::new("e.evt");
        assert!(parse_line(p, 1, "12.5").is_err());
        assert!(parse_line(p, 1, "soon WEAPON_FIRED").is_err());
        assert!(parse_line(p, 1, "1.0 42").is_err());
    }

    #[test]
    fn stream_ignores_comments_and_counts_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.evt");
        std::fs::write(
            &path,
            "# header\n\n0 SIMULATION_STARTING\nbroken\n5 PLATFORM_ADDED b WSF_PLATFORM blue\n",
        )
        .unwrap();
        let items: Vec<_> = EvtSource::new(&path)
            .records()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], ReadItem::Record(r) if r.ordinal == 3));
        assert!(matches!(
            &items[1],
            ReadItem::Skipped { location: SourceLocation::Line(4), .. }
        ));
        match &items[2] {
            ReadItem::Record(r) => {
                assert_eq!(r.ordinal, 5);
                assert_eq!(r.get("side"), Some(&FieldValue::Text("blue".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
