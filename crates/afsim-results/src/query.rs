//! Filtered, paginated queries over any [`RecordSource`].
//!
//! Filters are applied first, then `offset`, then `max_rows`. The whole file
//! is still streamed so `matched` and `skipped` describe all of it, but at
//! most `max_rows` records are held in memory.

use std::path::{Path, PathBuf};

use afsim_core::{FieldValue, ResultFormat, ResultRecord};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv::CsvSource;
use crate::discover::detect_format;
use crate::error::ResultError;
use crate::evt::EvtSource;
use crate::reader::AerSource;
use crate::source::{open_source, ReadItem, RecordSource, SkipReason};

/// Rows returned when the caller does not say otherwise.
pub const DEFAULT_MAX_ROWS: usize = 1000;

// ── Filters ─────────────────────────────────────────────────────

/// Condition on a field's value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Numeric equality when both sides are numbers, exact text otherwise.
    Equals(String),
    /// Inclusive numeric range; an absent bound is open.
    Range {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
}

/// A predicate applied to one named field. Records without the field never
/// match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field name.
    pub field: String,
    /// Condition.
    pub predicate: Predicate,
}

impl Filter {
    /// `field == value`.
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Equals(value.into()),
        }
    }

    /// `min <= field <= max`.
    pub fn range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            field: field.into(),
            predicate: Predicate::Range { min, max },
        }
    }

    /// Parse `field=value`, `field==value`, `field>=n`, `field<=n` or
    /// `field=lo..hi` (either bound may be omitted).
    pub fn parse(expr: &str) -> Result<Self, ResultError> {
        let invalid = |detail: &str| ResultError::InvalidFilter {
            expr: expr.to_string(),
            detail: detail.to_string(),
        };
        let op_at = expr
            .find(['=', '<', '>'])
            .ok_or_else(|| invalid("expected one of '=', '==', '>=', '<='"))?;
        let field = expr[..op_at].trim();
        if field.is_empty() {
            return Err(invalid("missing field name"));
        }
        let rest = &expr[op_at..];
        let number = |s: &str| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid("bound is not a finite number"))
        };

        let predicate = if let Some(v) = rest.strip_prefix(">=") {
            Predicate::Range {
                min: Some(number(v)?),
                max: None,
            }
        } else if let Some(v) = rest.strip_prefix("<=") {
            Predicate::Range {
                min: None,
                max: Some(number(v)?),
            }
        } else if let Some(v) = rest.strip_prefix("==").or_else(|| rest.strip_prefix('=')) {
            let v = v.trim();
            match parse_span(v) {
                Some((min, max)) => Predicate::Range { min, max },
                None => Predicate::Equals(v.to_string()),
            }
        } else {
            return Err(invalid("strict comparisons are not supported"));
        };
        Ok(Self {
            field: field.to_string(),
            predicate,
        })
    }

    /// Does `record` satisfy this filter?
    pub fn matches(&self, record: &ResultRecord) -> bool {
        let Some(value) = record.get(&self.field) else {
            return false;
        };
        match &self.predicate {
            Predicate::Equals(expected) => match (value.as_f64(), expected.parse::<f64>()) {
                (Some(actual), Ok(wanted)) => actual == wanted,
                _ => match value {
                    FieldValue::Text(s) => s == expected,
                    other => other.to_string() == *expected,
                },
            },
            Predicate::Range { min, max } => match value.as_f64() {
                Some(v) => min.is_none_or(|lo| v >= lo) && max.is_none_or(|hi| v <= hi),
                None => false,
            },
        }
    }
}

/// `lo..hi` with at least one numeric bound.
fn parse_span(s: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (lo, hi) = s.split_once("..")?;
    let bound = |b: &str| -> Option<Option<f64>> {
        let b = b.trim();
        if b.is_empty() {
            Some(None)
        } else {
            b.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
        }
    };
    match (bound(lo)?, bound(hi)?) {
        (None, None) => None,
        span => Some(span),
    }
}

// ── Options and results ─────────────────────────────────────────

/// What to return from a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// All must match.
    pub filters: Vec<Filter>,
    /// Matching records to skip before collecting.
    pub offset: usize,
    /// Most records to return.
    pub max_rows: usize,
    /// Keep only these fields; `None` keeps everything.
    pub fields: Option<Vec<String>>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            offset: 0,
            max_rows: DEFAULT_MAX_ROWS,
            fields: None,
        }
    }
}

impl QueryOptions {
    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the page.
    pub fn page(mut self, offset: usize, max_rows: usize) -> Self {
        self.offset = offset;
        self.max_rows = max_rows;
        self
    }

    /// Project onto `fields`.
    pub fn project<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// One page of a query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResult {
    /// File queried.
    pub source: PathBuf,
    /// Its format.
    pub format: ResultFormat,
    /// Field names seen in `records`, first-seen order.
    pub fields: Vec<String>,
    /// The page.
    pub records: Vec<ResultRecord>,
    /// Records passing the filters, across the whole file.
    pub matched: u64,
    /// Malformed rows or records skipped.
    pub skipped: u64,
    /// The file ended inside a binary record.
    pub truncated: bool,
    /// More matching records follow this page.
    pub has_more: bool,
}

/// Run `options` against any source.
pub fn run_query(
    source: &dyn RecordSource,
    options: &QueryOptions,
) -> Result<QueryResult, ResultError> {
    let mut records = Vec::with_capacity(options.max_rows.min(DEFAULT_MAX_ROWS));
    let mut fields = IndexSet::new();
    let mut matched = 0u64;
    let mut skipped = 0u64;
    let mut truncated = false;

    for item in source.records()? {
        let mut record = match item? {
            ReadItem::Record(r) => r,
            ReadItem::Skipped {
                reason: SkipReason::TruncatedTail,
                ..
            } => {
                truncated = true;
                continue;
            }
            ReadItem::Skipped { location, reason } => {
                debug!(path = %source.path().display(), %location, ?reason, "record skipped");
                skipped += 1;
                continue;
            }
        };
        if !options.filters.iter().all(|f| f.matches(&record)) {
            continue;
        }
        matched += 1;
        if matched <= options.offset as u64 || records.len() >= options.max_rows {
            continue;
        }
        if let Some(keep) = &options.fields {
            record.project(keep);
        }
        for f in &record.fields {
            if !fields.contains(f.name.as_str()) {
                fields.insert(f.name.clone());
            }
        }
        records.push(record);
    }

    let has_more = matched > options.offset as u64 + records.len() as u64;
    debug!(
        path = %source.path().display(),
        matched,
        returned = records.len(),
        skipped,
        truncated,
        "query finished"
    );
    Ok(QueryResult {
        source: source.path().to_path_buf(),
        format: source.format(),
        fields: fields.into_iter().collect(),
        records,
        matched,
        skipped,
        truncated,
        has_more,
    })
}

/// Reject files that are recognizably another format. Unrecognized files
/// are read as `expected` since the caller named the parser.
fn check_format(path: &Path, expected: ResultFormat) -> Result<(), ResultError> {
    match detect_format(path) {
        Ok(found) if found == expected => Ok(()),
        Ok(found) => Err(ResultError::FormatMismatch {
            path: path.to_path_buf(),
            expected,
            found: Some(found),
        }),
        Err(ResultError::UnsupportedFormat { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Query a delimited text file.
pub fn query_csv_results(path: &Path, options: &QueryOptions) -> Result<QueryResult, ResultError> {
    check_format(path, ResultFormat::Csv)?;
    run_query(&CsvSource::new(path), options)
}

/// Query an event log.
pub fn query_evt_results(path: &Path, options: &QueryOptions) -> Result<QueryResult, ResultError> {
    check_format(path, ResultFormat::EventLog)?;
    run_query(&EvtSource::new(path), options)
}

/// Query a binary AER file.
pub fn query_aer_results(path: &Path, options: &QueryOptions) -> Result<QueryResult, ResultError> {
    check_format(path, ResultFormat::BinaryAer)?;
    run_query(&AerSource::new(path), options)
}

/// Query any supported file, choosing the parser from its detected format.
pub fn query_results(path: &Path, options: &QueryOptions) -> Result<QueryResult, ResultError> {
    run_query(open_source(path)?.as_ref(), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, FieldValue)]) -> ResultRecord {
        let mut r = ResultRecord::new(PathBuf::from("r.csv"), ResultFormat::Csv, 2);
        for (name, value) in fields {
            r.push(*name, value.clone());
        }
        r
    }

    #[test]
    fn parse_forms() {
        assert_eq!(Filter::parse("platform=blue_1").unwrap(), Filter::equals("platform", "blue_1"));
        assert_eq!(Filter::parse(" side == red").unwrap(), Filter::equals("side", "red"));
        assert_eq!(
            Filter::parse("alt>=1000").unwrap(),
            Filter::range("alt", Some(1000.0), None)
        );
        assert_eq!(
            Filter::parse("alt<= 2.5").unwrap(),
            Filter::range("alt", None, Some(2.5))
        );
        assert_eq!(
            Filter::parse("time=10..20").unwrap(),
            Filter::range("time", Some(10.0), Some(20.0))
        );
        assert_eq!(
            Filter::parse("time=..20").unwrap(),
            Filter::range("time", None, Some(20.0))
        );
        assert_eq!(Filter::parse("name=a..b").unwrap(), Filter::equals("name", "a..b"));
    }

    #[test]
    fn parse_rejects_garbage() {
        for expr in ["platform", "=x", "alt>5", "alt>=high", "alt<=inf"] {
            let err = Filter::parse(expr).unwrap_err();
            assert!(matches!(err, ResultError::InvalidFilter { .. }), "{expr}");
        }
    }

    #[test]
    fn equality_is_numeric_when_possible() {
        let r = record(&[
            ("alt", FieldValue::Number(1000.0)),
            ("time", FieldValue::Timestamp(1.5)),
            ("platform", FieldValue::Text("blue_1".into())),
        ]);
        assert!(Filter::equals("alt", "1000.0").matches(&r));
        assert!(Filter::equals("alt", "1e3").matches(&r));
        assert!(Filter::equals("time", "1.5").matches(&r));
        assert!(Filter::equals("platform", "blue_1").matches(&r));
        assert!(!Filter::equals("platform", "Blue_1").matches(&r));
        assert!(!Filter::equals("missing", "x").matches(&r));
    }

    #[test]
    fn range_is_inclusive_and_numeric_only() {
        let r = record(&[
            ("alt", FieldValue::Number(10.0)),
            ("name", FieldValue::Text("10".into())),
        ]);
        assert!(Filter::range("alt", Some(10.0), Some(10.0)).matches(&r));
        assert!(Filter::range("alt", None, Some(10.0)).matches(&r));
        assert!(!Filter::range("alt", Some(10.1), None).matches(&r));
        assert!(!Filter::range("name", Some(0.0), None).matches(&r));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: QueryOptions =
            serde_json::from_str(r#"{"offset": 5, "filters": [{"field": "alt", "predicate": {"range": {"min": 1.0, "max": null}}}]}"#)
                .unwrap();
        assert_eq!(opts.max_rows, DEFAULT_MAX_ROWS);
        assert_eq!(opts.offset, 5);
        assert_eq!(opts.filters, vec![Filter::range("alt", Some(1.0), None)]);
    }

    #[test]
    fn paging_projection_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(
            &path,
            "time,platform,alt\n0,a,1\n1,b,2\n2,a,3\nbad\n3,a,4\n4,a,5\n",
        )
        .unwrap();
        let opts = QueryOptions::default()
            .filter(Filter::equals("platform", "a"))
            .page(1, 2)
            .project(["alt"]);
        let res = query_csv_results(&path, &opts).unwrap();
        assert_eq!(res.matched, 4);
        assert_eq!(res.skipped, 1);
        assert!(res.has_more);
        assert_eq!(res.fields, ["alt"]);
        let alts: Vec<_> = res
            .records
            .iter()
            .map(|r| r.get("alt").and_then(FieldValue::as_f64).unwrap())
            .collect();
        assert_eq!(alts, [3.0, 4.0]);
    }

    #[test]
    fn format_specific_queries_reject_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.evt");
        std::fs::write(&path, "0 SIMULATION_STARTING\n").unwrap();
        let err = query_csv_results(&path, &QueryOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ResultError::FormatMismatch { found: Some(ResultFormat::EventLog), .. }
        ));
        assert_eq!(query_results(&path, &QueryOptions::default()).unwrap().matched, 1);
    }
}
