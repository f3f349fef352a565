//! Single-pass statistics over result files and directories.

use std::path::{Path, PathBuf};

use afsim_core::{FieldValue, ResultFormat};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::info;

use crate::discover::{list_result_files, ResultFileInfo};
use crate::error::ResultError;
use crate::source::{open_source, ReadItem, SkipReason};

/// Running statistics for one numeric field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FieldStats {
    /// Numeric values observed.
    pub count: u64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

impl FieldStats {
    fn first(v: f64) -> Self {
        Self {
            count: 1,
            min: v,
            max: v,
            mean: v,
        }
    }

    // Incremental mean keeps precision without a running sum.
    fn add(&mut self, v: f64) {
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.mean += (v - self.mean) / self.count as f64;
    }
}

/// Shape of one result file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultSummary {
    /// File summarized.
    pub path: PathBuf,
    /// Its format.
    pub format: ResultFormat,
    /// Records parsed.
    pub records: u64,
    /// Malformed rows or records skipped.
    pub skipped: u64,
    /// The file ended inside a binary record.
    pub truncated: bool,
    /// Every field name observed, first-seen order.
    pub fields: Vec<String>,
    /// Statistics for fields that carried at least one number or timestamp.
    pub numeric: IndexMap<String, FieldStats>,
}

/// Summarize one file in a single streaming pass.
pub fn get_results_summary(path: &Path) -> Result<ResultSummary, ResultError> {
    let source = open_source(path)?;
    let mut records = 0u64;
    let mut skipped = 0u64;
    let mut truncated = false;
    let mut fields = IndexSet::new();
    let mut numeric: IndexMap<String, FieldStats> = IndexMap::new();

    for item in source.records()? {
        let record = match item? {
            ReadItem::Record(r) => r,
            ReadItem::Skipped {
                reason: SkipReason::TruncatedTail,
                ..
            } => {
                truncated = true;
                continue;
            }
            ReadItem::Skipped { .. } => {
                skipped += 1;
                continue;
            }
        };
        records += 1;
        for field in record.fields {
            let v = match field.value {
                FieldValue::Number(v) | FieldValue::Timestamp(v) if v.is_finite() => Some(v),
                _ => None,
            };
            if let Some(v) = v {
                match numeric.get_mut(&field.name) {
                    Some(stats) => stats.add(v),
                    None => {
                        numeric.insert(field.name.clone(), FieldStats::first(v));
                    }
                }
            }
            fields.insert(field.name);
        }
    }

    Ok(ResultSummary {
        path: path.to_path_buf(),
        format: source.format(),
        records,
        skipped,
        truncated,
        fields: fields.into_iter().collect(),
        numeric,
    })
}

/// Inventory of a result directory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectorySummary {
    /// Directory walked.
    pub directory: PathBuf,
    /// Recognized result files.
    pub file_count: usize,
    /// File count per format; formats with no files are omitted.
    pub by_format: IndexMap<ResultFormat, usize>,
    /// Sum of file sizes.
    pub total_bytes: u64,
    /// The files, sorted by path.
    pub files: Vec<ResultFileInfo>,
}

/// Count and size the result files under `dir`. A missing directory
/// summarizes as empty.
pub fn summarize_directory(dir: &Path) -> Result<DirectorySummary, ResultError> {
    let files = list_result_files(dir, None)?;
    let mut by_format = IndexMap::new();
    for format in ResultFormat::ALL {
        let n = files.iter().filter(|f| f.format == format).count();
        if n > 0 {
            by_format.insert(format, n);
        }
    }
    let total_bytes = files.iter().map(|f| f.size_bytes).sum();
    info!(dir = %dir.display(), files = files.len(), total_bytes, "result directory summarized");
    Ok(DirectorySummary {
        directory: dir.to_path_buf(),
        file_count: files.len(),
        by_format,
        total_bytes,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_summary_tracks_numeric_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        std::fs::write(&path, "time,platform,alt\n0,a,10\n1,b,20\n2,c\n3,d,30\n").unwrap();
        let s = get_results_summary(&path).unwrap();
        assert_eq!(s.records, 3);
        assert_eq!(s.skipped, 1);
        assert!(!s.truncated);
        assert_eq!(s.fields, ["time", "platform", "alt"]);
        let alt = s.numeric["alt"];
        assert_eq!((alt.count, alt.min, alt.max), (3, 10.0, 30.0));
        assert!((alt.mean - 20.0).abs() < 1e-12);
        assert_eq!(s.numeric["time"].max, 3.0);
        assert!(!s.numeric.contains_key("platform"));
    }

    #[test]
    fn directory_counts_by_format() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "x\n2\n").unwrap();
        std::fs::write(dir.path().join("c.evt"), "0 A\n").unwrap();
        std::fs::write(dir.path().join("d.log"), "ignored").unwrap();
        let s = summarize_directory(dir.path()).unwrap();
        assert_eq!(s.file_count, 3);
        assert_eq!(s.by_format.get(&ResultFormat::Csv), Some(&2));
        assert_eq!(s.by_format.get(&ResultFormat::EventLog), Some(&1));
        assert_eq!(s.by_format.get(&ResultFormat::BinaryAer), None);
        assert_eq!(s.total_bytes, 4 + 4 + 4);
    }
}
