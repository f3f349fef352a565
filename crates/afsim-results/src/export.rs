//! JSON export of whole result files.
//!
//! The export is streamed record by record into an [`AtomicFile`], so memory
//! use does not grow with the file and a reader never sees a partial
//! document.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use afsim_core::fs::AtomicFile;
use afsim_core::{ResultFormat, ResultRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ResultError;
use crate::source::{open_source, ReadItem, SkipReason, SourceLocation};

/// An exported result file, as read back by [`read_json_export`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonExport {
    /// File the records came from.
    pub source: PathBuf,
    /// Its format.
    pub format: ResultFormat,
    /// Every record, in source order.
    pub records: Vec<ResultRecord>,
    /// `records.len()` at export time.
    pub record_count: u64,
    /// Malformed rows or records skipped.
    pub skipped: u64,
    /// The source ended inside a binary record.
    pub truncated: bool,
}

/// `<path>.json`, beside the source.
pub fn default_export_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Export every record of `path` to JSON and return the output path.
///
/// The output defaults to [`default_export_path`]. The target is replaced
/// only once the whole document is written.
pub fn export_results_to_json(
    path: &Path,
    output_path: Option<&Path>,
) -> Result<PathBuf, ResultError> {
    let source = open_source(path)?;
    let target = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_export_path(path));
    let mut out = AtomicFile::create(&target).map_err(|e| ResultError::io(&target, e))?;

    let write_doc = |out: &mut AtomicFile| -> Result<(u64, u64, bool), ResultError> {
        let io_err = |e: io::Error| ResultError::io(&target, e);
        out.write_all(b"{\"source\":").map_err(io_err)?;
        serde_json::to_writer(&mut *out, source.path()).map_err(|e| io_err(e.into()))?;
        write!(out, ",\"format\":\"{}\",\"records\":[", source.format()).map_err(io_err)?;

        let (mut count, mut skipped, mut truncated) = (0u64, 0u64, false);
        for item in source.records()? {
            match item? {
                ReadItem::Record(record) => {
                    if count > 0 {
                        out.write_all(b",").map_err(io_err)?;
                    }
                    serde_json::to_writer(&mut *out, &record).map_err(|e| io_err(e.into()))?;
                    count += 1;
                }
                ReadItem::Skipped {
                    reason: SkipReason::TruncatedTail,
                    ..
                } => truncated = true,
                ReadItem::Skipped { .. } => skipped += 1,
            }
        }
        write!(
            out,
            "],\"record_count\":{count},\"skipped\":{skipped},\"truncated\":{truncated}}}"
        )
        .map_err(io_err)?;
        Ok((count, skipped, truncated))
    };

    let (count, skipped, truncated) = write_doc(&mut out)?;
    out.commit().map_err(|e| ResultError::io(&target, e))?;
    info!(
        source = %path.display(),
        output = %target.display(),
        records = count,
        skipped,
        truncated,
        "results exported"
    );
    Ok(target)
}

/// Read an export produced by [`export_results_to_json`].
pub fn read_json_export(path: &Path) -> Result<JsonExport, ResultError> {
    let file = File::open(path).map_err(|e| ResultError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            return ResultError::io(path, e.into());
        }
        ResultError::Parse {
            path: path.to_path_buf(),
            location: SourceLocation::Line(e.line() as u64),
            detail: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{query_results, QueryOptions};

    #[test]
    fn export_matches_direct_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.csv");
        std::fs::write(
            &path,
            "time;platform;alt\n00:00:01.5;blue_1;0.1\noops\n2;red_1;\"9,000\"\n",
        )
        .unwrap();

        let out = export_results_to_json(&path, None).unwrap();
        assert_eq!(out, dir.path().join("track.csv.json"));
        let export = read_json_export(&out).unwrap();
        let direct = query_results(&path, &QueryOptions::default()).unwrap();
        assert_eq!(export.records, direct.records);
        assert_eq!(export.record_count, 2);
        assert_eq!(export.skipped, 1);
        assert_eq!(export.format, ResultFormat::Csv);
        assert_eq!(export.source, path);
    }

    #[test]
    fn explicit_output_and_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.evt");
        std::fs::write(&path, "# nothing yet\n").unwrap();
        let target = dir.path().join("out/export.json");
        assert_eq!(export_results_to_json(&path, Some(&target)).unwrap(), target);
        let export = read_json_export(&target).unwrap();
        assert!(export.records.is_empty());
        assert_eq!(export.format, ResultFormat::EventLog);
    }

    #[test]
    fn unreadable_export_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\n\"source\": 3").unwrap();
        match read_json_export(&path).unwrap_err() {
            ResultError::Parse { location, .. } => assert_eq!(location, SourceLocation::Line(2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_results_to_json(&dir.path().join("gone.csv"), None).unwrap_err();
        assert!(matches!(err, ResultError::NotFound { .. }));
        assert!(!dir.path().join("gone.csv.json").exists());
    }
}
