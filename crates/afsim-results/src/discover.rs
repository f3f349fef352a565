//! Finding result files on disk.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use afsim_core::ResultFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::ResultError;
use crate::MAGIC;

/// One discovered result file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultFileInfo {
    /// Absolute or caller-relative path.
    pub path: PathBuf,
    /// Detected format.
    pub format: ResultFormat,
    /// File size.
    pub size_bytes: u64,
    /// Last modification time, if the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

fn has_aer_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|()| magic == MAGIC)
        .unwrap_or(false)
}

fn classify(path: &Path) -> Option<ResultFormat> {
    match ResultFormat::from_path(path) {
        Some(f) => Some(f),
        None if path.extension().is_none() && has_aer_magic(path) => Some(ResultFormat::BinaryAer),
        None => None,
    }
}

/// Format of a single file: by extension, then by the AER signature for
/// files without one.
pub fn detect_format(path: &Path) -> Result<ResultFormat, ResultError> {
    let meta = std::fs::metadata(path).map_err(|e| ResultError::io(path, e))?;
    if !meta.is_file() {
        return Err(ResultError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }
    classify(path).ok_or_else(|| ResultError::UnsupportedFormat {
        path: path.to_path_buf(),
    })
}

/// Every recognized result file under `dir`, recursively, sorted by path.
///
/// `formats` restricts the listing; `None` or an empty slice means all.
/// A missing directory yields an empty list; unreadable entries are
/// skipped.
pub fn list_result_files(
    dir: &Path,
    formats: Option<&[ResultFormat]>,
) -> Result<Vec<ResultFileInfo>, ResultError> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "result directory does not exist");
        return Ok(Vec::new());
    }
    let wanted = |f: ResultFormat| match formats {
        Some(list) if !list.is_empty() => list.contains(&f),
        _ => true,
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(format) = classify(entry.path()) else {
            continue;
        };
        if !wanted(format) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "skipping file without metadata");
                continue;
            }
        };
        files.push(ResultFileInfo {
            path: entry.path().to_path_buf(),
            format,
            size_bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    info!(dir = %dir.display(), count = files.len(), "result files listed");
    Ok(files)
}
