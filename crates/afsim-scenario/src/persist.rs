//! Reading and writing scenario files.
//!
//! The format is picked by extension: `.json` is the native document,
//! `.afsim` and `.txt` are AFSIM scenario text. All writes are atomic.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use afsim_core::fs::write_atomic;
use afsim_core::Scenario;

use crate::afsim_text;
use crate::error::ScenarioError;

/// On-disk scenario representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    /// Native JSON document.
    Json,
    /// AFSIM scenario text.
    AfsimText,
}

impl FileFormat {
    /// Classify `path` by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "afsim" | "txt" => Some(Self::AfsimText),
            _ => None,
        }
    }
}

/// Read a scenario file of either format.
pub fn read(path: &Path) -> Result<Scenario, ScenarioError> {
    let format = FileFormat::from_path(path).ok_or_else(|| ScenarioError::UnsupportedExtension {
        path: path.to_path_buf(),
    })?;
    let mut scenario = match format {
        FileFormat::Json => read_json(path)?,
        FileFormat::AfsimText => {
            let text = std::fs::read_to_string(path).map_err(|e| ScenarioError::io(path, e))?;
            afsim_text::parse(&text, path)?
        }
    };
    scenario.file_path = Some(path.to_path_buf());
    Ok(scenario)
}

/// Read a native JSON scenario document.
pub fn read_json(path: &Path) -> Result<Scenario, ScenarioError> {
    let file = File::open(path).map_err(|e| ScenarioError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            ScenarioError::Io {
                path: path.to_path_buf(),
                source: e.into(),
            }
        } else {
            ScenarioError::Parse {
                path: path.to_path_buf(),
                line: e.line(),
                column: e.column(),
                detail: e.to_string(),
            }
        }
    })
}

/// Write `scenario` to `path` in the format its extension names.
/// Paths with an unknown extension get the JSON document.
pub fn write(scenario: &Scenario, path: &Path) -> Result<(), ScenarioError> {
    let bytes = match FileFormat::from_path(path) {
        Some(FileFormat::AfsimText) => afsim_text::render(scenario).into_bytes(),
        _ => serde_json::to_vec_pretty(scenario).map_err(|e| ScenarioError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?,
    };
    write_atomic(path, &bytes).map_err(|e| ScenarioError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afsim_core::ErrorKind;

    #[test]
    fn malformed_json_reports_line_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\n  \"name\": \"x\",\n  \"duration_s\": oops\n}").unwrap();
        match read(&path).unwrap_err() {
            ScenarioError::Parse { line, column, .. } => {
                assert_eq!(line, 3);
                assert!(column > 0);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read(Path::new("scenario.yaml")).unwrap_err();
        assert!(matches!(err, ScenarioError::UnsupportedExtension { .. }));
    }

    #[test]
    fn json_write_then_read_keeps_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let s = Scenario::new("keep", 30.0).unwrap();
        write(&s, &path).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back.id(), s.id());
        assert_eq!(back.file_path.as_deref(), Some(path.as_path()));
    }
}
