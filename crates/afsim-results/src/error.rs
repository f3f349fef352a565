//! Error types for result discovery, parsing and export.

use std::fmt;
use std::io;
use std::path::PathBuf;

use afsim_core::{ErrorKind, ResultFormat};

use crate::source::SourceLocation;

/// Errors from result-file operations.
///
/// Malformed rows and records are not errors; they are skipped and counted.
/// A `Parse` error means the file as a whole cannot be read (bad header,
/// bad magic).
#[derive(Debug)]
pub enum ResultError {
    /// The file or directory does not exist.
    NotFound {
        /// The requested path.
        path: PathBuf,
    },
    /// An I/O error occurred during read or write.
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file is not a recognized result format.
    UnsupportedFormat {
        /// The offending path.
        path: PathBuf,
    },
    /// A format-specific query was given a file of another format.
    FormatMismatch {
        /// The offending path.
        path: PathBuf,
        /// Format the operation reads.
        expected: ResultFormat,
        /// Format detected, if any.
        found: Option<ResultFormat>,
    },
    /// The file cannot be parsed at all.
    Parse {
        /// File being read.
        path: PathBuf,
        /// Where the problem was found.
        location: SourceLocation,
        /// What was wrong.
        detail: String,
    },
    /// A filter expression could not be understood.
    InvalidFilter {
        /// The expression as given.
        expr: String,
        /// What was wrong.
        detail: String,
    },
}

impl ResultError {
    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::UnsupportedFormat { .. }
            | Self::FormatMismatch { .. }
            | Self::InvalidFilter { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "result file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::UnsupportedFormat { path } => {
                write!(f, "unsupported result file: {}", path.display())
            }
            Self::FormatMismatch {
                path,
                expected,
                found,
            } => match found {
                Some(found) => write!(
                    f,
                    "{} is {found}, expected {expected}",
                    path.display()
                ),
                None => write!(
                    f,
                    "{} is not a recognized result file, expected {expected}",
                    path.display()
                ),
            },
            Self::Parse {
                path,
                location,
                detail,
            } => write!(f, "{} ({location}): {detail}", path.display()),
            Self::InvalidFilter { expr, detail } => {
                write!(f, "invalid filter '{expr}': {detail}")
            }
        }
    }
}

impl std::error::Error for ResultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
