//! The common record-stream abstraction over every result format.

use std::fmt;
use std::path::Path;

use afsim_core::{ResultFormat, ResultRecord};
use serde::{Deserialize, Serialize};

use crate::csv::CsvSource;
use crate::discover::detect_format;
use crate::error::ResultError;
use crate::evt::EvtSource;
use crate::reader::AerSource;

/// Where in a file something was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    /// File header (CSV header row, AER magic and version).
    Header,
    /// 1-based text line.
    Line(u64),
    /// 1-based binary record index.
    Record(u64),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Line(n) => write!(f, "line {n}"),
            Self::Record(n) => write!(f, "record {n}"),
        }
    }
}

/// Why an entry was not turned into a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry could not be parsed; reading continued past it.
    Malformed(String),
    /// The file ends inside an entry; nothing follows.
    TruncatedTail,
}

/// One step of a [`RecordStream`].
#[derive(Clone, Debug, PartialEq)]
pub enum ReadItem {
    /// A parsed record.
    Record(ResultRecord),
    /// An entry that was skipped.
    Skipped {
        /// Where it was.
        location: SourceLocation,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

/// Lazy stream of items. An `Err` item is fatal and ends the stream.
pub type RecordStream = Box<dyn Iterator<Item = Result<ReadItem, ResultError>> + Send>;

/// A result file that can be read as normalized records.
///
/// [`records`](RecordSource::records) reopens the file on every call, so a
/// source can be streamed any number of times.
pub trait RecordSource: Send {
    /// File being read.
    fn path(&self) -> &Path;

    /// Format of the file.
    fn format(&self) -> ResultFormat;

    /// Start a fresh pass over the file.
    fn records(&self) -> Result<RecordStream, ResultError>;
}

/// Open `path` with the parser its detected format calls for.
pub fn open_source(path: &Path) -> Result<Box<dyn RecordSource>, ResultError> {
    let source: Box<dyn RecordSource> = match detect_format(path)? {
        ResultFormat::Csv => Box::new(CsvSource::new(path)),
        ResultFormat::EventLog => Box::new(EvtSource::new(path)),
        ResultFormat::BinaryAer => Box::new(AerSource::new(path)),
    };
    Ok(source)
}

/// Line iterator that tolerates invalid UTF-8 and tracks line numbers.
pub(crate) struct Lines<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
}

impl<R: std::io::BufRead> Lines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Next `(line_number, text)` with the line terminator removed.
    pub(crate) fn next_line(&mut self) -> std::io::Result<Option<(u64, String)>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        Ok(Some((self.line, text)))
    }
}
