//! AER playback.
//!
//! [`AerReader`] reads frames from any `Read` source; [`AerSource`] wraps a
//! file and turns frames into normalized records.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use afsim_core::{FieldValue, ResultFormat, ResultRecord};
use tracing::warn;

use crate::codec::{decode_body, decode_frame, decode_header, record_type_name, FileHeader, Frame, HeaderError};
use crate::error::ResultError;
use crate::source::{ReadItem, RecordSource, RecordStream, SkipReason, SourceLocation};
use crate::FORMAT_VERSION;

/// Reads AER frames from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production code
/// can use `BufReader<File>`.
pub struct AerReader<R: Read> {
    reader: R,
    header: FileHeader,
    frames_read: u64,
}

impl<R: Read> AerReader<R> {
    /// Read and check the file header.
    pub fn open(mut reader: R) -> Result<Self, HeaderError> {
        let header = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            header,
            frames_read: 0,
        })
    }

    /// The decoded file header.
    pub fn header(&self) -> FileHeader {
        self.header
    }

    /// Next frame, or `None` at clean EOF.
    pub fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        let frame = decode_frame(&mut self.reader)?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    /// Frames returned so far, including truncated and corrupt ones.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

/// An AER result file.
#[derive(Clone, Debug)]
pub struct AerSource {
    path: PathBuf,
}

impl AerSource {
    /// Read `path` as AER regardless of its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for AerSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::BinaryAer
    }

    fn records(&self) -> Result<RecordStream, ResultError> {
        let file = File::open(&self.path).map_err(|e| ResultError::io(&self.path, e))?;
        let reader = AerReader::open(BufReader::new(file)).map_err(|e| {
            let detail = match e {
                HeaderError::Io(e) => return ResultError::io(&self.path, e),
                HeaderError::Short => "file is shorter than the AER header".to_string(),
                HeaderError::BadMagic(m) => format!("bad magic {m:?}"),
                HeaderError::BadVersion(v) => format!("invalid version {v}"),
            };
            ResultError::Parse {
                path: self.path.clone(),
                location: SourceLocation::Header,
                detail,
            }
        })?;
        if reader.header().version > FORMAT_VERSION {
            warn!(
                path = %self.path.display(),
                version = reader.header().version,
                "AER version newer than supported, reading known fields"
            );
        }
        Ok(Box::new(AerStream {
            path: self.path.clone(),
            reader,
            done: false,
        }))
    }
}

struct AerStream {
    path: PathBuf,
    reader: AerReader<BufReader<File>>,
    done: bool,
}

impl Iterator for AerStream {
    type Item = Result<ReadItem, ResultError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let frame = match self.reader.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(ResultError::io(&self.path, e)));
            }
        };
        let index = self.reader.frames_read();
        let location = SourceLocation::Record(index);
        let item = match frame {
            Frame::Truncated => {
                self.done = true;
                ReadItem::Skipped {
                    location,
                    reason: SkipReason::TruncatedTail,
                }
            }
            Frame::Complete(header, _) if !header.time.is_finite() => ReadItem::Skipped {
                location,
                reason: SkipReason::Malformed("record time is not finite".to_string()),
            },
            Frame::Complete(header, body) => match decode_body(&body) {
                Ok(fields) => {
                    let mut record =
                        ResultRecord::new(self.path.clone(), ResultFormat::BinaryAer, index);
                    record.push("record_type", FieldValue::Text(record_type_name(header.record_type)));
                    record.push("time", FieldValue::Timestamp(header.time));
                    for field in fields {
                        record.set(field.name, field.value);
                    }
                    ReadItem::Record(record)
                }
                Err(detail) => ReadItem::Skipped {
                    location,
                    reason: SkipReason::Malformed(detail),
                },
            },
        };
        Some(Ok(item))
    }
}
