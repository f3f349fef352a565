//! Delimited-text result files.
//!
//! The first non-blank line is the header and names the fields. The
//! delimiter (`,`, `;` or tab) is sniffed from the header. Cells may be
//! double-quoted with `""` as an escaped quote; quoted cells do not span
//! lines. A row whose cell count differs from the header is skipped.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use afsim_core::{ResultFormat, ResultRecord};

use crate::error::ResultError;
use crate::source::{Lines, ReadItem, RecordSource, RecordStream, SkipReason, SourceLocation};
use crate::value::type_cell;

const CANDIDATES: [char; 3] = [',', ';', '\t'];

/// Pick the candidate delimiter occurring most often outside quotes.
pub fn sniff_delimiter(header: &str) -> char {
    let mut counts = [0usize; 3];
    let mut in_quotes = false;
    for c in header.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = CANDIDATES.iter().position(|&d| d == c) {
                counts[i] += 1;
            }
        }
    }
    let mut best = 0;
    for i in 1..CANDIDATES.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATES[best]
}

/// Split one line into cells.
pub fn split_row(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut at_cell_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
            continue;
        }
        if c == delimiter {
            cells.push(std::mem::take(&mut cell));
            at_cell_start = true;
            continue;
        }
        if c == '"' && at_cell_start {
            cell.clear();
            in_quotes = true;
        } else {
            cell.push(c);
        }
        if in_quotes || !c.is_whitespace() {
            at_cell_start = false;
        }
    }
    if in_quotes {
        return Err("unterminated quoted cell".to_string());
    }
    cells.push(cell);
    Ok(cells)
}

/// A CSV result file.
#[derive(Clone, Debug)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Read `path` as CSV regardless of its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for CsvSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> ResultFormat {
        ResultFormat::Csv
    }

    fn records(&self) -> Result<RecordStream, ResultError> {
        let file = File::open(&self.path).map_err(|e| ResultError::io(&self.path, e))?;
        let mut lines = Lines::new(BufReader::new(file));

        let header_line = loop {
            match lines
                .next_line()
                .map_err(|e| ResultError::io(&self.path, e))?
            {
                None => return Ok(Box::new(std::iter::empty())),
                Some((_, text)) if text.trim().is_empty() => continue,
                Some((_, text)) => break text,
            }
        };
        let header_line = header_line.trim_start_matches('\u{feff}');
        let delimiter = sniff_delimiter(header_line);
        let header: Vec<String> = split_row(header_line, delimiter)
            .map_err(|detail| ResultError::Parse {
                path: self.path.clone(),
                location: SourceLocation::Header,
                detail,
            })?
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let name = name.trim();
                if name.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    name.to_string()
                }
            })
            .collect();

        Ok(Box::new(CsvStream {
            path: self.path.clone(),
            lines,
            delimiter,
            header,
            done: false,
        }))
    }
}

struct CsvStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    delimiter: char,
    header: Vec<String>,
    done: bool,
}

impl Iterator for CsvStream {
    type Item = Result<ReadItem, ResultError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (line_no, text) = match self.lines.next_line() {
                Ok(Some(l)) => l,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ResultError::io(&self.path, e)));
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            let location = SourceLocation::Line(line_no);
            let cells = match split_row(&text, self.delimiter) {
                Ok(c) => c,
                Err(detail) => {
                    return Some(Ok(ReadItem::Skipped {
                        location,
                        reason: SkipReason::Malformed(detail),
                    }))
                }
            };
            if cells.len() != self.header.len() {
                return Some(Ok(ReadItem::Skipped {
                    location,
                    reason: SkipReason::Malformed(format!(
                        "expected {} cells, found {}",
                        self.header.len(),
                        cells.len()
                    )),
                }));
            }
            let mut record = ResultRecord::new(self.path.clone(), ResultFormat::Csv, line_no);
            for (name, raw) in self.header.iter().zip(&cells) {
                record.set(name.clone(), type_cell(name, raw));
            }
            return Some(Ok(ReadItem::Record(record)));
        }
    }
}
