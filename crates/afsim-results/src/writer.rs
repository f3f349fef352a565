//! AER recording.

use std::io::{self, Write};

use afsim_core::Field;

use crate::codec::{encode_header, encode_record};

/// Writes AER records to any `Write` sink. The file header is written on
/// construction.
pub struct AerWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> AerWriter<W> {
    /// Write the header and return a writer positioned for records.
    pub fn new(mut writer: W) -> io::Result<Self> {
        encode_header(&mut writer, 0)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Append one record.
    pub fn write_record(&mut self, record_type: u16, time: f64, fields: &[Field]) -> io::Result<()> {
        encode_record(&mut self.writer, record_type, time, fields)?;
        self.records_written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
