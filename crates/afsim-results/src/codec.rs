//! Binary encode/decode for the AER format.
//!
//! All integers and floats are little-endian. Field names are prefixed with
//! a `u16` length, text values with a `u32` length.

use std::io::{self, Read, Write};

use afsim_core::{Field, FieldValue};

use crate::{FORMAT_VERSION, MAGIC, MAX_BODY_LEN};

/// Size of the file header in bytes.
pub const HEADER_LEN: usize = 8;

/// Size of the fixed part of every record in bytes.
pub const RECORD_HEADER_LEN: usize = 16;

/// Well-known record types.
pub mod record_type {
    /// Periodic platform state.
    pub const ENTITY_STATE: u16 = 1;
    /// Sensor detection.
    pub const DETECTION: u16 = 2;
    /// Weapon launch, hit or miss.
    pub const WEAPON_EVENT: u16 = 3;
    /// Communication message.
    pub const MESSAGE: u16 = 4;
    /// Free-text annotation.
    pub const COMMENT: u16 = 5;
}

/// Field value tags.
pub mod tag {
    /// `f64` number.
    pub const NUMBER: u8 = 0;
    /// `u32`-prefixed UTF-8 text.
    pub const TEXT: u8 = 1;
    /// `f64` simulation time in seconds.
    pub const TIMESTAMP: u8 = 2;
}

/// Display name of a record type.
pub fn record_type_name(t: u16) -> String {
    match t {
        record_type::ENTITY_STATE => "ENTITY_STATE".into(),
        record_type::DETECTION => "DETECTION".into(),
        record_type::WEAPON_EVENT => "WEAPON_EVENT".into(),
        record_type::MESSAGE => "MESSAGE".into(),
        record_type::COMMENT => "COMMENT".into(),
        other => format!("TYPE_{other}"),
    }
}

// ── File header ─────────────────────────────────────────────────

/// Write magic, version and flags.
pub fn encode_header(w: &mut dyn Write, flags: u16) -> io::Result<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&FORMAT_VERSION.to_le_bytes())?;
    w.write_all(&flags.to_le_bytes())?;
    Ok(())
}

/// Decoded file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version.
    pub version: u16,
    /// Header flags (currently unused).
    pub flags: u16,
}

/// Why a header could not be decoded.
#[derive(Debug)]
pub enum HeaderError {
    /// Fewer than eight bytes.
    Short,
    /// Wrong magic.
    BadMagic([u8; 4]),
    /// Version 0 is never valid.
    BadVersion(u16),
    /// Underlying read failed.
    Io(io::Error),
}

/// Read and check the file header.
pub fn decode_header(r: &mut dyn Read) -> Result<FileHeader, HeaderError> {
    let mut buf = [0u8; HEADER_LEN];
    if fill(r, &mut buf).map_err(HeaderError::Io)? < HEADER_LEN {
        return Err(HeaderError::Short);
    }
    let magic = [buf[0], buf[1], buf[2], buf[3]];
    if magic != MAGIC {
        return Err(HeaderError::BadMagic(magic));
    }
    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version == 0 {
        return Err(HeaderError::BadVersion(version));
    }
    Ok(FileHeader {
        version,
        flags: u16::from_le_bytes([buf[6], buf[7]]),
    })
}

// ── Records ─────────────────────────────────────────────────────

/// Fixed part of a record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordHeader {
    /// Record type, see [`record_type`].
    pub record_type: u16,
    /// Record flags (currently unused).
    pub flags: u16,
    /// Simulation time in seconds.
    pub time: f64,
    /// Length of the body that follows.
    pub body_len: u32,
}

/// Outcome of reading one frame.
#[derive(Debug)]
pub enum Frame {
    /// Header and complete body.
    Complete(RecordHeader, Vec<u8>),
    /// The file ends inside the frame, or the length is implausible.
    Truncated,
}

/// Read `buf.len()` bytes unless EOF comes first; returns bytes read.
fn fill(r: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Write one record.
pub fn encode_record(
    w: &mut dyn Write,
    record_type: u16,
    time: f64,
    fields: &[Field],
) -> io::Result<()> {
    let body = encode_body(fields)?;
    let body_len = u32::try_from(body.len())
        .ok()
        .filter(|&n| n <= MAX_BODY_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "record body too large"))?;
    w.write_all(&record_type.to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?;
    w.write_all(&time.to_le_bytes())?;
    w.write_all(&body_len.to_le_bytes())?;
    w.write_all(&body)?;
    Ok(())
}

/// Encode the field list of a record body.
pub fn encode_body(fields: &[Field]) -> io::Result<Vec<u8>> {
    let too_long = |what: &str| io::Error::new(io::ErrorKind::InvalidInput, format!("{what} too long"));
    let count = u16::try_from(fields.len()).map_err(|_| too_long("field list"))?;
    let mut buf = Vec::with_capacity(2 + fields.len() * 16);
    buf.extend_from_slice(&count.to_le_bytes());
    for f in fields {
        let name_len = u16::try_from(f.name.len()).map_err(|_| too_long("field name"))?;
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(f.name.as_bytes());
        match &f.value {
            FieldValue::Number(v) => {
                buf.push(tag::NUMBER);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            FieldValue::Text(s) => {
                let len = u32::try_from(s.len()).map_err(|_| too_long("text value"))?;
                buf.push(tag::TEXT);
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            FieldValue::Timestamp(v) => {
                buf.push(tag::TIMESTAMP);
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    Ok(buf)
}

/// Read one frame.
///
/// Returns `Ok(None)` on clean EOF (no bytes available). A partial header,
/// a short body or a body length above [`MAX_BODY_LEN`] yields
/// [`Frame::Truncated`].
pub fn decode_frame(r: &mut dyn Read) -> io::Result<Option<Frame>> {
    let mut head = [0u8; RECORD_HEADER_LEN];
    let got = fill(r, &mut head)?;
    if got == 0 {
        return Ok(None);
    }
    if got < RECORD_HEADER_LEN {
        return Ok(Some(Frame::Truncated));
    }
    let header = RecordHeader {
        record_type: u16::from_le_bytes([head[0], head[1]]),
        flags: u16::from_le_bytes([head[2], head[3]]),
        time: f64::from_le_bytes([
            head[4], head[5], head[6], head[7], head[8], head[9], head[10], head[11],
        ]),
        body_len: u32::from_le_bytes([head[12], head[13], head[14], head[15]]),
    };
    if header.body_len > MAX_BODY_LEN {
        return Ok(Some(Frame::Truncated));
    }
    let mut body = vec![0u8; header.body_len as usize];
    if fill(r, &mut body)? < body.len() {
        return Ok(Some(Frame::Truncated));
    }
    Ok(Some(Frame::Complete(header, body)))
}

/// Cursor over a record body.
struct Body<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Body<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], String> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| format!("body ends inside {what}"))?;
        let s = &self.data[self.offset..end];
        self.offset = end;
        Ok(s)
    }

    fn u8(&mut self, what: &str) -> Result<u8, String> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16, String> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &str) -> Result<u32, String> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self, what: &str) -> Result<f64, String> {
        let b = self.take(8, what)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        Ok(f64::from_le_bytes(a))
    }

    fn finite(&mut self, what: &str) -> Result<f64, String> {
        let v = self.f64(what)?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(format!("{what} is not finite"))
        }
    }

    fn str(&mut self, n: usize, what: &str) -> Result<String, String> {
        let b = self.take(n, what)?;
        std::str::from_utf8(b)
            .map(str::to_string)
            .map_err(|_| format!("{what} is not UTF-8"))
    }
}

/// Decode a record body. Bytes after the declared fields are ignored;
/// non-finite numbers make the body malformed.
pub fn decode_body(data: &[u8]) -> Result<Vec<Field>, String> {
    let mut body = Body { data, offset: 0 };
    let count = body.u16("field count")?;
    let mut fields = Vec::with_capacity(count as usize);
    for i in 0..count {
        let name_len = body.u16("field name length")? as usize;
        let name = body.str(name_len, "field name")?;
        let value = match body.u8("value tag")? {
            tag::NUMBER => FieldValue::Number(body.finite("number")?),
            tag::TEXT => {
                let len = body.u32("text length")? as usize;
                FieldValue::Text(body.str(len, "text")?)
            }
            tag::TIMESTAMP => FieldValue::Timestamp(body.finite("timestamp")?),
            other => return Err(format!("field {i} has unknown value tag {other}")),
        };
        fields.push(Field { name, value });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: FieldValue) -> Field {
        Field {
            name: name.into(),
            value,
        }
    }

    #[test]
    fn body_encoding_is_little_endian() {
        let body = encode_body(&[field("a", FieldValue::Number(1.0))]).unwrap();
        let mut expected = vec![1, 0, 1, 0, b'a', tag::NUMBER];
        expected.extend_from_slice(&1.0f64.to_le_bytes());
        assert_eq!(body, expected);
    }

    #[test]
    fn decode_body_rejects_overrun_and_bad_tag() {
        let mut body = encode_body(&[field("name", FieldValue::Text("blue".into()))]).unwrap();
        body.truncate(body.len() - 1);
        assert!(decode_body(&body).unwrap_err().contains("text"));

        let mut bad = encode_body(&[field("x", FieldValue::Number(0.0))]).unwrap();
        bad[5] = 9;
        assert!(decode_body(&bad).unwrap_err().contains("unknown value tag 9"));

        let nan = encode_body(&[field("x", FieldValue::Number(f64::NAN))]).unwrap();
        assert!(decode_body(&nan).unwrap_err().contains("not finite"));
    }

    #[test]
    fn decode_body_ignores_trailing_bytes() {
        let mut body = encode_body(&[field("t", FieldValue::Timestamp(2.0))]).unwrap();
        body.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(
            decode_body(&body).unwrap(),
            vec![field("t", FieldValue::Timestamp(2.0))]
        );
    }

    #[test]
    fn frame_clean_eof_vs_truncation() {
        let empty: &[u8] = &[];
        assert!(decode_frame(&mut &*empty).unwrap().is_none());

        let partial: &[u8] = &[1, 0, 0];
        assert!(matches!(
            decode_frame(&mut &*partial).unwrap(),
            Some(Frame::Truncated)
        ));

        let mut buf = Vec::new();
        encode_record(&mut buf, record_type::COMMENT, 1.5, &[]).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            decode_frame(&mut buf.as_slice()).unwrap(),
            Some(Frame::Truncated)
        ));
    }

    #[test]
    fn oversized_body_is_truncation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0f64.to_le_bytes());
        buf.extend_from_slice(&(MAX_BODY_LEN + 1).to_le_bytes());
        assert!(matches!(
            decode_frame(&mut buf.as_slice()).unwrap(),
            Some(Frame::Truncated)
        ));
    }

    #[test]
    fn header_checks() {
        let mut good = Vec::new();
        encode_header(&mut good, 0).unwrap();
        assert_eq!(
            decode_header(&mut good.as_slice()).unwrap(),
            FileHeader { version: FORMAT_VERSION, flags: 0 }
        );
        assert!(matches!(
            decode_header(&mut &b"XXXX\x01\x00\x00\x00"[..]),
            Err(HeaderError::BadMagic(_))
        ));
        assert!(matches!(
            decode_header(&mut &b"WAER\x00\x00\x00\x00"[..]),
            Err(HeaderError::BadVersion(0))
        ));
        assert!(matches!(decode_header(&mut &b"WA"[..]), Err(HeaderError::Short)));
        assert_eq!(record_type_name(7), "TYPE_7");
    }
}
