//! QMI TLV framing.
//!
//! Each field is `type: u8, length: u16 (LE), value`. Variable arrays
//! carry their own element count inside the value: blobs use a `u16`
//! length prefix, element lists and strings a `u8` one.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use thiserror::Error;

/// Size of a TLV header (type + length).
pub const TLV_HEADER_SIZE: usize = 3;

/// Largest blob a `u16` length prefix can describe.
pub const MAX_BLOB_LEN: usize = u16::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated TLV header at offset {offset}")]
    TruncatedHeader { offset: usize },

    #[error("TLV 0x{tag:02X} declares {declared} bytes, only {available} available")]
    TruncatedValue {
        tag: u8,
        declared: usize,
        available: usize,
    },

    #[error("Missing mandatory TLV 0x{tag:02X}")]
    MissingField { tag: u8 },

    #[error("Malformed TLV 0x{tag:02X}")]
    Malformed { tag: u8 },

    #[error("TLV 0x{tag:02X} holds {len} elements, at most {max} allowed")]
    TooLong { tag: u8, len: usize, max: usize },
}

/// Builds the value part of one TLV field.
#[derive(Debug, Default)]
pub struct ValueBuilder {
    buf: Vec<u8>,
}

impl ValueBuilder {
    fn grow(&mut self, n: usize) -> usize {
        let at = self.buf.len();
        self.buf.resize(at + n, 0);
        at
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let at = self.grow(2);
        LittleEndian::write_u16(&mut self.buf[at..], v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let at = self.grow(4);
        LittleEndian::write_u32(&mut self.buf[at..], v);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        let at = self.grow(8);
        LittleEndian::write_u64(&mut self.buf[at..], v);
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// Writes `v` zero-padded (or cut) to exactly `width` bytes.
    pub fn fixed_str(&mut self, v: &str, width: usize) -> &mut Self {
        let at = self.grow(width);
        let n = v.len().min(width);
        self.buf[at..at + n].copy_from_slice(&v.as_bytes()[..n]);
        self
    }
}

/// Serializes a message as a sequence of TLV fields.
#[derive(Debug, Default)]
pub struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one field whose value is produced by `build`.
    pub fn field(&mut self, tag: u8, build: impl FnOnce(&mut ValueBuilder)) -> &mut Self {
        let mut value = ValueBuilder::default();
        build(&mut value);
        self.raw(tag, &value.buf)
    }

    /// Appends one field with a pre-encoded value.
    pub fn raw(&mut self, tag: u8, value: &[u8]) -> &mut Self {
        let at = self.buf.len();
        self.buf.resize(at + TLV_HEADER_SIZE, 0);
        self.buf[at] = tag;
        LittleEndian::write_u16(&mut self.buf[at + 1..], value.len() as u16);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn put_u8(&mut self, tag: u8, v: u8) -> &mut Self {
        self.field(tag, |b| {
            b.u8(v);
        })
    }

    pub fn put_u16(&mut self, tag: u8, v: u16) -> &mut Self {
        self.field(tag, |b| {
            b.u16(v);
        })
    }

    pub fn put_u32(&mut self, tag: u8, v: u32) -> &mut Self {
        self.field(tag, |b| {
            b.u32(v);
        })
    }

    pub fn put_u64(&mut self, tag: u8, v: u64) -> &mut Self {
        self.field(tag, |b| {
            b.u64(v);
        })
    }

    pub fn put_bool(&mut self, tag: u8, v: bool) -> &mut Self {
        self.put_u8(tag, v as u8)
    }

    /// Length-prefixed (`u16`) byte blob.
    pub fn put_blob(&mut self, tag: u8, data: &[u8]) -> &mut Self {
        self.field(tag, |b| {
            b.u16(data.len() as u16).bytes(data);
        })
    }

    /// Length-prefixed (`u8`) string, cut to `max` bytes.
    pub fn put_str(&mut self, tag: u8, s: &str, max: usize) -> &mut Self {
        let n = s.len().min(max);
        self.field(tag, |b| {
            b.u8(n as u8).bytes(&s.as_bytes()[..n]);
        })
    }

    /// Count-prefixed (`u8`) element list.
    pub fn put_list<I: IntoIterator>(
        &mut self,
        tag: u8,
        items: I,
        mut each: impl FnMut(&mut ValueBuilder, I::Item),
    ) -> &mut Self
    where
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self.field(tag, |b| {
            b.u8(items.len() as u8);
            for item in items {
                each(b, item);
            }
        })
    }

    pub fn put_opt_u8(&mut self, tag: u8, v: Option<u8>) -> &mut Self {
        if let Some(v) = v {
            self.put_u8(tag, v);
        }
        self
    }

    pub fn put_opt_u16(&mut self, tag: u8, v: Option<u16>) -> &mut Self {
        if let Some(v) = v {
            self.put_u16(tag, v);
        }
        self
    }

    pub fn put_opt_u32(&mut self, tag: u8, v: Option<u32>) -> &mut Self {
        if let Some(v) = v {
            self.put_u32(tag, v);
        }
        self
    }

    pub fn put_opt_u64(&mut self, tag: u8, v: Option<u64>) -> &mut Self {
        if let Some(v) = v {
            self.put_u64(tag, v);
        }
        self
    }

    pub fn put_opt_bool(&mut self, tag: u8, v: Option<bool>) -> &mut Self {
        if let Some(v) = v {
            self.put_bool(tag, v);
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over one field's value.
pub struct ValueReader<'a> {
    tag: u8,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ValueReader<'a> {
    fn new(tag: u8, value: &'a [u8]) -> Self {
        Self {
            tag,
            cursor: Cursor::new(value),
        }
    }

    fn malformed(&self) -> CodecError {
        CodecError::Malformed { tag: self.tag }
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        self.cursor.read_u8().map_err(|_| self.malformed())
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.malformed())
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.malformed())
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| self.malformed())
    }

    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; n];
        self.cursor
            .read_exact(&mut out)
            .map_err(|_| self.malformed())?;
        Ok(out)
    }

    /// Reads a fixed-width, NUL-padded string.
    pub fn fixed_str(&mut self, width: usize) -> Result<String, CodecError> {
        let raw = self.bytes(width)?;
        let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

/// Parsed view of a TLV payload. The first occurrence of a tag wins.
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    fields: Vec<(u8, &'a [u8])>,
}

impl<'a> TlvReader<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, CodecError> {
        let mut fields = Vec::new();
        let mut offset = 0;
        while offset < payload.len() {
            if payload.len() - offset < TLV_HEADER_SIZE {
                return Err(CodecError::TruncatedHeader { offset });
            }
            let tag = payload[offset];
            let len = LittleEndian::read_u16(&payload[offset + 1..]) as usize;
            let start = offset + TLV_HEADER_SIZE;
            let available = payload.len() - start;
            if len > available {
                return Err(CodecError::TruncatedValue {
                    tag,
                    declared: len,
                    available,
                });
            }
            fields.push((tag, &payload[start..start + len]));
            offset = start + len;
        }
        Ok(Self { fields })
    }

    pub fn has(&self, tag: u8) -> bool {
        self.fields.iter().any(|(t, _)| *t == tag)
    }

    pub fn value(&self, tag: u8) -> Option<ValueReader<'a>> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(t, v)| ValueReader::new(*t, v))
    }

    pub fn require(&self, tag: u8) -> Result<ValueReader<'a>, CodecError> {
        self.value(tag).ok_or(CodecError::MissingField { tag })
    }

    pub fn opt_u8(&self, tag: u8) -> Result<Option<u8>, CodecError> {
        self.value(tag).map(|mut v| v.u8()).transpose()
    }

    pub fn opt_u16(&self, tag: u8) -> Result<Option<u16>, CodecError> {
        self.value(tag).map(|mut v| v.u16()).transpose()
    }

    pub fn opt_u32(&self, tag: u8) -> Result<Option<u32>, CodecError> {
        self.value(tag).map(|mut v| v.u32()).transpose()
    }

    pub fn opt_u64(&self, tag: u8) -> Result<Option<u64>, CodecError> {
        self.value(tag).map(|mut v| v.u64()).transpose()
    }

    pub fn opt_bool(&self, tag: u8) -> Result<Option<bool>, CodecError> {
        Ok(self.opt_u8(tag)?.map(|v| v != 0))
    }

    pub fn req_u8(&self, tag: u8) -> Result<u8, CodecError> {
        self.require(tag)?.u8()
    }

    pub fn req_u32(&self, tag: u8) -> Result<u32, CodecError> {
        self.require(tag)?.u32()
    }

    pub fn req_u64(&self, tag: u8) -> Result<u64, CodecError> {
        self.require(tag)?.u64()
    }

    /// Length-prefixed (`u16`) byte blob, bounded by `max`.
    pub fn opt_blob(&self, tag: u8, max: usize) -> Result<Option<Vec<u8>>, CodecError> {
        let Some(mut v) = self.value(tag) else {
            return Ok(None);
        };
        let len = v.u16()? as usize;
        if len > max {
            return Err(CodecError::TooLong { tag, len, max });
        }
        v.bytes(len).map(Some)
    }

    /// Length-prefixed (`u8`) string. Longer strings are cut to `max` bytes.
    pub fn opt_str(&self, tag: u8, max: usize) -> Result<Option<String>, CodecError> {
        let Some(mut v) = self.value(tag) else {
            return Ok(None);
        };
        let len = v.u8()? as usize;
        let raw = v.bytes(len)?;
        let keep = len.min(max);
        Ok(Some(String::from_utf8_lossy(&raw[..keep]).into_owned()))
    }

    /// Count-prefixed (`u8`) element list. Returns the declared count and
    /// at most `max` decoded elements.
    pub fn opt_list<E>(
        &self,
        tag: u8,
        max: usize,
        mut each: impl FnMut(&mut ValueReader<'a>) -> Result<E, CodecError>,
    ) -> Result<Option<(usize, Vec<E>)>, CodecError> {
        let Some(mut v) = self.value(tag) else {
            return Ok(None);
        };
        let declared = v.u8()? as usize;
        let keep = declared.min(max);
        let mut items = Vec::with_capacity(keep);
        for _ in 0..keep {
            items.push(each(&mut v)?);
        }
        Ok(Some((declared, items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut w = TlvWriter::new();
        w.put_u16(0x10, 0xBEEF);
        assert_eq!(w.into_bytes(), vec![0x10, 0x02, 0x00, 0xEF, 0xBE]);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut w = TlvWriter::new();
        w.put_u8(0x10, 1).put_u8(0x10, 2);
        let bytes = w.into_bytes();
        let r = TlvReader::parse(&bytes).unwrap();
        assert_eq!(r.opt_u8(0x10).unwrap(), Some(1));
    }

    #[test]
    fn test_truncated_value_rejected() {
        let bytes = [0x10, 0x04, 0x00, 0x01, 0x02];
        let err = TlvReader::parse(&bytes).unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedValue {
                tag: 0x10,
                declared: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = [0x10, 0x01];
        assert!(matches!(
            TlvReader::parse(&bytes),
            Err(CodecError::TruncatedHeader { offset: 0 })
        ));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let r = TlvReader::parse(&[]).unwrap();
        assert_eq!(
            r.req_u32(0x01).unwrap_err(),
            CodecError::MissingField { tag: 0x01 }
        );
        assert_eq!(r.opt_u32(0x10).unwrap(), None);
    }

    #[test]
    fn test_short_value_is_malformed() {
        let mut w = TlvWriter::new();
        w.put_u8(0x10, 7);
        let bytes = w.into_bytes();
        let r = TlvReader::parse(&bytes).unwrap();
        assert_eq!(
            r.opt_u32(0x10).unwrap_err(),
            CodecError::Malformed { tag: 0x10 }
        );
    }

    #[test]
    fn test_blob_bound_enforced() {
        let mut w = TlvWriter::new();
        w.put_blob(0x11, &[0u8; 10]);
        let bytes = w.into_bytes();
        let r = TlvReader::parse(&bytes).unwrap();
        assert!(matches!(
            r.opt_blob(0x11, 4),
            Err(CodecError::TooLong { len: 10, max: 4, .. })
        ));
        assert_eq!(r.opt_blob(0x11, 16).unwrap().unwrap().len(), 10);
    }

    #[test]
    fn test_list_clamps_but_reports_declared_count() {
        let mut w = TlvWriter::new();
        w.put_list(0x12, [1u32, 2, 3], |b, v| {
            b.u32(v);
        });
        let bytes = w.into_bytes();
        let r = TlvReader::parse(&bytes).unwrap();
        let (declared, items) = r.opt_list(0x12, 2, |v| v.u32()).unwrap().unwrap();
        assert_eq!(declared, 3);
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_fixed_str_padding() {
        let mut w = TlvWriter::new();
        w.field(0x13, |b| {
            b.fixed_str("abc", 8);
        });
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), TLV_HEADER_SIZE + 8);
        let r = TlvReader::parse(&bytes).unwrap();
        assert_eq!(r.require(0x13).unwrap().fixed_str(8).unwrap(), "abc");
    }
}
