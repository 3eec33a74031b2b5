//! Header byte and length-varint primitives.
//!
//! ```text
//! byte = (code & 0x7) | (length_field << 3)
//!   length_field 0..=22   inline value
//!   length_field 23..=30  (length_field - 22) little-endian bytes follow
//!   length_field 31       varint byte count, then that many little-endian bytes
//! ```

use crate::error::{constants, CodecError, Result};
use num_bigint::BigUint;
use std::io::{self, Read, Write};

pub const TYPE_INT: u8 = 0;
pub const TYPE_EXTRA: u8 = 1;
pub const TYPE_NINT: u8 = 2;
pub const TYPE_TEXT: u8 = 3;
pub const TYPE_BIN: u8 = 4;
pub const TYPE_CREF: u8 = 5;
pub const TYPE_LIST: u8 = 6;
pub const TYPE_DICT: u8 = 7;

pub const XT_DZERO: u64 = 1;
pub const XT_DONE: u64 = 2;
pub const XT_DMINUSONE: u64 = 4;
pub const XT_DOUBLE: u64 = 7;
pub const XT_TTRUE: u64 = 12;
pub const XT_FALSE: u64 = 13;
pub const XT_TIME: u64 = 15;
pub const XT_STREAM_MODE: u64 = 16;

const MAX_INLINE: u64 = 22;
const BIG_FIELD: u8 = 31;

/// Decoded header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Inline or raw little-endian value of up to 8 bytes.
    Small(u64),
    /// Arbitrary-precision value (length field 31).
    Big(BigUint),
}

/// One decoded header: a type code plus its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub code: u8,
    pub value: HeaderValue,
}

impl Header {
    /// Value as a length or count; big values are always rejected.
    pub fn length(&self) -> Result<u64> {
        match &self.value {
            HeaderValue::Small(v) => Ok(*v),
            HeaderValue::Big(_) => Err(CodecError::MalformedStream(
                constants::ERR_BIG_LENGTH.to_string(),
            )),
        }
    }
}

/// Number of bytes needed to hold `value` (at least one).
#[inline]
fn size_in_bytes(mut value: u64) -> usize {
    let mut count = 1;
    while value > 0xFF {
        count += 1;
        value >>= 8;
    }
    count
}

/// Write a header for a value that fits in 64 bits, picking the narrowest form.
pub fn write_header<W: Write>(out: &mut W, code: u8, value: u64) -> io::Result<()> {
    debug_assert!(code <= 7);
    if value <= MAX_INLINE {
        return out.write_all(&[code | ((value as u8) << 3)]);
    }
    let n = size_in_bytes(value);
    let mut buf = [0u8; 9];
    buf[0] = code | (((n as u8) + 22) << 3);
    buf[1..=n].copy_from_slice(&value.to_le_bytes()[..n]);
    out.write_all(&buf[..=n])
}

/// Write a header for an arbitrary-precision value.
///
/// Values that fit in 64 bits are written in the narrow form, so the same
/// integer always has exactly one encoding.
pub fn write_header_big<W: Write>(out: &mut W, code: u8, value: &BigUint) -> io::Result<()> {
    if let Ok(small) = u64::try_from(value) {
        return write_header(out, code, small);
    }
    let bytes = value.to_bytes_le();
    out.write_all(&[code | (BIG_FIELD << 3)])?;
    write_varint(out, bytes.len() as u64)?;
    out.write_all(&bytes)
}

/// Write a self-terminating length varint.
///
/// Seven bits per byte, least significant group first; the high bit marks the
/// LAST byte rather than a continuation.
pub fn write_varint<W: Write>(out: &mut W, mut value: u64) -> io::Result<()> {
    let mut buf = [0u8; 10];
    let mut i = 0;
    while value > 0x7F {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        i += 1;
    }
    buf[i] = (value as u8) | 0x80;
    out.write_all(&buf[..=i])
}

/// Read one byte, or `None` on a clean end of input.
pub fn read_byte_opt<R: Read>(input: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CodecError::Io(e)),
        }
    }
}

fn read_byte<R: Read>(input: &mut R, context: &'static str) -> Result<u8> {
    read_byte_opt(input)?.ok_or_else(|| CodecError::MalformedStream(context.to_string()))
}

/// Fill `buf` completely, mapping a short read to `MalformedStream`.
pub fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::MalformedStream(constants::ERR_EOF_IN_PAYLOAD.to_string())
        } else {
            CodecError::Io(e)
        }
    })
}

/// Read a self-terminating length varint.
pub fn read_varint<R: Read>(input: &mut R) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = read_byte(input, constants::ERR_EOF_IN_VARINT)?;
        let chunk = u64::from(byte & 0x7F);
        if shift >= 64 || (shift > 0 && chunk >> (64 - shift) != 0) {
            return Err(CodecError::MalformedStream(
                constants::ERR_VARINT_OVERFLOW.to_string(),
            ));
        }
        value |= chunk << shift;
        if byte & 0x80 != 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Decode the remainder of a header whose first byte has already been read.
pub fn read_header_after<R: Read>(input: &mut R, first: u8, max_big_len: usize) -> Result<Header> {
    let code = first & 0x7;
    let field = first >> 3;
    let value = if field == BIG_FIELD {
        let length = read_varint(input)?;
        if length > max_big_len as u64 {
            return Err(CodecError::MalformedStream(format!(
                "Integer header declares {length} bytes (limit {max_big_len})"
            )));
        }
        let mut raw = vec![0u8; length as usize];
        read_exact(input, &mut raw)?;
        HeaderValue::Big(BigUint::from_bytes_le(&raw))
    } else if u64::from(field) > MAX_INLINE {
        let n = usize::from(field) - 22;
        let mut raw = [0u8; 8];
        read_exact(input, &mut raw[..n]).map_err(|e| match e {
            CodecError::MalformedStream(_) => {
                CodecError::MalformedStream(constants::ERR_EOF_IN_HEADER.to_string())
            }
            other => other,
        })?;
        HeaderValue::Small(u64::from_le_bytes(raw))
    } else {
        HeaderValue::Small(u64::from(field))
    };
    Ok(Header { code, value })
}

/// Read a complete header; `None` on a clean end of input before its first byte.
pub fn read_header_opt<R: Read>(input: &mut R, max_big_len: usize) -> Result<Option<Header>> {
    match read_byte_opt(input)? {
        Some(first) => read_header_after(input, first, max_big_len).map(Some),
        None => Ok(None),
    }
}

/// Read a complete header; end of input is `MalformedStream`.
pub fn read_header<R: Read>(input: &mut R, max_big_len: usize) -> Result<Header> {
    let first = read_byte(input, constants::ERR_EOF_IN_HEADER)?;
    read_header_after(input, first, max_big_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(code: u8, value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(&mut out, code, value).unwrap();
        out
    }

    #[test]
    fn test_inline_and_short_forms() {
        assert_eq!(header_bytes(TYPE_INT, 7), [0x38]);
        assert_eq!(header_bytes(TYPE_INT, 22), [0xB0]);
        assert_eq!(header_bytes(TYPE_INT, 23), [0xB8, 0x17]);
        assert_eq!(header_bytes(TYPE_INT, 331), [0xC0, 0x4B, 0x01]);
        assert_eq!(header_bytes(TYPE_NINT, 99), [0xBA, 0x63]);
    }

    #[test]
    fn test_varint_polarity() {
        let mut out = Vec::new();
        write_varint(&mut out, 9).unwrap();
        assert_eq!(out, [0x89]);

        out.clear();
        write_varint(&mut out, 1375965738).unwrap();
        assert_eq!(out, [0x2A, 0x24, 0x0E, 0x10, 0x85]);
        assert_eq!(read_varint(&mut Cursor::new(out)).unwrap(), 1375965738);
    }

    #[test]
    fn test_varint_overflow_rejected() {
        let data = [0x7Fu8; 11];
        assert!(matches!(
            read_varint(&mut Cursor::new(data)),
            Err(CodecError::MalformedStream(_))
        ));
    }

    #[test]
    fn test_big_header_roundtrip() {
        let big = BigUint::parse_bytes(b"97152833356252188945", 10).unwrap();
        let mut out = Vec::new();
        write_header_big(&mut out, TYPE_INT, &big).unwrap();
        assert_eq!(
            out,
            [0xF8, 0x89, 0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x44, 0x44, 0x05]
        );
        let header = read_header(&mut Cursor::new(out), 1024).unwrap();
        assert_eq!(header.value, HeaderValue::Big(big));
    }

    #[test]
    fn test_truncated_header() {
        let err = read_header(&mut Cursor::new([0xC0u8, 0x4B]), 1024).unwrap_err();
        assert!(matches!(err, CodecError::MalformedStream(_)));
        assert!(read_header_opt(&mut Cursor::new(Vec::<u8>::new()), 1024)
            .unwrap()
            .is_none());
    }
}
