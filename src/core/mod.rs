//! # Binary Codec
//!
//! The BOSS wire format: a sequence of self-delimiting values, each a header
//! byte, optional length bytes and an optional raw payload. There is no
//! framing, trailer or checksum.
//!
//! ## Components
//! - **header**: header byte and length-varint primitives
//! - **cache**: back-reference caches for tree and stream mode
//! - **writer** / **reader**: the encoder and decoder sessions
//!
//! ## Wire Format
//! ```text
//! code  0 INT   1 EXTRA  2 NINT  3 TEXT  4 BIN  5 CREF  6 LIST  7 DICT
//! CREF 0 is null; CREF n refers to the n-th cached value of the session
//! ```
//!
//! ## Safety Limits
//! - Declared payload and container lengths are checked against
//!   [`LimitsConfig::max_payload_size`](crate::config::LimitsConfig) before allocation
//! - Container nesting is bounded by `max_depth`

pub mod cache;
pub mod header;
pub mod reader;
pub mod writer;

use crate::error::Result;
use crate::mapper::Mapper;
use crate::types::Value;
use std::io::Cursor;

pub use cache::{CacheMode, CacheStats};
pub use reader::Reader;
pub use writer::Writer;

/// Encode one value in tree mode with the codec mapper.
pub fn dump(value: &Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write(value)?;
    Ok(writer.into_inner())
}

/// Encode several values into one buffer, sharing a single cache.
pub fn dump_all<'a, I>(values: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut writer = Writer::new(Vec::new());
    writer.write_all(values)?;
    Ok(writer.into_inner())
}

/// Encode one value, converting typed objects with `mapper`.
pub fn dump_with(value: &Value, mapper: &Mapper) -> Result<Vec<u8>> {
    let mut writer = Writer::with_mapper(Vec::new(), mapper);
    writer.write(value)?;
    Ok(writer.into_inner())
}

/// Decode the first value of `data`.
pub fn load(data: &[u8]) -> Result<Value> {
    Reader::new(Cursor::new(data)).read()
}

/// Decode the first value of `data`, building typed objects with `mapper`.
pub fn load_with(data: &[u8], mapper: &Mapper) -> Result<Value> {
    Reader::with_mapper(Cursor::new(data), mapper).read()
}

/// Decode every value in `data`.
pub fn load_all(data: &[u8]) -> Result<Vec<Value>> {
    let mut reader = Reader::new(Cursor::new(data));
    let mut values = Vec::new();
    while let Some(value) = reader.try_read()? {
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_load() {
        let value = Value::list([Value::from("a"), Value::from(-5), Value::Null]);
        assert_eq!(load(&dump(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn test_load_all_shares_cache() {
        let a = Value::from("shared");
        let bytes = dump_all([&a, &a]).unwrap();
        assert_eq!(bytes.last(), Some(&0x0D));
        assert_eq!(load_all(&bytes).unwrap(), vec![a.clone(), a]);
    }
}
