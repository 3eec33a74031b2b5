//! BOSS encoder.

use crate::config::{CodecConfig, StreamCacheConfig};
use crate::core::cache::{CacheKey, CacheStats, WriteCache};
use crate::core::header::{
    write_header, write_header_big, write_varint, TYPE_BIN, TYPE_CREF, TYPE_DICT, TYPE_EXTRA,
    TYPE_INT, TYPE_LIST, TYPE_NINT, TYPE_TEXT, XT_DMINUSONE, XT_DONE, XT_DOUBLE, XT_DZERO,
    XT_FALSE, XT_STREAM_MODE, XT_TIME, XT_TTRUE,
};
use crate::error::{constants, CodecError, Result};
use crate::mapper::{codec_mapper, Mapper, Serializer};
use crate::types::Value;
use chrono::{DateTime, Utc};
use num_bigint::{BigInt, Sign};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Writes a sequence of BOSS-encoded values to an output.
///
/// A writer starts in tree mode: every text, binary, list and dictionary is
/// remembered and repeated occurrences are written as back-references, so
/// shared structure survives the round trip. [`Writer::set_stream_mode`]
/// switches to a bounded cache for long-lived connections.
///
/// A writer is single-session state; use one per output and thread.
pub struct Writer<W: Write> {
    out: W,
    cache: WriteCache,
    serializer: Serializer,
    stream_limits: StreamCacheConfig,
}

impl<W: Write> Writer<W> {
    /// Writer over `out` using the codec mapper and default stream bounds.
    pub fn new(out: W) -> Self {
        Self::with_config(out, &CodecConfig::default())
    }

    pub fn with_config(out: W, config: &CodecConfig) -> Self {
        Self {
            out,
            cache: WriteCache::new(),
            serializer: Serializer::new(&codec_mapper()),
            stream_limits: config.stream,
        }
    }

    pub fn with_mapper(out: W, mapper: &Mapper) -> Self {
        Self::new(out).with_serializer(Serializer::new(mapper))
    }

    /// Replace the session used to convert typed objects.
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_stream_limits(mut self, limits: StreamCacheConfig) -> Self {
        self.stream_limits = limits;
        self
    }

    /// Emit the stream-mode marker and switch to the bounded cache.
    ///
    /// Everything cached so far is forgotten. The reader performs the same
    /// switch when it meets the marker.
    #[instrument(skip(self), level = "debug")]
    pub fn set_stream_mode(&mut self) -> Result<()> {
        self.cache.enter_stream_mode(self.stream_limits);
        write_header(&mut self.out, TYPE_EXTRA, XT_STREAM_MODE)?;
        debug!(
            max_entries = self.stream_limits.max_cache_entries,
            max_item_size = self.stream_limits.max_item_size,
            "Writer entered stream mode"
        );
        Ok(())
    }

    /// Serialize `value` through the mapper and encode the result.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        let tree = self.serializer.serialize(value)?;
        self.put(&tree)
    }

    /// Encode each value in turn; each needs its own read on the other side.
    pub fn write_all<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for value in values {
            self.write(value)?;
        }
        Ok(())
    }

    /// Encode an already generic value, bypassing the mapper.
    ///
    /// Typed objects are rejected with [`CodecError::InvalidValue`].
    pub fn write_raw(&mut self, value: &Value) -> Result<()> {
        self.put(value)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn put(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => write_header(&mut self.out, TYPE_CREF, 0)?,
            Value::Bool(b) => {
                write_header(&mut self.out, TYPE_EXTRA, if *b { XT_TTRUE } else { XT_FALSE })?
            }
            Value::Int(v) => self.put_i64(i64::from(*v))?,
            Value::Long(v) => self.put_i64(*v)?,
            Value::BigInt(v) => self.put_big(v)?,
            Value::Double(d) => self.put_double(*d)?,
            Value::Text(text) => self.put_text(text)?,
            Value::Bytes(bytes) => {
                if !self.try_reference(CacheKey::Bin(bytes.clone()), bytes.len())? {
                    write_header(&mut self.out, TYPE_BIN, bytes.len() as u64)?;
                    self.out.write_all(bytes)?;
                }
            }
            Value::Timestamp(time) => self.put_time(time)?,
            Value::List(items) => {
                if !self.try_reference(CacheKey::List(items.clone()), 0)? {
                    write_header(&mut self.out, TYPE_LIST, items.len() as u64)?;
                    for item in items.iter() {
                        self.put(item)?;
                    }
                }
            }
            Value::Dict(binder) => {
                if !self.try_reference(CacheKey::Dict(binder.clone()), 0)? {
                    write_header(&mut self.out, TYPE_DICT, binder.len() as u64)?;
                    for (key, item) in binder.iter() {
                        self.put_text(&Arc::from(key.as_str()))?;
                        self.put(item)?;
                    }
                }
            }
            Value::Object(_) => {
                return Err(CodecError::InvalidValue(
                    constants::ERR_OBJECT_NOT_SERIALIZED.to_string(),
                ))
            }
        }
        Ok(())
    }

    fn put_i64(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            write_header(&mut self.out, TYPE_INT, value as u64)?;
        } else {
            write_header(&mut self.out, TYPE_NINT, value.unsigned_abs())?;
        }
        Ok(())
    }

    fn put_big(&mut self, value: &BigInt) -> Result<()> {
        let code = if value.sign() == Sign::Minus {
            TYPE_NINT
        } else {
            TYPE_INT
        };
        write_header_big(&mut self.out, code, value.magnitude())?;
        Ok(())
    }

    fn put_double(&mut self, value: f64) -> Result<()> {
        // -0.0 compares equal to 0.0 and takes the same one-byte form.
        let code = if value == 0.0 {
            XT_DZERO
        } else if value == 1.0 {
            XT_DONE
        } else if value == -1.0 {
            XT_DMINUSONE
        } else {
            write_header(&mut self.out, TYPE_EXTRA, XT_DOUBLE)?;
            self.out.write_all(&value.to_le_bytes())?;
            return Ok(());
        };
        write_header(&mut self.out, TYPE_EXTRA, code)?;
        Ok(())
    }

    fn put_text(&mut self, text: &Arc<str>) -> Result<()> {
        if !self.try_reference(CacheKey::Text(text.clone()), text.len())? {
            write_header(&mut self.out, TYPE_TEXT, text.len() as u64)?;
            self.out.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    fn put_time(&mut self, time: &DateTime<Utc>) -> Result<()> {
        if time.timestamp_subsec_nanos() != 0 {
            return Err(CodecError::InvalidValue(
                constants::ERR_SUBSECOND_TIMESTAMP.to_string(),
            ));
        }
        let seconds = u64::try_from(time.timestamp()).map_err(|_| {
            CodecError::InvalidValue(constants::ERR_NEGATIVE_TIMESTAMP.to_string())
        })?;
        write_header(&mut self.out, TYPE_EXTRA, XT_TIME)?;
        write_varint(&mut self.out, seconds)?;
        Ok(())
    }

    /// Write a back-reference if `key` is cached; otherwise remember it and
    /// return `false` so the caller writes the value in full.
    fn try_reference(&mut self, key: CacheKey, size: usize) -> Result<bool> {
        if let Some(index) = self.cache.lookup(&key) {
            write_header(&mut self.out, TYPE_CREF, index)?;
            return Ok(true);
        }
        self.cache.insert(key, size);
        Ok(false)
    }
}
