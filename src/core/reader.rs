//! BOSS decoder.

use crate::config::{CodecConfig, LimitsConfig, StreamCacheConfig};
use crate::core::cache::{CacheStats, ReadCache};
use crate::core::header::{
    read_exact, read_header_opt, read_varint, Header, HeaderValue, TYPE_BIN, TYPE_CREF,
    TYPE_DICT, TYPE_EXTRA, TYPE_INT, TYPE_LIST, TYPE_NINT, TYPE_TEXT, XT_DMINUSONE, XT_DONE,
    XT_DOUBLE, XT_DZERO, XT_FALSE, XT_STREAM_MODE, XT_TIME, XT_TTRUE,
};
use crate::error::{constants, CodecError, Result};
use crate::mapper::{codec_mapper, Deserializer, Mapper};
use crate::types::{Binder, Value};
use bytes::Bytes;
use chrono::DateTime;
use num_bigint::{BigInt, Sign};
use std::any::Any;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, trace};

/// Reads BOSS-encoded values from an input, one value per call.
///
/// Reads block until the input yields enough bytes. Any structural error is
/// fatal for the session: the cache may no longer match the writer's, so the
/// reader should be dropped.
pub struct Reader<R: Read> {
    input: R,
    cache: ReadCache,
    deserializer: Deserializer,
    stream_limits: StreamCacheConfig,
    limits: LimitsConfig,
    depth: usize,
}

impl<R: Read> Reader<R> {
    /// Reader over `input` using the codec mapper and default limits.
    pub fn new(input: R) -> Self {
        Self::with_config(input, &CodecConfig::default())
    }

    pub fn with_config(input: R, config: &CodecConfig) -> Self {
        Self {
            input,
            cache: ReadCache::new(),
            deserializer: Deserializer::new(&codec_mapper()),
            stream_limits: config.stream,
            limits: config.limits,
            depth: 0,
        }
    }

    pub fn with_mapper(input: R, mapper: &Mapper) -> Self {
        Self::new(input).with_deserializer(Deserializer::new(mapper))
    }

    /// Replace the session used to turn decoded maps into typed objects.
    pub fn with_deserializer(mut self, deserializer: Deserializer) -> Self {
        self.deserializer = deserializer;
        self
    }

    pub fn with_stream_limits(mut self, limits: StreamCacheConfig) -> Self {
        self.stream_limits = limits;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Session used to decode typed objects; install a context on it here.
    pub fn deserializer_mut(&mut self) -> &mut Deserializer {
        &mut self.deserializer
    }

    /// Decode the next value and pass containers through the deserializer.
    ///
    /// End of input is a [`CodecError::MalformedStream`]; use
    /// [`Reader::try_read`] to detect a clean end between values.
    pub fn read(&mut self) -> Result<Value> {
        let raw = self.read_raw()?;
        self.deserialize(raw)
    }

    /// Like [`Reader::read`], but `None` on a clean end of input.
    pub fn try_read(&mut self) -> Result<Option<Value>> {
        match self.get_opt()? {
            Some(raw) => self.deserialize(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Decode the next value without consulting the deserializer.
    pub fn read_raw(&mut self) -> Result<Value> {
        self.get()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.read_raw()?;
        value.as_i64().ok_or_else(|| unexpected("integer in i64 range", &value))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let value = self.read_raw()?;
        value.as_f64().ok_or_else(|| unexpected("number", &value))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let value = self.read_raw()?;
        value.as_bool().ok_or_else(|| unexpected("boolean", &value))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let value = self.read_raw()?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("text", &value))
    }

    pub fn read_bytes(&mut self) -> Result<Bytes> {
        let value = self.read_raw()?;
        value.as_bytes().cloned().ok_or_else(|| unexpected("binary", &value))
    }

    pub fn read_list(&mut self) -> Result<Arc<Vec<Value>>> {
        match self.read()? {
            Value::List(items) => Ok(items),
            other => Err(unexpected("list", &other)),
        }
    }

    /// Read a dictionary without converting it to a typed object.
    pub fn read_binder(&mut self) -> Result<Arc<Binder>> {
        match self.read_raw()? {
            Value::Dict(binder) => {
                let mut binder = Binder::clone(&binder);
                self.deserializer.deserialize_in_place(&mut binder)?;
                Ok(Arc::new(binder))
            }
            other => Err(unexpected("dictionary", &other)),
        }
    }

    /// Read the next value as a typed object produced by an adapter.
    pub fn read_object<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
        let raw = self.read_raw()?;
        self.deserializer.deserialize_as::<T>(&raw)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn get_ref(&self) -> &R {
        &self.input
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    fn deserialize(&mut self, raw: Value) -> Result<Value> {
        match raw {
            Value::List(_) | Value::Dict(_) => self.deserializer.deserialize(&raw),
            other => Ok(other),
        }
    }

    fn get(&mut self) -> Result<Value> {
        self.get_opt()?.ok_or_else(|| {
            CodecError::MalformedStream(constants::ERR_EOF_IN_HEADER.to_string())
        })
    }

    fn get_opt(&mut self) -> Result<Option<Value>> {
        loop {
            let Some(header) = read_header_opt(&mut self.input, self.limits.max_payload_size)?
            else {
                return Ok(None);
            };
            if header.code == TYPE_EXTRA && header.value == HeaderValue::Small(XT_STREAM_MODE) {
                if self.depth > 0 {
                    return Err(CodecError::MalformedStream(
                        constants::ERR_NESTED_STREAM_MODE.to_string(),
                    ));
                }
                self.cache.enter_stream_mode(self.stream_limits);
                debug!(
                    max_entries = self.stream_limits.max_cache_entries,
                    max_item_size = self.stream_limits.max_item_size,
                    "Reader entered stream mode"
                );
                continue;
            }
            return self.decode(header).map(Some);
        }
    }

    fn decode(&mut self, header: Header) -> Result<Value> {
        match header.code {
            TYPE_INT => Ok(integer_value(header.value, false)),
            TYPE_NINT => Ok(integer_value(header.value, true)),
            TYPE_TEXT => {
                let length = self.declared_length(&header)?;
                let raw = self.read_payload(length)?;
                let text = String::from_utf8(raw).map_err(|_| {
                    CodecError::MalformedStream(constants::ERR_INVALID_UTF8.to_string())
                })?;
                let value = Value::text(text);
                self.cache.push_scalar(&value, length);
                Ok(value)
            }
            TYPE_BIN => {
                let length = self.declared_length(&header)?;
                let value = Value::Bytes(Bytes::from(self.read_payload(length)?));
                self.cache.push_scalar(&value, length);
                Ok(value)
            }
            TYPE_CREF => {
                let index = match header.value {
                    HeaderValue::Small(index) => index,
                    HeaderValue::Big(index) => u64::try_from(&index).map_err(|_| {
                        CodecError::InvalidCacheReference {
                            index: u64::MAX,
                            available: self.cache.len(),
                        }
                    })?,
                };
                if index == 0 {
                    return Ok(Value::Null);
                }
                let value = self.cache.get(index)?;
                trace!(index, kind = value.kind(), "Resolved back-reference");
                Ok(value)
            }
            TYPE_LIST => {
                let count = self.declared_length(&header)?;
                self.nested(|reader| reader.read_list_items(count))
            }
            TYPE_DICT => {
                let count = self.declared_length(&header)?;
                self.nested(|reader| reader.read_dict_entries(count))
            }
            TYPE_EXTRA => self.decode_extra(header.length()?),
            code => Err(CodecError::MalformedStream(format!(
                "Unknown type code: {code}"
            ))),
        }
    }

    fn decode_extra(&mut self, code: u64) -> Result<Value> {
        match code {
            XT_DZERO => Ok(Value::Double(0.0)),
            XT_DONE => Ok(Value::Double(1.0)),
            XT_DMINUSONE => Ok(Value::Double(-1.0)),
            XT_DOUBLE => {
                let mut raw = [0u8; 8];
                read_exact(&mut self.input, &mut raw)?;
                Ok(Value::Double(f64::from_le_bytes(raw)))
            }
            XT_TTRUE => Ok(Value::Bool(true)),
            XT_FALSE => Ok(Value::Bool(false)),
            XT_TIME => {
                let seconds = read_varint(&mut self.input)?;
                i64::try_from(seconds)
                    .ok()
                    .and_then(|s| DateTime::from_timestamp(s, 0))
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        CodecError::MalformedStream(format!("Timestamp out of range: {seconds}"))
                    })
            }
            XT_STREAM_MODE => Err(CodecError::MalformedStream(
                constants::ERR_NESTED_STREAM_MODE.to_string(),
            )),
            other => Err(CodecError::UnknownExtraCode(other)),
        }
    }

    fn read_list_items(&mut self, count: usize) -> Result<Value> {
        let slot = self.cache.reserve_container();
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(self.get()?);
        }
        let value = Value::List(Arc::new(items));
        if let Some(slot) = slot {
            self.cache.fill(slot, &value);
        }
        Ok(value)
    }

    fn read_dict_entries(&mut self, count: usize) -> Result<Value> {
        let slot = self.cache.reserve_container();
        let mut binder = Binder::with_capacity(count.min(4096));
        for _ in 0..count {
            let key = match self.get()? {
                Value::Text(key) => key,
                other => {
                    return Err(CodecError::MalformedStream(format!(
                        "{} (got {})",
                        constants::ERR_NON_TEXT_KEY,
                        other.kind()
                    )))
                }
            };
            let value = self.get()?;
            binder.insert(&*key, value);
        }
        let value = Value::dict(binder);
        if let Some(slot) = slot {
            self.cache.fill(slot, &value);
        }
        Ok(value)
    }

    fn nested<F>(&mut self, body: F) -> Result<Value>
    where
        F: FnOnce(&mut Self) -> Result<Value>,
    {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::MalformedStream(format!(
                "Nesting deeper than {} levels",
                self.limits.max_depth
            )));
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    fn declared_length(&self, header: &Header) -> Result<usize> {
        let length = header.length()?;
        match usize::try_from(length) {
            Ok(length) if length <= self.limits.max_payload_size => Ok(length),
            _ => Err(CodecError::MalformedStream(format!(
                "Declared length {length} exceeds limit {}",
                self.limits.max_payload_size
            ))),
        }
    }

    fn read_payload(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; length];
        read_exact(&mut self.input, &mut raw)?;
        Ok(raw)
    }
}

/// Integers decode to the narrowest of `Int`, `Long` and `BigInt`.
fn integer_value(value: HeaderValue, negative: bool) -> Value {
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    match value {
        HeaderValue::Small(v) if !negative => match i64::try_from(v) {
            Ok(v) => Value::integer(v),
            Err(_) => Value::BigInt(BigInt::from(v)),
        },
        HeaderValue::Small(v) => match 0i64.checked_sub_unsigned(v) {
            Some(v) => Value::integer(v),
            None => Value::BigInt(BigInt::from_biguint(sign, v.into())),
        },
        HeaderValue::Big(v) => Value::big(BigInt::from_biguint(sign, v)),
    }
}

fn unexpected(expected: &str, got: &Value) -> CodecError {
    CodecError::InvalidValue(format!("expected {expected}, got {}", got.kind()))
}
