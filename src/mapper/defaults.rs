//! Process-wide mappers.
//!
//! [`default_mapper`] holds the adapters for the built-in value kinds that a
//! plain map representation needs: timestamps as `{"__type": "unixtime",
//! "seconds": n}` and binaries as `{"__type": "binary", "base64": "..."}`.
//! [`codec_mapper`] is derived from it with both removed, because the binary
//! codec carries timestamps and binaries natively.

use crate::error::{constants, CodecError, Result};
use crate::mapper::adapter::{Adapter, FnAdapter, TypedAdapter};
use crate::mapper::deserializer::Deserializer;
use crate::mapper::registry::Mapper;
use crate::mapper::serializer::Serializer;
use crate::types::Binder;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::any::TypeId;
use std::sync::{Arc, OnceLock};

pub const UNIXTIME_TYPE: &str = "unixtime";
pub const BINARY_TYPE: &str = "binary";

static DEFAULT_MAPPER: OnceLock<Arc<Mapper>> = OnceLock::new();
static CODEC_MAPPER: OnceLock<Arc<Mapper>> = OnceLock::new();

fn unixtime_adapter() -> Arc<dyn Adapter> {
    Arc::new(TypedAdapter::new(FnAdapter::new(
        UNIXTIME_TYPE,
        |time: &DateTime<Utc>, _: &mut Serializer| {
            if time.timestamp_subsec_nanos() != 0 {
                return Err(CodecError::InvalidValue(
                    constants::ERR_SUBSECOND_TIMESTAMP.to_string(),
                ));
            }
            Ok(Binder::of([("seconds", time.timestamp())]))
        },
        |binder: &Binder, _: &mut Deserializer| {
            let seconds = binder.get_i64_or_err("seconds")?;
            DateTime::from_timestamp(seconds, 0).ok_or_else(|| CodecError::InvalidField {
                field: "seconds".to_string(),
                expected: "a representable unix time",
            })
        },
    )))
}

fn binary_adapter() -> Arc<dyn Adapter> {
    Arc::new(TypedAdapter::new(FnAdapter::new(
        BINARY_TYPE,
        |bytes: &Bytes, _: &mut Serializer| Ok(Binder::of([("base64", STANDARD.encode(bytes))])),
        |binder: &Binder, _: &mut Deserializer| -> Result<Bytes> {
            let text = binder.get_str_or_err("base64")?;
            let raw = STANDARD.decode(text).map_err(|_| CodecError::InvalidField {
                field: "base64".to_string(),
                expected: "base64 text",
            })?;
            Ok(Bytes::from(raw))
        },
    )))
}

/// Root mapper shared by the whole process.
pub fn default_mapper() -> Arc<Mapper> {
    DEFAULT_MAPPER
        .get_or_init(|| Arc::new(Mapper::with_adapters([unixtime_adapter(), binary_adapter()])))
        .clone()
}

/// Mapper used by [`Writer`](crate::Writer) and [`Reader`](crate::Reader) by default.
///
/// Adapters registered on [`default_mapper`] become visible here too.
pub fn codec_mapper() -> Arc<Mapper> {
    CODEC_MAPPER
        .get_or_init(|| {
            Arc::new(Mapper::derive(
                &default_mapper(),
                [TypeId::of::<DateTime<Utc>>(), TypeId::of::<Bytes>()],
            ))
        })
        .clone()
}
