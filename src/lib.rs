//! # BOSS Codec
//!
//! A compact, self-describing binary object codec with a pluggable adapter
//! registry.
//!
//! ## Overview
//! - **Generic values**: [`Value`] covers null, booleans, integers of any
//!   width, doubles, text, binaries, timestamps, lists and string-keyed
//!   dictionaries ([`Binder`]).
//! - **Typed objects**: a [`Mapper`] holds [`Adapter`]s that turn application
//!   types into binders stamped with a stable type name, and back.
//! - **Binary codec**: [`Writer`] and [`Reader`] encode and decode the BOSS
//!   wire format, writing repeated strings, binaries and containers as
//!   back-references. Stream mode bounds the cache for long-lived connections.
//!
//! ## Example
//! ```rust
//! use boss_codec::{dump, load, Binder, Value};
//!
//! let greeting = Value::from("hello");
//! let message = Value::dict(
//!     Binder::new()
//!         .with("id", 42)
//!         .with("tags", Value::list([greeting.clone(), greeting])),
//! );
//!
//! let bytes = dump(&message)?;
//! let decoded = load(&bytes)?;
//! assert_eq!(decoded, message);
//! # Ok::<(), boss_codec::CodecError>(())
//! ```
//!
//! ## Concurrency
//! A [`Mapper`] is shared freely between threads: lookups read an atomic
//! snapshot and never wait on registrations. Writers, readers and
//! serialization sessions are single-threaded state; create one per stream.

pub mod config;
pub mod core;
pub mod error;
pub mod mapper;
pub mod types;
pub mod utils;

pub use crate::config::CodecConfig;
pub use crate::core::{dump, dump_all, dump_with, load, load_all, load_with, Reader, Writer};
pub use crate::error::{CodecError, Result};
pub use crate::mapper::{
    codec_mapper, default_mapper, Adapter, BiAdapter, BiSerializable, Deserializer, FnAdapter,
    Mapper, Serializer,
};
pub use crate::types::{AnyObject, Binder, Value};
