//! Adapter registry and the serialization sessions built on it.
//!
//! A [`Mapper`] maps application types to [`Adapter`]s and back by a stable
//! type name. [`Serializer`] and [`Deserializer`] are short-lived sessions
//! that take a snapshot of the mapper and convert between typed objects and
//! the generic [`Value`](crate::Value) tree, in which an object is a
//! [`Binder`](crate::Binder) stamped with its adapter's type name under
//! `"__type"`.
//!
//! ```rust
//! use boss_codec::{Binder, FnAdapter, Mapper, Value};
//!
//! #[derive(Debug, PartialEq)]
//! struct Celsius(f64);
//!
//! let mapper = Mapper::new();
//! mapper
//!     .register(FnAdapter::new(
//!         "celsius",
//!         |c: &Celsius, _| Ok(Binder::of([("deg", c.0)])),
//!         |b: &Binder, _| Ok(Celsius(b.get_f64_or_err("deg")?)),
//!     ))
//!     .unwrap();
//!
//! let tree = mapper.serialize(&Value::object(Celsius(21.5))).unwrap();
//! let back = mapper.deserialize(&tree).unwrap();
//! assert_eq!(back.downcast_ref::<Celsius>(), Some(&Celsius(21.5)));
//! ```

pub mod adapter;
pub mod defaults;
pub mod deserializer;
pub mod registry;
pub mod serializer;

pub use adapter::{Adapter, BiAdapter, BiSerializable, FnAdapter, SerializableAdapter, TypedAdapter};
pub use defaults::{codec_mapper, default_mapper, BINARY_TYPE, UNIXTIME_TYPE};
pub use deserializer::{ContextGuard, Deserializer};
pub use registry::{AdapterTable, Mapper};
pub use serializer::Serializer;
