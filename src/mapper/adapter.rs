//! Adapters bridge one application type to and from a [`Binder`].
//!
//! Every adapter carries a mandatory, stable type name that is written
//! verbatim as the discriminator. Construction on decode is the adapter's own
//! logic: there is no reflective instantiation.

use crate::error::{CodecError, Result};
use crate::mapper::deserializer::Deserializer;
use crate::mapper::serializer::Serializer;
use crate::types::{AnyObject, Binder};
use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased adapter as stored in the registry.
pub trait Adapter: Send + Sync + 'static {
    /// Stable discriminator written to the wire.
    fn type_name(&self) -> &str;

    /// Runtime type this adapter encodes.
    fn target_type(&self) -> TypeId;

    /// Rust type name of the target, for diagnostics only.
    fn target_type_name(&self) -> &'static str;

    fn encode(&self, object: &dyn Any, serializer: &mut Serializer) -> Result<Binder>;

    fn decode(&self, binder: &Binder, deserializer: &mut Deserializer) -> Result<AnyObject>;
}

/// Typed adapter for `T`, registered with [`Mapper::register`](crate::Mapper::register).
///
/// ```rust
/// use boss_codec::{BiAdapter, Binder, Deserializer, Mapper, Result, Serializer, Value};
///
/// struct Point { x: i64, y: i64 }
/// struct PointAdapter;
///
/// impl BiAdapter<Point> for PointAdapter {
///     fn type_name(&self) -> &str { "point" }
///
///     fn encode(&self, p: &Point, _: &mut Serializer) -> Result<Binder> {
///         Ok(Binder::of([("x", p.x), ("y", p.y)]))
///     }
///
///     fn decode(&self, b: &Binder, _: &mut Deserializer) -> Result<Point> {
///         Ok(Point { x: b.get_i64_or_err("x")?, y: b.get_i64_or_err("y")? })
///     }
/// }
///
/// let mapper = Mapper::new();
/// mapper.register(PointAdapter).unwrap();
/// let encoded = mapper.serialize(&Value::object(Point { x: 1, y: 2 })).unwrap();
/// assert_eq!(encoded.as_binder().unwrap().type_name(), Some("point"));
/// ```
pub trait BiAdapter<T: Any + Send + Sync>: Send + Sync + 'static {
    fn type_name(&self) -> &str;

    fn encode(&self, object: &T, serializer: &mut Serializer) -> Result<Binder>;

    fn decode(&self, binder: &Binder, deserializer: &mut Deserializer) -> Result<T>;
}

/// Types that know how to turn themselves into a [`Binder`] and back.
pub trait BiSerializable: Any + Send + Sync + Sized {
    /// Stable discriminator written to the wire.
    const TYPE_NAME: &'static str;

    fn to_binder(&self, serializer: &mut Serializer) -> Result<Binder>;

    fn from_binder(binder: &Binder, deserializer: &mut Deserializer) -> Result<Self>;
}

/// Erases a [`BiAdapter<T>`] into an [`Adapter`], wrapping its errors with the adapter name.
pub struct TypedAdapter<T, A> {
    inner: A,
    _target: PhantomData<fn() -> T>,
}

impl<T, A> TypedAdapter<T, A>
where
    T: Any + Send + Sync,
    A: BiAdapter<T>,
{
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            _target: PhantomData,
        }
    }
}

impl<T, A> Adapter for TypedAdapter<T, A>
where
    T: Any + Send + Sync,
    A: BiAdapter<T>,
{
    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn target_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn encode(&self, object: &dyn Any, serializer: &mut Serializer) -> Result<Binder> {
        let typed = object.downcast_ref::<T>().ok_or_else(|| {
            CodecError::InvalidValue(format!(
                "adapter '{}' expects {}",
                self.type_name(),
                type_name::<T>()
            ))
        })?;
        self.inner
            .encode(typed, serializer)
            .map_err(|e| CodecError::adapter_failure(self.type_name(), e))
    }

    fn decode(&self, binder: &Binder, deserializer: &mut Deserializer) -> Result<AnyObject> {
        let object = self
            .inner
            .decode(binder, deserializer)
            .map_err(|e| CodecError::adapter_failure(self.type_name(), e))?;
        Ok(Arc::new(object))
    }
}

/// [`BiAdapter`] for a [`BiSerializable`] type.
pub struct SerializableAdapter<T>(PhantomData<fn() -> T>);

impl<T> SerializableAdapter<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SerializableAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BiSerializable> BiAdapter<T> for SerializableAdapter<T> {
    fn type_name(&self) -> &str {
        T::TYPE_NAME
    }

    fn encode(&self, object: &T, serializer: &mut Serializer) -> Result<Binder> {
        object.to_binder(serializer)
    }

    fn decode(&self, binder: &Binder, deserializer: &mut Deserializer) -> Result<T> {
        T::from_binder(binder, deserializer)
    }
}

type EncodeFn<T> = dyn Fn(&T, &mut Serializer) -> Result<Binder> + Send + Sync;
type DecodeFn<T> = dyn Fn(&Binder, &mut Deserializer) -> Result<T> + Send + Sync;

/// [`BiAdapter`] built from a name and a pair of closures.
pub struct FnAdapter<T> {
    name: String,
    encode: Box<EncodeFn<T>>,
    decode: Box<DecodeFn<T>>,
}

impl<T: Any + Send + Sync> FnAdapter<T> {
    pub fn new<E, D>(name: impl Into<String>, encode: E, decode: D) -> Self
    where
        E: Fn(&T, &mut Serializer) -> Result<Binder> + Send + Sync + 'static,
        D: Fn(&Binder, &mut Deserializer) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T: Any + Send + Sync> BiAdapter<T> for FnAdapter<T> {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn encode(&self, object: &T, serializer: &mut Serializer) -> Result<Binder> {
        (self.encode)(object, serializer)
    }

    fn decode(&self, binder: &Binder, deserializer: &mut Deserializer) -> Result<T> {
        (self.decode)(binder, deserializer)
    }
}
