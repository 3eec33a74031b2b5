use crate::error::{CodecError, Result};
use crate::mapper::registry::{AdapterTable, Mapper};
use crate::types::{AnyObject, Binder, Value};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

/// Deserialization session: turns a generic tree back into application values.
///
/// A dictionary carrying a discriminator whose name resolves to an adapter is
/// replaced by the adapter's object; every other value is walked and returned
/// with its children converted. A discriminator naming no adapter leaves the
/// dictionary as it is, unless the session is [strict](Deserializer::strict).
///
/// The session also carries an optional context object that adapters can
/// read while decoding. It is scoped: [`Deserializer::with_context`] and
/// [`Deserializer::push_context`] restore the previous context on every exit
/// path.
pub struct Deserializer {
    table: Arc<AdapterTable>,
    strict: bool,
    context: Option<AnyObject>,
    memo: HashMap<usize, (Value, Value)>,
    depth: usize,
}

impl Deserializer {
    pub fn new(mapper: &Mapper) -> Self {
        Self::from_table(mapper.snapshot())
    }

    pub fn from_table(table: Arc<AdapterTable>) -> Self {
        Self {
            table,
            strict: false,
            context: None,
            memo: HashMap::new(),
            depth: 0,
        }
    }

    /// Fail with [`CodecError::UnknownDiscriminator`] instead of keeping the plain map.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn adapters(&self) -> &Arc<AdapterTable> {
        &self.table
    }

    pub fn deserialize(&mut self, value: &Value) -> Result<Value> {
        self.depth += 1;
        let result = self.convert(value);
        self.finish();
        result.map(|(converted, _)| converted)
    }

    /// Convert every value of `binder` in place. The binder itself is never
    /// replaced, even if it carries a discriminator.
    pub fn deserialize_in_place(&mut self, binder: &mut Binder) -> Result<()> {
        self.depth += 1;
        let result = self.convert_fields(binder);
        self.finish();
        result
    }

    /// Deserialize `value` and downcast the result to `T`.
    pub fn deserialize_as<T: Any + Send + Sync>(&mut self, value: &Value) -> Result<Arc<T>> {
        let decoded = self.deserialize(value)?;
        match decoded {
            Value::Object(object) => object.downcast::<T>().map_err(|_| {
                CodecError::InvalidValue(format!("decoded object is not a {}", type_name::<T>()))
            }),
            other => Err(CodecError::InvalidValue(format!(
                "expected a {} object, got {}",
                type_name::<T>(),
                other.kind()
            ))),
        }
    }

    /// Run `scope` with `context` installed, restoring the previous context afterwards.
    pub fn with_context<C, R, F>(&mut self, context: C, scope: F) -> Result<R>
    where
        C: Any + Send + Sync,
        F: FnOnce(&mut Deserializer) -> Result<R>,
    {
        let mut guard = self.push_context(Arc::new(context));
        scope(&mut guard)
    }

    /// Install a shared context until the returned guard is dropped.
    pub fn push_context(&mut self, context: AnyObject) -> ContextGuard<'_> {
        let previous = self.context.replace(context);
        ContextGuard {
            deserializer: self,
            previous,
        }
    }

    pub fn context(&self) -> Option<&AnyObject> {
        self.context.as_ref()
    }

    /// Current context downcast to `T`, if set and of that type.
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_ref()?.downcast_ref::<T>()
    }

    pub fn context_or_fail<T: Any>(&self) -> Result<&T> {
        let context = self.context.as_ref().ok_or(CodecError::MissingContext)?;
        context.downcast_ref::<T>().ok_or_else(|| {
            CodecError::InvalidValue(format!("context is not a {}", type_name::<T>()))
        })
    }

    fn finish(&mut self) {
        self.depth -= 1;
        if self.depth == 0 {
            self.memo.clear();
        }
    }

    fn convert(&mut self, value: &Value) -> Result<(Value, bool)> {
        match value {
            Value::List(items) => self.convert_list(items),
            Value::Dict(binder) => self.convert_dict(binder),
            _ => Ok((value.clone(), false)),
        }
    }

    fn convert_fields(&mut self, binder: &mut Binder) -> Result<()> {
        for (_, field) in binder.iter_mut() {
            let (converted, changed) = self.convert(field)?;
            if changed {
                *field = converted;
            }
        }
        Ok(())
    }

    fn convert_list(&mut self, items: &Arc<Vec<Value>>) -> Result<(Value, bool)> {
        let key = Arc::as_ptr(items) as usize;
        if let Some((_, converted)) = self.memo.get(&key) {
            return Ok((converted.clone(), true));
        }

        let mut out = Vec::with_capacity(items.len());
        let mut changed = false;
        for item in items.iter() {
            let (converted, c) = self.convert(item)?;
            changed |= c;
            out.push(converted);
        }
        if !changed {
            return Ok((Value::List(items.clone()), false));
        }

        let converted = Value::List(Arc::new(out));
        self.memo
            .insert(key, (Value::List(items.clone()), converted.clone()));
        Ok((converted, true))
    }

    fn convert_dict(&mut self, binder: &Arc<Binder>) -> Result<(Value, bool)> {
        let key = Arc::as_ptr(binder) as usize;
        if let Some((_, converted)) = self.memo.get(&key) {
            return Ok((converted.clone(), true));
        }

        if let Some(name) = binder.type_name() {
            match self.table.by_name(name).cloned() {
                Some(adapter) => {
                    let object = adapter.decode(binder, self)?;
                    let converted = object_value(object);
                    self.memo
                        .insert(key, (Value::Dict(binder.clone()), converted.clone()));
                    return Ok((converted, true));
                }
                None if self.strict => {
                    return Err(CodecError::UnknownDiscriminator(name.to_string()));
                }
                None => debug!(type_name = name, "Unknown discriminator, keeping plain map"),
            }
        }

        let mut out = Binder::clone(binder);
        let mut changed = false;
        for (_, field) in out.iter_mut() {
            let (converted, c) = self.convert(field)?;
            if c {
                *field = converted;
                changed = true;
            }
        }
        if !changed {
            return Ok((Value::Dict(binder.clone()), false));
        }

        let converted = Value::dict(out);
        self.memo
            .insert(key, (Value::Dict(binder.clone()), converted.clone()));
        Ok((converted, true))
    }
}

/// Decoded timestamps and binaries come back as their native variants.
fn object_value(object: AnyObject) -> Value {
    if let Some(time) = object.downcast_ref::<DateTime<Utc>>() {
        return Value::Timestamp(*time);
    }
    if let Some(bytes) = object.downcast_ref::<Bytes>() {
        return Value::Bytes(bytes.clone());
    }
    Value::Object(object)
}

/// Restores the previous deserialization context when dropped.
pub struct ContextGuard<'a> {
    deserializer: &'a mut Deserializer,
    previous: Option<AnyObject>,
}

impl Deref for ContextGuard<'_> {
    type Target = Deserializer;

    fn deref(&self) -> &Deserializer {
        self.deserializer
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Deserializer {
        self.deserializer
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.deserializer.context = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::adapter::FnAdapter;
    use crate::mapper::serializer::Serializer;
    use crate::types::{SHORT_TYPE_KEY, TYPE_KEY};

    #[derive(Debug, PartialEq)]
    struct Tag(String);

    struct Prefix(&'static str);

    fn mapper() -> Mapper {
        let mapper = Mapper::new();
        mapper
            .register(FnAdapter::new(
                "tag",
                |t: &Tag, _: &mut Serializer| Ok(Binder::of([("name", t.0.as_str())])),
                |b: &Binder, d: &mut Deserializer| {
                    let name = b.get_str_or_err("name")?;
                    match d.context_as::<Prefix>() {
                        Some(prefix) => Ok(Tag(format!("{}{}", prefix.0, name))),
                        None => Ok(Tag(name.to_string())),
                    }
                },
            ))
            .unwrap();
        mapper
    }

    fn tagged(key: &str, name: &str) -> Value {
        Value::dict(Binder::new().with(key, "tag").with("name", name))
    }

    #[test]
    fn test_discriminated_map_becomes_object() {
        let mut d = Deserializer::new(&mapper());
        let out = d.deserialize(&tagged(TYPE_KEY, "a")).unwrap();
        assert_eq!(out.downcast_ref::<Tag>(), Some(&Tag("a".into())));
    }

    #[test]
    fn test_short_discriminator_is_accepted() {
        let mut d = Deserializer::new(&mapper());
        let out = d.deserialize(&tagged(SHORT_TYPE_KEY, "b")).unwrap();
        assert_eq!(out.downcast_ref::<Tag>(), Some(&Tag("b".into())));
    }

    #[test]
    fn test_unknown_discriminator_degrades() {
        let mut d = Deserializer::new(&mapper());
        let map = Value::dict(Binder::new().with(TYPE_KEY, "nope").with("x", 1));
        let out = d.deserialize(&map).unwrap();
        assert!(out.ptr_eq(&map));
    }

    #[test]
    fn test_unknown_discriminator_fails_when_strict() {
        let mut d = Deserializer::new(&mapper()).strict(true);
        let map = Value::dict(Binder::new().with(TYPE_KEY, "nope"));
        assert!(matches!(
            d.deserialize(&map),
            Err(CodecError::UnknownDiscriminator(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_nested_objects_are_converted() {
        let mut d = Deserializer::new(&mapper());
        let tree = Value::list([Value::from(1), tagged(TYPE_KEY, "c")]);
        let out = d.deserialize(&tree).unwrap();
        let items = out.as_list().unwrap();
        assert_eq!(items[0], Value::from(1));
        assert_eq!(items[1].downcast_ref::<Tag>(), Some(&Tag("c".into())));
    }

    #[test]
    fn test_in_place_keeps_outer_map() {
        let mut d = Deserializer::new(&mapper());
        let mut binder = Binder::new().with(TYPE_KEY, "tag").with("inner", tagged(TYPE_KEY, "d"));
        d.deserialize_in_place(&mut binder).unwrap();
        assert_eq!(binder.type_name(), Some("tag"));
        assert_eq!(
            binder.get("inner").and_then(|v| v.downcast_ref::<Tag>()),
            Some(&Tag("d".into()))
        );
    }

    #[test]
    fn test_context_is_visible_to_adapters() {
        let mut d = Deserializer::new(&mapper());
        let out = d
            .with_context(Prefix("ctx-"), |d| d.deserialize(&tagged(TYPE_KEY, "e")))
            .unwrap();
        assert_eq!(out.downcast_ref::<Tag>(), Some(&Tag("ctx-e".into())));
        assert!(d.context().is_none());
    }

    #[test]
    fn test_context_restored_after_error() {
        let mut d = Deserializer::new(&mapper());
        let outer: AnyObject = Arc::new(Prefix("outer"));
        let mut guard = d.push_context(outer);
        let result: Result<()> = guard.with_context(Prefix("inner"), |d| {
            assert_eq!(d.context_as::<Prefix>().map(|p| p.0), Some("inner"));
            Err(CodecError::MissingField("x".into()))
        });
        assert!(result.is_err());
        assert_eq!(guard.context_as::<Prefix>().map(|p| p.0), Some("outer"));
        drop(guard);
        assert!(d.context().is_none());
    }

    #[test]
    fn test_context_or_fail() {
        let mut d = Deserializer::new(&mapper());
        assert!(matches!(
            d.context_or_fail::<Prefix>(),
            Err(CodecError::MissingContext)
        ));
        let guard = d.push_context(Arc::new(5u32));
        assert!(matches!(
            guard.context_or_fail::<Prefix>(),
            Err(CodecError::InvalidValue(_))
        ));
        assert_eq!(guard.context_or_fail::<u32>().unwrap(), &5);
    }

    #[test]
    fn test_deserialize_as() {
        let mut d = Deserializer::new(&mapper());
        let tag = d.deserialize_as::<Tag>(&tagged(TYPE_KEY, "f")).unwrap();
        assert_eq!(*tag, Tag("f".into()));
        assert!(d.deserialize_as::<Tag>(&Value::from(1)).is_err());
    }
}
