use crate::error::{CodecError, Result};
use crate::mapper::adapter::Adapter;
use crate::mapper::registry::{AdapterTable, Mapper};
use crate::types::{Binder, Value};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Serialization session: turns application values into the generic tree.
///
/// - primitives pass through unchanged;
/// - lists and dictionaries are walked element-wise, and are only copied if
///   something inside them changed;
/// - [`Value::Object`] goes through the adapter registered for its runtime
///   type, and the resulting binder is stamped with the adapter's name;
/// - binary and timestamp values go through an adapter only if the mapper
///   registers one for [`Bytes`] / [`DateTime<Utc>`].
///
/// A container shared within one call is converted once, so sharing survives
/// into the output tree.
pub struct Serializer {
    table: Arc<AdapterTable>,
    /// Source container address to (source, converted); the source is kept
    /// alive so its address cannot be reused mid-call.
    memo: HashMap<usize, (Value, Value)>,
    depth: usize,
}

impl Serializer {
    pub fn new(mapper: &Mapper) -> Self {
        Self::from_table(mapper.snapshot())
    }

    pub fn from_table(table: Arc<AdapterTable>) -> Self {
        Self {
            table,
            memo: HashMap::new(),
            depth: 0,
        }
    }

    pub fn adapters(&self) -> &Arc<AdapterTable> {
        &self.table
    }

    pub fn serialize(&mut self, value: &Value) -> Result<Value> {
        self.depth += 1;
        let result = self.convert(value);
        self.depth -= 1;
        if self.depth == 0 {
            self.memo.clear();
        }
        result.map(|(converted, _)| converted)
    }

    /// Serialize a typed object directly, without wrapping it in a [`Value`] first.
    pub fn serialize_object<T: Any + Send + Sync>(&mut self, object: &T) -> Result<Value> {
        let adapter = self.adapter_for(TypeId::of::<T>(), std::any::type_name::<T>())?;
        self.depth += 1;
        let result = self.encode_with(&adapter, object);
        self.depth -= 1;
        if self.depth == 0 {
            self.memo.clear();
        }
        result
    }

    fn adapter_for(&self, id: TypeId, name: &str) -> Result<Arc<dyn Adapter>> {
        self.table
            .by_type(id)
            .cloned()
            .ok_or_else(|| CodecError::UnresolvedAdapter(name.to_string()))
    }

    fn convert(&mut self, value: &Value) -> Result<(Value, bool)> {
        match value {
            Value::Object(object) => {
                let id = (**object).type_id();
                let adapter = self.adapter_for(id, "object of an unregistered type")?;
                Ok((self.encode_with(&adapter, &**object)?, true))
            }
            Value::Timestamp(time) => self.convert_builtin::<DateTime<Utc>>(value, time),
            Value::Bytes(bytes) => self.convert_builtin::<Bytes>(value, bytes),
            Value::List(items) => self.convert_list(items),
            Value::Dict(binder) => self.convert_dict(binder),
            _ => Ok((value.clone(), false)),
        }
    }

    fn convert_builtin<T: Any>(&mut self, value: &Value, inner: &T) -> Result<(Value, bool)> {
        match self.table.by_type(TypeId::of::<T>()).cloned() {
            Some(adapter) => Ok((self.encode_with(&adapter, inner)?, true)),
            None => Ok((value.clone(), false)),
        }
    }

    fn encode_with(&mut self, adapter: &Arc<dyn Adapter>, object: &dyn Any) -> Result<Value> {
        // Nested values are the adapter's own business: it serializes them
        // through this session, and its decode sees the fields as written.
        let mut binder = adapter.encode(object, self)?;
        binder.set_type_name(adapter.type_name());
        Ok(Value::dict(binder))
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

        let mut out = Binder::with_capacity(binder.len());
        let mut changed = false;
        for (name, item) in binder.iter() {
            let (converted, c) = self.convert(item)?;
            changed |= c;
            out.insert(name.clone(), converted);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::adapter::FnAdapter;
    use crate::mapper::deserializer::Deserializer;
    use crate::types::TYPE_KEY;

    #[derive(Debug, PartialEq)]
    struct Tag(String);

    fn mapper() -> Mapper {
        let mapper = Mapper::new();
        mapper
            .register(FnAdapter::new(
                "tag",
                |t: &Tag, _: &mut Serializer| Ok(Binder::of([("name", t.0.as_str())])),
                |b: &Binder, _: &mut Deserializer| Ok(Tag(b.get_str_or_err("name")?.to_string())),
            ))
            .unwrap();
        mapper
    }

    #[test]
    fn test_primitives_pass_through() {
        let mut s = Serializer::new(&mapper());
        for v in [Value::Null, Value::from(5), Value::from("x"), Value::from(true)] {
            assert_eq!(s.serialize(&v).unwrap(), v);
        }
    }

    #[test]
    fn test_object_is_stamped() {
        let mut s = Serializer::new(&mapper());
        let out = s.serialize(&Value::object(Tag("a".into()))).unwrap();
        let binder = out.as_binder().unwrap();
        assert_eq!(binder.get_str(TYPE_KEY), Some("tag"));
        assert_eq!(binder.get_str("name"), Some("a"));
    }

    #[test]
    fn test_unregistered_object_fails() {
        let mut s = Serializer::new(&Mapper::new());
        let err = s.serialize(&Value::object(Tag("a".into()))).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvedAdapter(_)));
        assert!(err.to_string().contains("unregistered type"));
    }

    #[test]
    fn test_adapter_output_is_not_walked() {
        struct Blob(Bytes);

        let mapper = mapper();
        mapper
            .register(FnAdapter::new(
                "hex",
                |b: &Bytes, _: &mut Serializer| Ok(Binder::of([("len", b.len() as u64)])),
                |_: &Binder, _: &mut Deserializer| Ok(Bytes::new()),
            ))
            .unwrap();
        mapper
            .register(FnAdapter::new(
                "blob",
                |b: &Blob, _: &mut Serializer| Ok(Binder::of([("data", b.0.clone())])),
                |b: &Binder, _: &mut Deserializer| Ok(Blob(b.get_bytes_or_err("data")?.clone())),
            ))
            .unwrap();

        let mut s = Serializer::new(&mapper);
        let out = s
            .serialize(&Value::object(Blob(Bytes::from_static(b"\x01\x02"))))
            .unwrap();
        let binder = out.as_binder().unwrap();
        assert_eq!(binder.type_name(), Some("blob"));
        assert_eq!(binder.get_bytes("data").map(|b| b.as_ref()), Some(&b"\x01\x02"[..]));
    }

    #[test]
    fn test_plain_map_gets_no_discriminator() {
        let mut s = Serializer::new(&mapper());
        let map = Value::dict(Binder::new().with("t", Value::object(Tag("b".into()))));
        let out = s.serialize(&map).unwrap();
        let binder = out.as_binder().unwrap();
        assert!(!binder.contains_key(TYPE_KEY));
        assert_eq!(binder.get_binder("t").unwrap().type_name(), Some("tag"));
    }

    #[test]
    fn test_unchanged_containers_are_not_copied() {
        let mut s = Serializer::new(&mapper());
        let list = Value::list([1, 2, 3]);
        let out = s.serialize(&list).unwrap();
        assert!(out.ptr_eq(&list));
    }

    #[test]
    fn test_shared_container_stays_shared() {
        let mut s = Serializer::new(&mapper());
        let inner = Value::list([Value::object(Tag("c".into()))]);
        let outer = Value::list([inner.clone(), inner]);
        let out = s.serialize(&outer).unwrap();
        let items = out.as_list().unwrap();
        assert!(items[0].ptr_eq(&items[1]));
    }
}
