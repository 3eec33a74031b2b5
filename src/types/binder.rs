//! Ordered, string-keyed container used as the intermediate representation
//! of structured values.
//!
//! A binder produced by an adapter carries a discriminator entry
//! ([`TYPE_KEY`]) naming the adapter that can rebuild the object. Decoders
//! also accept the short form [`SHORT_TYPE_KEY`].

use crate::error::{CodecError, Result};
use crate::types::value::Value;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::sync::Arc;

/// Discriminator key written by the serializer.
pub const TYPE_KEY: &str = "__type";

/// Short discriminator key accepted on decode.
pub const SHORT_TYPE_KEY: &str = "__t";

/// Insertion-ordered string-keyed map of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binder {
    entries: IndexMap<String, Value>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Build a binder from key/value pairs.
    ///
    /// ```rust
    /// use boss_codec::Binder;
    ///
    /// let b = Binder::of([("x", 1), ("y", 2)]);
    /// assert_eq!(b.get_i64("y"), Some(2));
    /// ```
    pub fn of<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs.into_iter().collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.entries.values()
    }

    /// Discriminator of this binder, if it carries one.
    pub fn type_name(&self) -> Option<&str> {
        self.get(TYPE_KEY)
            .or_else(|| self.get(SHORT_TYPE_KEY))
            .and_then(Value::as_str)
    }

    pub fn set_type_name(&mut self, name: &str) {
        self.insert(TYPE_KEY, Value::text(name));
    }

    pub fn get_value_or_err(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| CodecError::MissingField(key.to_string()))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    pub fn get_str_or_err(&self, key: &str) -> Result<&str> {
        self.typed(key, "text", Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    pub fn get_i64_or_err(&self, key: &str) -> Result<i64> {
        self.typed(key, "64-bit integer", Value::as_i64)
    }

    pub fn get_big_int_or_err(&self, key: &str) -> Result<BigInt> {
        self.typed(key, "integer", Value::to_big_int)
    }

    pub fn get_f64_or_err(&self, key: &str) -> Result<f64> {
        self.typed(key, "number", Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_bool_or_err(&self, key: &str) -> Result<bool> {
        self.typed(key, "boolean", Value::as_bool)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&Bytes> {
        self.get(key).and_then(Value::as_bytes)
    }

    pub fn get_bytes_or_err(&self, key: &str) -> Result<&Bytes> {
        self.typed(key, "binary", Value::as_bytes)
    }

    pub fn get_timestamp_or_err(&self, key: &str) -> Result<DateTime<Utc>> {
        self.typed(key, "timestamp", Value::as_timestamp)
    }

    pub fn get_binder(&self, key: &str) -> Option<&Binder> {
        self.get(key).and_then(Value::as_binder)
    }

    pub fn get_binder_or_err(&self, key: &str) -> Result<&Binder> {
        self.typed(key, "dictionary", Value::as_binder)
    }

    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn get_list_or_err(&self, key: &str) -> Result<&[Value]> {
        self.typed(key, "list", Value::as_list)
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.get_value_or_err(key)?;
        extract(value).ok_or_else(|| CodecError::InvalidField {
            field: key.to_string(),
            expected,
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Binder {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Binder {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Binder {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl From<Arc<Binder>> for Binder {
    fn from(shared: Arc<Binder>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone())
    }
}
