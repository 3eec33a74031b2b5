//! The generic value tree shared by the codec and the mapper.
//!
//! A [`Value`] is what the Writer consumes and the Reader produces. The only
//! variant the wire never sees is [`Value::Object`]: it carries a typed
//! application object and must pass through a [`Serializer`](crate::Serializer)
//! first.

use crate::types::binder::Binder;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use num_bigint::BigInt;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A typed application object stored inside a value tree.
pub type AnyObject = Arc<dyn Any + Send + Sync>;

/// Generic value tree node.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integer whose magnitude fits in 31 bits.
    Int(i32),
    /// Integer beyond 32-bit range that still fits in 64 bits.
    Long(i64),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    Double(f64),
    Text(Arc<str>),
    Bytes(Bytes),
    /// Second-precision point in time.
    Timestamp(DateTime<Utc>),
    List(Arc<Vec<Value>>),
    Dict(Arc<Binder>),
    Object(AnyObject),
}

impl Value {
    /// Build an integer value using the narrowest variant that can hold it.
    pub fn integer(value: i64) -> Value {
        match i32::try_from(value) {
            Ok(small) if small != i32::MIN => Value::Int(small),
            _ => Value::Long(value),
        }
    }

    /// Build an integer value from an arbitrary-precision integer, narrowing when possible.
    pub fn big(value: BigInt) -> Value {
        match i64::try_from(&value) {
            Ok(v) => Value::integer(v),
            Err(_) => Value::BigInt(value),
        }
    }

    pub fn text(value: impl Into<Arc<str>>) -> Value {
        Value::Text(value.into())
    }

    pub fn bytes(value: impl Into<Bytes>) -> Value {
        Value::Bytes(value.into())
    }

    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn dict(binder: Binder) -> Value {
        Value::Dict(Arc::new(binder))
    }

    /// Wrap a typed application object. It is resolved to an adapter by its runtime type.
    pub fn object<T: Any + Send + Sync>(object: T) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Timestamp truncated to whole seconds, the precision the wire carries.
    ///
    /// Building [`Value::Timestamp`] directly with a sub-second part is allowed,
    /// but the Writer rejects it.
    pub fn timestamp(time: DateTime<Utc>) -> Value {
        Value::Timestamp(time.trunc_subsecs(0))
    }

    /// Timestamp from seconds since the epoch; `None` when out of chrono's range.
    pub fn timestamp_secs(seconds: i64) -> Option<Value> {
        DateTime::<Utc>::from_timestamp(seconds, 0).map(Value::Timestamp)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Long(_) | Value::BigInt(_) => "integer",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "binary",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::BigInt(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::BigInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn to_big_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(v) => Some(BigInt::from(*v)),
            Value::Long(v) => Some(BigInt::from(*v)),
            Value::BigInt(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Doubles, and integers that fit in an `i64`, as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_binder(&self) -> Option<&Binder> {
        match self {
            Value::Dict(binder) => Some(binder),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&AnyObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow the typed object inside a [`Value::Object`].
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Whether two values share the same heap allocation (lists, dictionaries and objects only).
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Indented, human-readable dump of the tree.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        trace_into(&mut out, "", self);
        out
    }
}

fn trace_into(out: &mut String, prefix: &str, value: &Value) {
    match value {
        Value::Bytes(bytes) => {
            out.push_str(prefix);
            if bytes.len() > 30 {
                out.push_str(&hex_string(&bytes[..30]));
                out.push_str(&format!(" ...({} bytes)\n", bytes.len()));
            } else {
                out.push_str(&hex_string(bytes));
                out.push('\n');
            }
        }
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                trace_into(out, &format!("{prefix}{i}: "), item);
            }
        }
        Value::Dict(binder) => {
            for (key, item) in binder.iter() {
                out.push_str(&format!("{prefix}{key}:\n"));
                trace_into(out, &format!("{prefix}  "), item);
            }
        }
        Value::Null => {
            out.push_str(prefix);
            out.push_str("null\n");
        }
        other => {
            out.push_str(&format!("{prefix}\"{}\"\n", ScalarDisplay(other)));
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

struct ScalarDisplay<'a>(&'a Value);

impl fmt::Display for ScalarDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Value::BigInt(v) => f.debug_tuple("BigInt").field(v).finish(),
            Value::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Value::Timestamp(t) => f.debug_tuple("Timestamp").field(t).finish(),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Dict(binder) => binder.fmt(f),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_integer() && other.is_integer() {
            return match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a == b,
                (None, None) => self.to_big_int() == other.to_big_int(),
                _ => false,
            };
        }
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::integer(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Value::integer(v),
            Err(_) => Value::BigInt(BigInt::from(v)),
        }
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::big(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Arc::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<DateTime<Utc>> for Value {
    /// Sub-second precision is dropped; see [`Value::timestamp`].
    fn from(v: DateTime<Utc>) -> Self {
        Value::timestamp(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Arc::new(v))
    }
}

impl From<Binder> for Value {
    fn from(v: Binder) -> Self {
        Value::Dict(Arc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
