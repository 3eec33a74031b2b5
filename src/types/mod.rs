//! # Value Model
//!
//! The generic representation that sits between typed application objects and
//! the wire: [`Value`] trees whose structured nodes are [`Binder`]s.

pub mod binder;
pub mod value;

pub use binder::{Binder, SHORT_TYPE_KEY, TYPE_KEY};
pub use value::{AnyObject, Value};
