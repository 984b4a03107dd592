//! Object-safe reflection over records and leaf values.
//!
//! Every bindable type implements [`Reflect`] (dynamic access through
//! `&dyn Reflect`) and [`Shaped`] (its shape without an instance, needed for
//! empty collections and for building descriptors). Records get both from the
//! [`record!`](crate::record) macro; text-encoded leaves from
//! [`text_value!`](crate::text_value).

mod impls;
mod record;

pub use record::{Record, RecordBuilder, Schema};

use crate::error::Mismatch;
use crate::types::{Shape, Value};

/// Dynamic access to a value of a known shape.
pub trait Reflect {
    /// Shape of this value's type.
    fn shape(&self) -> Shape;

    /// Field `index` of a record, if it is addressable.
    fn field(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }

    /// Current value, or `None` when nothing has been set (shadow leaves only).
    fn to_value(&self) -> Option<Value>;

    /// Deep-copy `value` into `self`, converting to this type's representation.
    fn assign(&mut self, value: &Value) -> Result<(), Mismatch>;

    /// Parse `text` into `self`, as the environment and CLI sources do.
    fn set_text(&mut self, text: &str) -> Result<(), Mismatch>;
}

/// Shape of a type, available without an instance.
pub trait Shaped {
    fn type_shape() -> Shape;
}
