//! Record descriptors and the `record!` macro.
//!
//! A record's [`Schema`] is built once through a [`RecordBuilder`] and cached
//! per type. It pairs the public [`RecordType`] descriptor with type-erased
//! field accessors, so a `&dyn Reflect` can reach any field by index.

use super::{Reflect, Shaped};
use crate::error::Mismatch;
use crate::types::{Annotations, FieldDescriptor, RecordType, Shape, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// A record type that can be bound from configuration sources.
///
/// Implement it with the [`record!`](crate::record) macro, which also
/// provides the matching [`Reflect`] and [`Shaped`] impls.
pub trait Record: Reflect + Shaped + Default + Sized + 'static {
    /// Declare the record's fields, in declaration order.
    fn describe(builder: RecordBuilder<Self>) -> RecordBuilder<Self>;

    /// Cached schema built from [`describe`](Self::describe).
    fn schema() -> &'static Schema<Self>;
}

trait ErasedAccessor<S>: Send + Sync {
    fn read<'a>(&self, record: &'a S) -> &'a dyn Reflect;
    fn write<'a>(&self, record: &'a mut S) -> &'a mut dyn Reflect;
}

struct Accessor<S, F> {
    get: fn(&S) -> &F,
    get_mut: fn(&mut S) -> &mut F,
}

impl<S: 'static, F: Reflect + 'static> ErasedAccessor<S> for Accessor<S, F> {
    fn read<'a>(&self, record: &'a S) -> &'a dyn Reflect {
        (self.get)(record)
    }

    fn write<'a>(&self, record: &'a mut S) -> &'a mut dyn Reflect {
        (self.get_mut)(record)
    }
}

type BoxedAccessor<S> = Box<dyn ErasedAccessor<S>>;
type TextParser<S> = fn(&str) -> Result<S, String>;

fn parse_with_from_str<S>(text: &str) -> Result<S, String>
where
    S: FromStr,
    S::Err: fmt::Display,
{
    text.parse::<S>().map_err(|err| err.to_string())
}

/// Builder for a record's [`Schema`].
pub struct RecordBuilder<S> {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    accessors: Vec<Option<BoxedAccessor<S>>>,
    parse: Option<TextParser<S>>,
}

impl<S: 'static> RecordBuilder<S> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            accessors: Vec::new(),
            parse: None,
        }
    }

    /// Add an addressable field.
    pub fn field<F>(mut self, ident: &'static str, get: fn(&S) -> &F, get_mut: fn(&mut S) -> &mut F) -> Self
    where
        F: Reflect + Shaped + 'static,
    {
        self.fields.push(FieldDescriptor {
            ident,
            shape: F::type_shape(),
            annotations: Annotations::new(),
        });
        self.accessors.push(Some(Box::new(Accessor { get, get_mut })));
        self
    }

    /// Add a field that is part of the record but never bound.
    pub fn opaque(mut self, ident: &'static str) -> Self {
        self.fields.push(FieldDescriptor {
            ident,
            shape: Shape::Opaque,
            annotations: Annotations::new(),
        });
        self.accessors.push(None);
        self
    }

    /// Annotate the most recently added field.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.annotations.push(key, value),
            None => warn!(record = self.name, key, "annotation before any field, ignoring"),
        }
        self
    }

    /// Allow the whole record to be parsed from one text value.
    pub fn textual(mut self) -> Self
    where
        S: FromStr,
        S::Err: fmt::Display,
    {
        self.parse = Some(parse_with_from_str::<S>);
        self
    }

    pub fn build(self) -> Schema<S> {
        Schema {
            record_type: Arc::new(RecordType {
                name: self.name,
                fields: self.fields,
                textual: self.parse.is_some(),
            }),
            accessors: self.accessors,
            parse: self.parse,
        }
    }
}

/// Descriptor plus field accessors for one record type.
pub struct Schema<S> {
    record_type: Arc<RecordType>,
    accessors: Vec<Option<BoxedAccessor<S>>>,
    parse: Option<TextParser<S>>,
}

impl<S> Schema<S> {
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn shape(&self) -> Shape {
        Shape::Record(self.record_type.clone())
    }

    pub fn get<'a>(&self, record: &'a S, index: usize) -> Option<&'a dyn Reflect> {
        let accessor = self.accessors.get(index)?.as_ref()?;
        Some(accessor.read(record))
    }

    pub fn get_mut<'a>(&self, record: &'a mut S, index: usize) -> Option<&'a mut dyn Reflect> {
        let accessor = self.accessors.get(index)?.as_ref()?;
        Some(accessor.write(record))
    }

    /// Snapshot of every addressable field.
    pub fn to_value(&self, record: &S) -> Value {
        Value::Record(
            (0..self.accessors.len())
                .map(|index| self.get(record, index).and_then(|field| field.to_value()))
                .collect(),
        )
    }

    pub fn parse_text(&self, record: &mut S, text: &str) -> Result<(), Mismatch> {
        let Some(parse) = self.parse else {
            return Err(Mismatch::new(
                format!("{} text", self.record_type.name),
                "record without a text encoding",
            ));
        };
        *record = parse(text).map_err(|err| {
            Mismatch::new(self.record_type.name, format!("{:?} ({})", text, err))
        })?;
        Ok(())
    }
}

impl<S> fmt::Debug for Schema<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("record_type", &self.record_type)
            .finish_non_exhaustive()
    }
}

/// Implement [`Record`], [`Reflect`] and [`Shaped`] for a struct.
///
/// Fields are listed in declaration order with optional `key: "value"`
/// annotations. `#[opaque]` declares a field that is never bound; a leading
/// `#[text]` makes the record parseable from text through its `FromStr` impl.
///
/// ```
/// use confbind::record;
///
/// #[derive(Debug, Default)]
/// struct Database {
///     url: String,
///     password: String,
///     pool: Vec<u32>,
/// }
///
/// record!(Database {
///     url { confy: "db_url", confy_description: "Connection string" },
///     password { confy: ";sensitive" },
///     pool,
/// });
/// ```
#[macro_export]
macro_rules! record {
    (@fields $builder:expr; ) => {
        $builder
    };
    (@fields $builder:expr; #[opaque] $field:ident $(, $($rest:tt)*)?) => {
        $crate::record!(@fields $builder.opaque(stringify!($field)); $($($rest)*)?)
    };
    (@fields $builder:expr; $field:ident $({ $($key:ident : $value:literal),* $(,)? })? $(, $($rest:tt)*)?) => {
        $crate::record!(@fields $builder
            .field(stringify!($field), |s| &s.$field, |s| &mut s.$field)
            $($(.tag(stringify!($key), $value))*)?;
            $($($rest)*)?)
    };
    (@record_impl $ty:ident [$($extra:tt)*] $($body:tt)*) => {
        impl $crate::Record for $ty {
            fn describe(builder: $crate::RecordBuilder<Self>) -> $crate::RecordBuilder<Self> {
                $crate::record!(@fields builder $($extra)*; $($body)*)
            }

            fn schema() -> &'static $crate::Schema<Self> {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema<$ty>> = ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    <$ty as $crate::Record>::describe($crate::RecordBuilder::new(stringify!($ty))).build()
                })
            }
        }

        impl $crate::Shaped for $ty {
            fn type_shape() -> $crate::Shape {
                <$ty as $crate::Record>::schema().shape()
            }
        }

        impl $crate::Reflect for $ty {
            fn shape(&self) -> $crate::Shape {
                <$ty as $crate::Shaped>::type_shape()
            }

            fn field(&self, index: usize) -> ::std::option::Option<&dyn $crate::Reflect> {
                <$ty as $crate::Record>::schema().get(self, index)
            }

            fn field_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn $crate::Reflect> {
                <$ty as $crate::Record>::schema().get_mut(self, index)
            }

            fn to_value(&self) -> ::std::option::Option<$crate::Value> {
                ::std::option::Option::Some(<$ty as $crate::Record>::schema().to_value(self))
            }

            fn assign(&mut self, value: &$crate::Value) -> ::std::result::Result<(), $crate::Mismatch> {
                *self = $crate::transplant::copy_record::<$ty>(value)?;
                ::std::result::Result::Ok(())
            }

            fn set_text(&mut self, text: &str) -> ::std::result::Result<(), $crate::Mismatch> {
                <$ty as $crate::Record>::schema().parse_text(self, text)
            }
        }
    };
    (#[text] $ty:ident { $($body:tt)* }) => {
        $crate::record!(@record_impl $ty [.textual()] $($body)*);
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::record!(@record_impl $ty [] $($body)*);
    };
}

/// Implement [`Reflect`] and [`Shaped`] for a leaf type with a text encoding.
///
/// The type must implement `FromStr` and `Display`; documents carry it as a
/// string.
#[macro_export]
macro_rules! text_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Shaped for $ty {
                fn type_shape() -> $crate::Shape {
                    $crate::Shape::Text(stringify!($ty))
                }
            }

            impl $crate::Reflect for $ty {
                fn shape(&self) -> $crate::Shape {
                    <$ty as $crate::Shaped>::type_shape()
                }

                fn to_value(&self) -> ::std::option::Option<$crate::Value> {
                    ::std::option::Option::Some($crate::Value::String(::std::string::ToString::to_string(self)))
                }

                fn assign(&mut self, value: &$crate::Value) -> ::std::result::Result<(), $crate::Mismatch> {
                    match value {
                        $crate::Value::String(text) => $crate::Reflect::set_text(self, text),
                        other => ::std::result::Result::Err($crate::Mismatch::new(stringify!($ty), other.kind_name())),
                    }
                }

                fn set_text(&mut self, text: &str) -> ::std::result::Result<(), $crate::Mismatch> {
                    *self = text.parse::<$ty>().map_err(|err| {
                        $crate::Mismatch::new(stringify!($ty), ::std::format!("{:?} ({})", text, err))
                    })?;
                    ::std::result::Result::Ok(())
                }
            }
        )+
    };
}
