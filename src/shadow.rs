//! Shadow type synthesis.
//!
//! A shadow type has exactly the field order and nesting of the record it is
//! built from, but every field advertises its public name under every
//! supported format annotation, so one document key matches the same field no
//! matter which format the document was written in. A [`ShadowRecord`] is an
//! instance of a shadow type: it owns its storage and is only ever decoded
//! into and then drained.

use crate::error::{Mismatch, SchemaError};
use crate::reflect::Reflect;
use crate::types::{Format, RecordType, Shape, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Build the shadow type of `record`.
///
/// Explicit per-format annotations are kept verbatim. Otherwise the override
/// name, or failing that the declared identifier, is injected for every
/// format, and all formats match keys case-sensitively.
///
/// Two fields claiming the same override name at one nesting level are a
/// [`SchemaError::DuplicateName`], as are two fields answering to the same
/// document key under any one format.
pub fn synthesize(record: &RecordType) -> Result<Arc<RecordType>, SchemaError> {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut keys: HashSet<(Format, String)> = HashSet::new();
    let mut fields = Vec::with_capacity(record.fields.len());

    for field in &record.fields {
        debug!(record = record.name, field = field.ident, shape = %field.shape.type_name(), "cloning record field");

        let override_name = field.annotations.override_name();
        if let Some(name) = override_name
            && !claimed.insert(name)
        {
            return Err(SchemaError::DuplicateName {
                record: record.name.to_string(),
                name: name.to_string(),
                field: field.ident.to_string(),
            });
        }

        let mut shadow_field = field.clone();
        shadow_field.shape = synthesize_shape(&field.shape)?;

        if field.is_accessible() {
            for format in Format::SUPPORTED {
                let key = format.annotation_key();
                if field.annotations.contains(key) {
                    debug!(field = field.ident, key, "keeping explicit format annotation");
                    continue;
                }
                shadow_field
                    .annotations
                    .set(key, override_name.unwrap_or(field.ident));
            }

            for format in Format::SUPPORTED {
                if let Some(name) = shadow_field.format_name(format)
                    && !keys.insert((format, name.to_string()))
                {
                    return Err(SchemaError::DuplicateName {
                        record: record.name.to_string(),
                        name: name.to_string(),
                        field: field.ident.to_string(),
                    });
                }
            }
        }

        fields.push(shadow_field);
    }

    Ok(Arc::new(RecordType {
        name: record.name,
        fields,
        textual: record.textual,
    }))
}

/// Shadow form of a field shape: records and collection elements are
/// replaced by their shadow types, array lengths are preserved.
pub fn synthesize_shape(shape: &Shape) -> Result<Shape, SchemaError> {
    match shape {
        Shape::Record(record) => Ok(Shape::Record(synthesize(record)?)),
        Shape::List { elem, len } => Ok(Shape::List {
            elem: Box::new(synthesize_shape(elem)?),
            len: *len,
        }),
        other => Ok(other.clone()),
    }
}

/// Shadow type of the record type behind `target`.
pub fn synthesize_for(target: &dyn Reflect) -> Result<Arc<RecordType>, SchemaError> {
    match target.shape() {
        Shape::Record(record) => synthesize(&record),
        other => Err(SchemaError::NotARecord {
            type_name: other.type_name(),
        }),
    }
}

/// Fresh, empty shadow instance shaped after `target`'s type.
pub fn instantiate(target: &dyn Reflect) -> Result<ShadowRecord, SchemaError> {
    Ok(ShadowRecord::empty(synthesize_for(target)?))
}

/// Instance of a shadow type.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowRecord {
    record_type: Arc<RecordType>,
    slots: Vec<ShadowSlot>,
}

/// Storage for one field of a [`ShadowRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowSlot {
    Record(ShadowRecord),
    Leaf(ShadowLeaf),
    Opaque,
}

/// A decoded leaf; `value` stays `None` when the document did not set it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowLeaf {
    shape: Shape,
    value: Option<Value>,
}

impl ShadowLeaf {
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: Option<Value>) {
        self.value = value;
    }
}

impl ShadowRecord {
    pub fn empty(record_type: Arc<RecordType>) -> Self {
        let slots = record_type
            .fields
            .iter()
            .map(|field| match &field.shape {
                Shape::Record(nested) => ShadowSlot::Record(ShadowRecord::empty(nested.clone())),
                Shape::Opaque => ShadowSlot::Opaque,
                shape => ShadowSlot::Leaf(ShadowLeaf {
                    shape: shape.clone(),
                    value: None,
                }),
            })
            .collect();
        Self { record_type, slots }
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn slot(&self, index: usize) -> Option<&ShadowSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ShadowSlot> {
        self.slots.get_mut(index)
    }

    /// Whether no field at any depth was decoded.
    pub fn is_unset(&self) -> bool {
        self.slots.iter().all(|slot| match slot {
            ShadowSlot::Record(nested) => nested.is_unset(),
            ShadowSlot::Leaf(leaf) => leaf.value.is_none(),
            ShadowSlot::Opaque => true,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Record(
            self.slots
                .into_iter()
                .map(|slot| match slot {
                    ShadowSlot::Record(nested) => Some(nested.into_value()),
                    ShadowSlot::Leaf(leaf) => leaf.value,
                    ShadowSlot::Opaque => None,
                })
                .collect(),
        )
    }
}

impl Reflect for ShadowRecord {
    fn shape(&self) -> Shape {
        Shape::Record(self.record_type.clone())
    }

    fn field(&self, index: usize) -> Option<&dyn Reflect> {
        match self.slots.get(index)? {
            ShadowSlot::Record(nested) => Some(nested),
            ShadowSlot::Leaf(leaf) => Some(leaf),
            ShadowSlot::Opaque => None,
        }
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        match self.slots.get_mut(index)? {
            ShadowSlot::Record(nested) => Some(nested),
            ShadowSlot::Leaf(leaf) => Some(leaf),
            ShadowSlot::Opaque => None,
        }
    }

    fn to_value(&self) -> Option<Value> {
        Some(self.clone().into_value())
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        let Value::Record(values) = value else {
            return Err(Mismatch::new(self.record_type.name, value.kind_name()));
        };
        for (slot, value) in self.slots.iter_mut().zip(values) {
            match (slot, value) {
                (ShadowSlot::Record(nested), Some(value)) => nested.assign(value)?,
                (ShadowSlot::Leaf(leaf), value) => leaf.value = value.clone(),
                _ => {}
            }
        }
        Ok(())
    }

    fn set_text(&mut self, _text: &str) -> Result<(), Mismatch> {
        Err(Mismatch::new(self.record_type.name, "text"))
    }
}

impl Reflect for ShadowLeaf {
    fn shape(&self) -> Shape {
        self.shape.clone()
    }

    fn to_value(&self) -> Option<Value> {
        self.value.clone()
    }

    fn assign(&mut self, value: &Value) -> Result<(), Mismatch> {
        self.value = Some(value.clone());
        Ok(())
    }

    fn set_text(&mut self, text: &str) -> Result<(), Mismatch> {
        self.value = Some(Value::String(text.to_string()));
        Ok(())
    }
}
