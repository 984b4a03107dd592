//! Field path walker.
//!
//! Enumerates the fields of a record value depth-first, in declaration order.
//! The order is relied upon for reproducible flag and variable listings.

use crate::reflect::Reflect;
use crate::types::{FieldDescriptor, Shape};
use std::fmt;
use tracing::warn;

/// Declared identifiers from the root record down to a field.
pub type FieldPath = Vec<&'static str>;

/// One walked field: its path, its live value and its descriptor.
#[derive(Clone)]
pub struct FieldEntry<'a> {
    pub path: FieldPath,
    pub slot: &'a dyn Reflect,
    pub field: FieldDescriptor,
}

impl<'a> FieldEntry<'a> {
    /// Drop the borrow of the walked value.
    pub fn into_parts(self) -> (FieldPath, FieldDescriptor) {
        (self.path, self.field)
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Debug for FieldEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEntry")
            .field("path", &self.path)
            .field("value", &self.slot.to_value())
            .field("annotations", &self.field.annotations)
            .finish()
    }
}

/// Walk every leaf of `root`.
///
/// With `include_records`, nested record fields are also emitted, each one
/// before its own children. Fields that cannot be addressed are skipped with
/// a warning. A non-record root yields nothing.
pub fn walk(include_records: bool, root: &dyn Reflect) -> Vec<FieldEntry<'_>> {
    walk_with_skipped(include_records, root).0
}

/// Like [`walk`], also returning the paths of the fields it skipped.
pub fn walk_with_skipped(include_records: bool, root: &dyn Reflect) -> (Vec<FieldEntry<'_>>, Vec<FieldPath>) {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    let mut prefix = Vec::new();
    walk_into(include_records, root, &mut prefix, &mut entries, &mut skipped);
    (entries, skipped)
}

fn walk_into<'a>(
    include_records: bool,
    value: &'a dyn Reflect,
    prefix: &mut FieldPath,
    entries: &mut Vec<FieldEntry<'a>>,
    skipped: &mut Vec<FieldPath>,
) {
    let Shape::Record(record) = value.shape() else {
        return;
    };

    for (index, field) in record.fields.iter().enumerate() {
        let Some(slot) = value.field(index) else {
            warn!(record = record.name, field = field.ident, "unable to access field, skipping");
            let mut path = prefix.clone();
            path.push(field.ident);
            skipped.push(path);
            continue;
        };

        prefix.push(field.ident);
        if field.shape.is_record() {
            if include_records {
                entries.push(FieldEntry {
                    path: prefix.clone(),
                    slot,
                    field: field.clone(),
                });
            }
            walk_into(include_records, slot, prefix, entries, skipped);
        } else {
            entries.push(FieldEntry {
                path: prefix.clone(),
                slot,
                field: field.clone(),
            });
        }
        prefix.pop();
    }
}
