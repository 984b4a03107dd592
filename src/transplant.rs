//! Value transplanter.
//!
//! Copies decoded values out of a shadow instance into the caller's record,
//! field by field. Nested records and collection elements are rebuilt as the
//! target's own types, matched by field index rather than by name.

use crate::error::{Diagnostic, DiagnosticKind, Mismatch};
use crate::names::redact;
use crate::reflect::{Record, Reflect};
use crate::shadow::ShadowRecord;
use crate::types::{Shape, Value};
use crate::walk::walk_with_skipped;
use tracing::{debug, warn};

fn child_mut<'a>(node: &'a mut dyn Reflect, ident: &str) -> Result<&'a mut dyn Reflect, DiagnosticKind> {
    let Shape::Record(record) = node.shape() else {
        return Err(DiagnosticKind::FieldNotFound);
    };
    let index = record.field_index(ident).ok_or(DiagnosticKind::FieldNotFound)?;
    node.field_mut(index).ok_or(DiagnosticKind::Inaccessible)
}

fn locate<'a>(target: &'a mut dyn Reflect, path: &[&str]) -> Result<&'a mut dyn Reflect, DiagnosticKind> {
    let mut node = target;
    for ident in path {
        node = child_mut(node, ident)?;
    }
    Ok(node)
}

/// Assign `decoded` to the field of `target` at `path`.
///
/// Collections are rebuilt element by element as the target's element type.
/// On failure `target` is left unchanged.
pub fn transplant(target: &mut dyn Reflect, path: &[&str], decoded: &Value) -> Result<(), DiagnosticKind> {
    let leaf = locate(target, path)?;
    leaf.assign(decoded).map_err(DiagnosticKind::TypeMismatch)
}

/// Parse `text` into the field of `target` at `path`.
pub fn set_text_at(target: &mut dyn Reflect, path: &[&str], text: &str) -> Result<(), DiagnosticKind> {
    let leaf = locate(target, path)?;
    leaf.set_text(text).map_err(DiagnosticKind::TypeMismatch)
}

/// Build a fresh `T` from a decoded record value.
///
/// Starts from `T::default()`; unset and opaque fields keep their defaults.
pub fn copy_record<T: Record>(value: &Value) -> Result<T, Mismatch> {
    let record = T::schema().record_type();
    let Value::Record(slots) = value else {
        return Err(Mismatch::new(record.name, value.kind_name()));
    };
    if slots.len() != record.fields.len() {
        return Err(Mismatch::new(
            format!("{} with {} fields", record.name, record.fields.len()),
            format!("record with {} fields", slots.len()),
        ));
    }

    let mut copy = T::default();
    for (index, slot) in slots.iter().enumerate() {
        let Some(slot) = slot else {
            continue;
        };
        let Some(field) = copy.field_mut(index) else {
            continue;
        };
        field.assign(slot)?;
    }
    Ok(copy)
}

/// Build a collection of `T`, preserving order and length.
pub fn copy_collection<T: Reflect + Default>(items: &[Value]) -> Result<Vec<T>, Mismatch> {
    let mut copy = Vec::with_capacity(items.len());
    for item in items {
        let mut element = T::default();
        element.assign(item)?;
        copy.push(element);
    }
    Ok(copy)
}

/// Build a fixed-size array; positions past the end of `items` are defaulted.
pub fn copy_array<T: Reflect + Default, const N: usize>(items: &[Value]) -> Result<[T; N], Mismatch> {
    if items.len() > N {
        return Err(Mismatch::new(
            format!("at most {} elements", N),
            format!("{} elements", items.len()),
        ));
    }
    let mut copy: [T; N] = std::array::from_fn(|_| T::default());
    for (element, item) in copy.iter_mut().zip(items) {
        element.assign(item)?;
    }
    Ok(copy)
}

/// Drain every decoded leaf of `shadow` into `target`.
///
/// Leaves the document did not set are skipped. Fields that cannot be
/// assigned are reported and skipped; the rest of the bind continues.
pub fn transplant_shadow(shadow: &ShadowRecord, target: &mut dyn Reflect, source: &'static str) -> Vec<Diagnostic> {
    let (entries, skipped) = walk_with_skipped(false, shadow);
    let mut diagnostics: Vec<_> = skipped
        .iter()
        .map(|path| Diagnostic::new(source, path.join("."), DiagnosticKind::Inaccessible))
        .collect();

    for entry in entries {
        let Some(value) = entry.slot.to_value() else {
            continue;
        };
        let dotted = entry.dotted_path();

        match transplant(target, &entry.path, &value) {
            Ok(()) => {
                debug!(
                    "Transplanted {} = {}",
                    dotted,
                    redact(&value.to_string(), &entry.field.annotations)
                );
            }
            Err(kind) => {
                let kind = kind.redacted(&entry.field.annotations);
                warn!("Skipping {} field {}: {}", source, dotted, kind);
                diagnostics.push(Diagnostic::new(source, dotted, kind));
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::instantiate;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    crate::record!(Point { x, y });

    #[derive(Debug, Default, PartialEq)]
    struct Polygon {
        name: String,
        origin: Point,
        path: Vec<Point>,
        corners: [Point; 2],
        tags: Vec<String>,
        token: u16,
        scratch: Vec<u8>,
    }

    crate::record!(Polygon {
        name,
        origin,
        path,
        corners,
        tags,
        token { confy: "token;sensitive" },
        #[opaque] scratch,
    });

    fn point(x: i64, y: i64) -> Value {
        Value::Record(vec![Some(Value::Int(x)), Some(Value::Int(y))])
    }

    #[test]
    fn test_scalar_and_nested_leaf() {
        let mut target = Polygon::default();
        transplant(&mut target, &["name"], &Value::String("tri".into())).unwrap();
        transplant(&mut target, &["origin", "y"], &Value::Int(-4)).unwrap();
        assert_eq!(target.name, "tri");
        assert_eq!(target.origin, Point { x: 0, y: -4 });
    }

    #[test]
    fn test_collection_of_records_preserves_order() {
        let mut target = Polygon::default();
        let decoded = Value::List(vec![point(1, 2), point(3, 4), point(5, 6)]);
        transplant(&mut target, &["path"], &decoded).unwrap();
        assert_eq!(
            target.path,
            vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }, Point { x: 5, y: 6 }]
        );
    }

    #[test]
    fn test_empty_collection_yields_empty() {
        let mut target = Polygon {
            tags: vec!["stale".into()],
            ..Default::default()
        };
        transplant(&mut target, &["tags"], &Value::List(Vec::new())).unwrap();
        assert!(target.tags.is_empty());
    }

    #[test]
    fn test_array_of_records_defaults_missing_positions() {
        let mut target = Polygon::default();
        transplant(&mut target, &["corners"], &Value::List(vec![point(9, 9)])).unwrap();
        assert_eq!(target.corners, [Point { x: 9, y: 9 }, Point::default()]);
    }

    #[test]
    fn test_partial_record_element_keeps_defaults() {
        let items = vec![Value::Record(vec![None, Some(Value::Int(7))])];
        let copied: Vec<Point> = copy_collection(&items).unwrap();
        assert_eq!(copied, vec![Point { x: 0, y: 7 }]);
    }

    #[test]
    fn test_copy_record_rejects_arity_mismatch() {
        let err = copy_record::<Point>(&Value::Record(vec![None])).unwrap_err();
        assert_eq!(err.expected, "Point with 2 fields");
        assert!(copy_record::<Point>(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_copy_array_rejects_overflow() {
        let items = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        assert!(copy_array::<i32, 2>(&items).is_err());
        assert_eq!(copy_array::<i32, 3>(&items).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_missing_and_opaque_paths() {
        let mut target = Polygon::default();
        assert_eq!(
            transplant(&mut target, &["nope"], &Value::Int(1)),
            Err(DiagnosticKind::FieldNotFound)
        );
        assert_eq!(
            transplant(&mut target, &["name", "deeper"], &Value::Int(1)),
            Err(DiagnosticKind::FieldNotFound)
        );
        assert_eq!(
            transplant(&mut target, &["scratch"], &Value::List(Vec::new())),
            Err(DiagnosticKind::Inaccessible)
        );
    }

    #[test]
    fn test_mismatch_leaves_target_untouched() {
        let mut target = Polygon {
            token: 5,
            ..Default::default()
        };
        let err = transplant(&mut target, &["token"], &Value::Int(-1)).unwrap_err();
        assert!(matches!(err, DiagnosticKind::TypeMismatch(_)));
        assert_eq!(target.token, 5);

        let bad_path = Value::List(vec![point(1, 1), Value::String("x".into())]);
        assert!(transplant(&mut target, &["path"], &bad_path).is_err());
        assert!(target.path.is_empty());
    }

    #[test]
    fn test_set_text_at() {
        let mut target = Polygon::default();
        set_text_at(&mut target, &["origin", "x"], "12").unwrap();
        set_text_at(&mut target, &["tags"], "a,b").unwrap();
        assert_eq!(target.origin.x, 12);
        assert_eq!(target.tags, vec!["a", "b"]);
        assert!(set_text_at(&mut target, &["origin"], "1,2").is_err());
    }

    #[test]
    fn test_transplant_shadow_skips_absent_and_reports_failures() {
        let mut target = Polygon {
            name: "keep".into(),
            ..Default::default()
        };
        let mut shadow = instantiate(&target).unwrap();
        shadow
            .field_mut(1)
            .and_then(|origin| origin.field_mut(0))
            .unwrap()
            .assign(&Value::Int(3))
            .unwrap();
        shadow.field_mut(5).unwrap().assign(&Value::Int(99_999)).unwrap();

        let diagnostics = transplant_shadow(&shadow, &mut target, "file");

        assert_eq!(target.name, "keep");
        assert_eq!(target.origin.x, 3);
        assert_eq!(target.token, 0);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::new("file", "scratch", DiagnosticKind::Inaccessible),
                Diagnostic::new(
                    "file",
                    "token",
                    DiagnosticKind::TypeMismatch(Mismatch::new("u16", crate::types::MASK))
                ),
            ]
        );
    }
}
