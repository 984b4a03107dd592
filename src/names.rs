//! Name resolution, bindability and redaction.
//!
//! Environment variables and flags are named by joining the public name of
//! every path segment with a delimiter.

use crate::reflect::Record;
use crate::types::{Annotations, RecordType, Shape, MASK};
use crate::walk::walk;
use heck::{ToKebabCase, ToShoutySnakeCase};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Post-processing applied to a fully joined name.
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl Transform {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, name: &str) -> String {
        (self.0)(name)
    }

    /// `Server.Port` -> `SERVER.PORT`
    pub fn upper() -> Self {
        Self::new(|name| name.to_uppercase())
    }

    pub fn lower() -> Self {
        Self::new(|name| name.to_lowercase())
    }

    /// `server_listenPort` -> `SERVER_LISTEN_PORT`
    pub fn shouty_snake() -> Self {
        Self::new(|name| name.to_shouty_snake_case())
    }

    /// `server.listen_port` -> `server-listen-port`
    pub fn kebab() -> Self {
        Self::new(|name| name.to_kebab_case())
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Result of [`resolve_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    /// Whether the field can be bound from flat text (env, CLI).
    pub bindable: bool,
}

/// Public name of every segment of `path`.
///
/// Segments that do not exist in `root` keep their declared identifier.
pub fn resolve_segments(root: &RecordType, path: &[&str]) -> Vec<String> {
    let mut current = Some(root);
    let mut segments = Vec::with_capacity(path.len());

    for ident in path {
        let field = current.and_then(|record| record.field(ident));
        let segment = match field {
            Some(field) => field.public_name().to_string(),
            None => {
                warn!(record = root.name, field = *ident, "failed to find field while resolving path");
                (*ident).to_string()
            }
        };
        current = field
            .and_then(|field| field.shape.as_record())
            .map(|record| record.as_ref());
        segments.push(segment);
    }

    segments
}

/// Join the resolved segments of `path` with `delimiter`, then apply `transform`.
pub fn resolve_name(
    root: &RecordType,
    path: &[&str],
    delimiter: &str,
    transform: Option<&Transform>,
) -> ResolvedName {
    let joined = resolve_segments(root, path).join(delimiter);
    let name = match transform {
        Some(transform) => {
            let transformed = transform.apply(&joined);
            debug!(before = %joined, after = %transformed, "applied name transform");
            transformed
        }
        None => joined,
    };

    let bindable = leaf_shape(root, path).is_some_and(is_bindable);
    if !bindable {
        debug!(path = %path.join("."), "field has no flat text encoding");
    }

    ResolvedName { name, bindable }
}

fn leaf_shape<'a>(root: &'a RecordType, path: &[&str]) -> Option<&'a Shape> {
    let (last, parents) = path.split_last()?;
    let mut record = root;
    for ident in parents {
        record = record.field(ident)?.shape.as_record()?.as_ref();
    }
    Some(&record.field(last)?.shape)
}

/// Whether values of `shape` can be carried by an environment variable or flag.
///
/// Records need their own text encoding; collections need textual elements.
pub fn is_bindable(shape: &Shape) -> bool {
    match shape {
        Shape::List { elem, .. } => elem.is_textual(),
        other => other.is_textual(),
    }
}

/// Every bindable name of `T`, in walk order.
pub fn generated_names<T: Record>(delimiter: &str, transform: Option<&Transform>) -> Vec<String> {
    let template = T::default();
    let record = T::schema().record_type();

    walk(true, &template)
        .into_iter()
        .map(|entry| resolve_name(record, &entry.path, delimiter, transform))
        .filter(|resolved| resolved.bindable)
        .map(|resolved| resolved.name)
        .collect()
}

/// Mask `raw` when the field is sensitive and the value non-empty.
pub fn redact<'a>(raw: &'a str, annotations: &Annotations) -> Cow<'a, str> {
    if annotations.is_sensitive() && !raw.is_empty() {
        Cow::Borrowed(MASK)
    } else {
        Cow::Borrowed(raw)
    }
}
