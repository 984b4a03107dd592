//! Core data model shared by every stage of a bind.
//!
//! A record type is described once by a [`RecordType`]: an ordered list of
//! [`FieldDescriptor`]s, each with a [`Shape`] and free-form [`Annotations`].
//! Values travel between the shadow instance and the caller's record as
//! [`Value`] trees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Annotation key carrying the override name and the sensitivity flag.
pub const RENAME_KEY: &str = "confy";

/// Annotation key carrying the command-line help text.
pub const DESCRIPTION_KEY: &str = "confy_description";

/// Second segment of the rename annotation that marks a field as sensitive.
pub const SENSITIVE_KEYWORD: &str = "sensitive";

/// Replacement printed instead of sensitive values.
pub const MASK: &str = "**********";

pub const DEFAULT_ENV_DELIMITER: &str = "_";
pub const DEFAULT_CLI_DELIMITER: &str = ".";

/// Structured file formats understood by the decode facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Toml,
    /// Pick the format from the file extension.
    Auto,
}

impl Format {
    /// Formats that receive injected annotations on a shadow type.
    pub const SUPPORTED: [Format; 3] = [Format::Json, Format::Yaml, Format::Toml];

    /// Annotation key holding this format's field name.
    pub fn annotation_key(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Auto => "auto",
        }
    }

    /// Detect a format from a file extension (case-insensitive).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "yml" | "yaml" => Some(Format::Yaml),
            "json" | "js" => Some(Format::Json),
            "toml" | "tml" => Some(Format::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.annotation_key())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "auto" => Ok(Format::Auto),
            other => Err(format!("unknown config format: {}", other)),
        }
    }
}

/// Primitive leaf categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Char,
    String,
}

impl ScalarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Char => "char",
            ScalarKind::String => "string",
        }
    }
}

/// The declared shape of a field's type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A primitive value.
    Scalar(ScalarKind),
    /// A leaf type with its own text encoding (`FromStr` + `Display`).
    Text(&'static str),
    /// A nested record.
    Record(Arc<RecordType>),
    /// A dynamic collection (`len == None`) or fixed-size array.
    List { elem: Box<Shape>, len: Option<usize> },
    /// A field that is declared but not addressable.
    Opaque,
}

impl Shape {
    pub fn is_record(&self) -> bool {
        matches!(self, Shape::Record(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Shape::List { .. })
    }

    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match self {
            Shape::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Whether a value of this shape can be parsed from flat text.
    pub fn is_textual(&self) -> bool {
        match self {
            Shape::Scalar(_) | Shape::Text(_) => true,
            Shape::Record(record) => record.textual,
            Shape::List { .. } | Shape::Opaque => false,
        }
    }

    /// Human readable type name used in help text and error messages.
    pub fn type_name(&self) -> String {
        match self {
            Shape::Scalar(kind) => kind.as_str().to_string(),
            Shape::Text(name) => (*name).to_string(),
            Shape::Record(record) => format!("{} record", record.name),
            Shape::List { elem, len: None } => format!("{} list", elem.type_name()),
            Shape::List {
                elem,
                len: Some(len),
            } => format!("{} array[{}]", elem.type_name(), len),
            Shape::Opaque => "opaque".to_string(),
        }
    }
}

/// Key/value metadata attached to a field.
///
/// Order is preserved; lookups return the first entry for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations(Vec<(String, String)>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append an annotation, keeping any earlier entry for the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Replace the first entry for `key`, or append one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Public name from the rename annotation, if it sets a non-empty one.
    pub fn override_name(&self) -> Option<&str> {
        let raw = self.get(RENAME_KEY)?;
        let name = raw.split(';').next().unwrap_or_default();
        (!name.is_empty()).then_some(name)
    }

    /// Whether the rename annotation marks the field as sensitive.
    pub fn is_sensitive(&self) -> bool {
        self.get(RENAME_KEY)
            .and_then(|raw| raw.split(';').nth(1))
            .is_some_and(|flag| flag.trim() == SENSITIVE_KEYWORD)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(DESCRIPTION_KEY)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Annotations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Declared identifier.
    pub ident: &'static str,
    pub shape: Shape,
    pub annotations: Annotations,
}

impl FieldDescriptor {
    pub fn is_accessible(&self) -> bool {
        !matches!(self.shape, Shape::Opaque)
    }

    /// Override name if one is set, otherwise the declared identifier.
    pub fn public_name(&self) -> &str {
        self.annotations.override_name().unwrap_or(self.ident)
    }

    /// Name this field is matched by in documents of `format`.
    ///
    /// Returns `None` when the format annotation is `-`. Options after a
    /// comma (`name,omitempty`) are ignored; an empty name falls back to
    /// [`public_name`](Self::public_name).
    pub fn format_name(&self, format: Format) -> Option<&str> {
        let Some(raw) = self.annotations.get(format.annotation_key()) else {
            return Some(self.public_name());
        };
        let name = raw.split(',').next().unwrap_or_default().trim();
        match name {
            "-" => None,
            "" => Some(self.public_name()),
            name => Some(name),
        }
    }
}

/// Descriptor of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
    /// The record can also be parsed from a single text value.
    pub textual: bool,
}

impl RecordType {
    pub fn field_index(&self, ident: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.ident == ident)
    }

    pub fn field(&self, ident: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.ident == ident)
    }
}

/// A dynamically typed value moving between a shadow instance and a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// Field values by declaration index; `None` for fields that were not set.
    Record(Vec<Option<Value>>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Record(slots) => {
                f.write_str("{")?;
                let mut first = true;
                for (i, slot) in slots.iter().enumerate() {
                    if let Some(value) = slot {
                        if !first {
                            f.write_str(", ")?;
                        }
                        first = false;
                        write!(f, "{}: {}", i, value)?;
                    }
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(pairs: &[(&str, &str)]) -> Annotations {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_override_name_first_segment() {
        let a = annotated(&[(RENAME_KEY, "db_password;sensitive")]);
        assert_eq!(a.override_name(), Some("db_password"));
        assert!(a.is_sensitive());
    }

    #[test]
    fn test_empty_override_keeps_identifier() {
        let a = annotated(&[(RENAME_KEY, ";sensitive")]);
        assert_eq!(a.override_name(), None);
        assert!(a.is_sensitive());

        let field = FieldDescriptor {
            ident: "password",
            shape: Shape::Scalar(ScalarKind::String),
            annotations: a,
        };
        assert_eq!(field.public_name(), "password");
    }

    #[test]
    fn test_sensitive_requires_keyword() {
        assert!(!annotated(&[(RENAME_KEY, "token;secret")]).is_sensitive());
        assert!(!annotated(&[(RENAME_KEY, "token")]).is_sensitive());
        assert!(annotated(&[(RENAME_KEY, "token; sensitive ")]).is_sensitive());
    }

    #[test]
    fn test_first_annotation_wins() {
        let mut a = annotated(&[("json", "first")]);
        a.push("json", "second");
        assert_eq!(a.get("json"), Some("first"));

        a.set("json", "replaced");
        assert_eq!(a.get("json"), Some("replaced"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_format_name_options_and_skip() {
        let field = |value: &str| FieldDescriptor {
            ident: "port",
            shape: Shape::Scalar(ScalarKind::UInt),
            annotations: annotated(&[("json", value)]),
        };
        assert_eq!(field("listen_port,omitempty").format_name(Format::Json), Some("listen_port"));
        assert_eq!(field(",omitempty").format_name(Format::Json), Some("port"));
        assert_eq!(field("-").format_name(Format::Json), None);
        assert_eq!(field("-").format_name(Format::Yaml), Some("port"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension(Path::new("a.YAML")), Some(Format::Yaml));
        assert_eq!(Format::from_extension(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_extension(Path::new("a.js")), Some(Format::Json));
        assert_eq!(Format::from_extension(Path::new("a.tml")), Some(Format::Toml));
        assert_eq!(Format::from_extension(Path::new("a.ini")), None);
        assert_eq!(Format::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("YML".parse::<Format>(), Ok(Format::Yaml));
        assert!("xml".parse::<Format>().is_err());
        assert_eq!(Format::Toml.to_string(), "toml");
    }

    #[test]
    fn test_shape_type_names() {
        let list = Shape::List {
            elem: Box::new(Shape::Scalar(ScalarKind::String)),
            len: None,
        };
        assert_eq!(list.type_name(), "string list");
        let array = Shape::List {
            elem: Box::new(Shape::Scalar(ScalarKind::Int)),
            len: Some(3),
        };
        assert_eq!(array.type_name(), "int array[3]");
    }

    #[test]
    fn test_value_display() {
        let v = Value::List(vec![Value::String("a".into()), Value::Int(-2)]);
        assert_eq!(v.to_string(), "[a, -2]");
        let r = Value::Record(vec![None, Some(Value::Bool(true))]);
        assert_eq!(r.to_string(), "{1: true}");
    }
}
