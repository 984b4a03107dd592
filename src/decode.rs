//! Multi-format decode facade.
//!
//! Bytes are parsed with `serde_json`, `serde_yaml` or `toml` and converted
//! into one format-neutral node tree, then matched key by key against the
//! per-format names of a shadow type. Floats keep their exact value,
//! infinities and NaN included.

use crate::error::DecodeError;
use crate::shadow::{ShadowRecord, ShadowSlot};
use crate::types::{Format, RecordType, ScalarKind, Shape, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Resolve [`Format::Auto`] from the file extension of `path`.
pub fn resolve_format(path: &Path, format: Format) -> Result<Format, DecodeError> {
    if format != Format::Auto {
        return Ok(format);
    }
    Format::from_extension(path).ok_or_else(|| DecodeError::UnsupportedExtension {
        extension: path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

/// Decode `bytes` in `format` into a fresh instance of `shadow`.
///
/// With `strict`, a document key matching no field is an
/// [`UnknownField`](DecodeError::UnknownField) error; otherwise it is ignored.
/// An empty document yields an instance with nothing set.
pub fn decode(
    bytes: &[u8],
    format: Format,
    strict: bool,
    shadow: &Arc<RecordType>,
) -> Result<ShadowRecord, DecodeError> {
    let document = parse_document(bytes, format)?;
    let mut instance = ShadowRecord::empty(shadow.clone());

    let root = match document {
        Node::Null => return Ok(instance),
        Node::Map(entries) => entries,
        other => {
            return Err(DecodeError::Parse {
                format,
                message: format!("expected a mapping at the document root, found {}", other.kind()),
            });
        }
    };

    let decoder = Decoder { format, strict };
    decoder.fill(&mut instance, &root, "")?;
    Ok(instance)
}

/// Format-neutral document node.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Seq(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) | Node::UInt(_) | Node::Float(_) => "number",
            Node::String(_) => "string",
            Node::Seq(_) => "sequence",
            Node::Map(_) => "mapping",
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Node::Null,
            Json::Bool(b) => Node::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Node::Int(i),
                (None, Some(u), _) => Node::UInt(u),
                (None, None, Some(f)) => Node::Float(f),
                _ => Node::String(n.to_string()),
            },
            Json::String(text) => Node::String(text),
            Json::Array(items) => Node::Seq(items.into_iter().map(Node::from_json).collect()),
            Json::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, Node::from_json(v))).collect()),
        }
    }

    fn from_yaml(value: serde_yaml::Value) -> Result<Self, String> {
        use serde_yaml::Value as Yaml;
        Ok(match value {
            Yaml::Null => Node::Null,
            Yaml::Bool(b) => Node::Bool(b),
            Yaml::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Node::Int(i),
                (None, Some(u), _) => Node::UInt(u),
                (None, None, Some(f)) => Node::Float(f),
                _ => return Err(format!("unrepresentable number {}", n)),
            },
            Yaml::String(text) => Node::String(text),
            Yaml::Sequence(items) => Node::Seq(items.into_iter().map(Node::from_yaml).collect::<Result<_, _>>()?),
            Yaml::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    entries.push((yaml_key(key)?, Node::from_yaml(value)?));
                }
                Node::Map(entries)
            }
            Yaml::Tagged(tagged) => Node::from_yaml(tagged.value)?,
        })
    }

    fn from_toml(value: toml::Value) -> Self {
        use toml::Value as Toml;
        match value {
            Toml::String(text) => Node::String(text),
            Toml::Integer(i) => Node::Int(i),
            Toml::Float(f) => Node::Float(f),
            Toml::Boolean(b) => Node::Bool(b),
            Toml::Datetime(datetime) => Node::String(datetime.to_string()),
            Toml::Array(items) => Node::Seq(items.into_iter().map(Node::from_toml).collect()),
            Toml::Table(table) => Node::Map(table.into_iter().map(|(k, v)| (k, Node::from_toml(v))).collect()),
        }
    }
}

/// Scalar YAML keys are matched by their text; compound keys cannot name a field.
fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(text) => Ok(text),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => Err("mapping keys must be scalars".to_string()),
    }
}

fn parse_document(bytes: &[u8], format: Format) -> Result<Node, DecodeError> {
    let parse_error = |message: String| DecodeError::Parse { format, message };

    let text = std::str::from_utf8(bytes).map_err(|err| parse_error(err.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Node::Null);
    }

    match format {
        Format::Json => serde_json::from_str(text)
            .map(Node::from_json)
            .map_err(|err| parse_error(err.to_string())),
        Format::Yaml => {
            let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|err| parse_error(err.to_string()))?;
            Node::from_yaml(value).map_err(parse_error)
        }
        Format::Toml => toml::from_str::<toml::Table>(text)
            .map(|table| Node::from_toml(toml::Value::Table(table)))
            .map_err(|err| parse_error(err.to_string())),
        Format::Auto => Err(parse_error("format must be resolved before decoding".to_string())),
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

struct Decoder {
    format: Format,
    strict: bool,
}

impl Decoder {
    fn mismatch(&self, path: &str, expected: impl Into<String>, found: &Node) -> DecodeError {
        DecodeError::TypeMismatch {
            format: self.format,
            path: path.to_string(),
            expected: expected.into(),
            found: found.kind().to_string(),
        }
    }

    fn fill(&self, instance: &mut ShadowRecord, entries: &[(String, Node)], parent: &str) -> Result<(), DecodeError> {
        let record_type = instance.record_type().clone();

        for (key, node) in entries {
            let path = join(parent, key);
            let index = record_type
                .fields
                .iter()
                .position(|field| field.is_accessible() && field.format_name(self.format) == Some(key.as_str()));

            let Some(index) = index else {
                if self.strict {
                    return Err(DecodeError::UnknownField {
                        format: self.format,
                        path,
                    });
                }
                debug!("Ignoring unknown {} field {}", self.format, path);
                continue;
            };

            let shape = &record_type.fields[index].shape;
            match instance.slot_mut(index) {
                Some(ShadowSlot::Record(nested)) => match node {
                    Node::Null => {}
                    Node::Map(inner) => self.fill(nested, inner, &path)?,
                    other => return Err(self.mismatch(&path, shape.type_name(), other)),
                },
                Some(ShadowSlot::Leaf(leaf)) => leaf.set(self.value(shape, node, &path)?),
                Some(ShadowSlot::Opaque) | None => {}
            }
        }

        Ok(())
    }

    /// Convert one document node; `None` for null.
    fn value(&self, shape: &Shape, node: &Node, path: &str) -> Result<Option<Value>, DecodeError> {
        if *node == Node::Null {
            return Ok(None);
        }
        let mismatch = || self.mismatch(path, shape.type_name(), node);

        let value = match (shape, node) {
            (Shape::Scalar(ScalarKind::Bool), Node::Bool(b)) => Value::Bool(*b),
            (Shape::Scalar(ScalarKind::Int), Node::Int(i)) => Value::Int(*i),
            (Shape::Scalar(ScalarKind::Int | ScalarKind::UInt), Node::UInt(u)) => Value::UInt(*u),
            (Shape::Scalar(ScalarKind::UInt), Node::Int(i)) => Value::UInt(u64::try_from(*i).map_err(|_| mismatch())?),
            (Shape::Scalar(ScalarKind::Float), Node::Float(f)) => Value::Float(*f),
            (Shape::Scalar(ScalarKind::Float), Node::Int(i)) => Value::Float(*i as f64),
            (Shape::Scalar(ScalarKind::Float), Node::UInt(u)) => Value::Float(*u as f64),
            (Shape::Scalar(ScalarKind::Char | ScalarKind::String) | Shape::Text(_), Node::String(text)) => {
                Value::String(text.clone())
            }
            (Shape::Record(record), Node::Map(entries)) => {
                let mut nested = ShadowRecord::empty(record.clone());
                self.fill(&mut nested, entries, path)?;
                nested.into_value()
            }
            (Shape::List { elem, len }, Node::Seq(items)) => {
                let limit = len.unwrap_or(items.len());
                if items.len() > limit {
                    debug!("Truncating {} to {} elements", path, limit);
                }
                let mut values = Vec::with_capacity(items.len().min(limit));
                for (position, item) in items.iter().take(limit).enumerate() {
                    let item_path = format!("{}[{}]", path, position);
                    let value = match (self.value(elem, item, &item_path)?, elem.as_ref()) {
                        (Some(value), _) => value,
                        (None, Shape::Record(record)) => ShadowRecord::empty(record.clone()).into_value(),
                        (None, _) => return Err(self.mismatch(&item_path, elem.type_name(), item)),
                    };
                    values.push(value);
                }
                Value::List(values)
            }
            (Shape::Opaque, _) => return Ok(None),
            _ => return Err(mismatch()),
        };

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use crate::shadow::synthesize;

    #[derive(Debug, Default)]
    struct Limits {
        max: u32,
        ratio: f64,
    }

    crate::record!(Limits {
        max { confy: "Max" },
        ratio,
    });

    #[derive(Debug, Default)]
    struct Settings {
        name: String,
        debug: bool,
        offset: i64,
        limits: Limits,
        tiers: Vec<Limits>,
        pair: [u8; 2],
        when: std::path::PathBuf,
    }

    crate::record!(Settings {
        name { confy: "app_name" },
        debug,
        offset,
        limits,
        tiers,
        pair,
        when,
    });

    fn shadow() -> Arc<RecordType> {
        synthesize(Settings::schema().record_type()).unwrap()
    }

    fn leaf(instance: &ShadowRecord, index: usize) -> Option<Value> {
        match instance.slot(index) {
            Some(ShadowSlot::Leaf(leaf)) => leaf.value().cloned(),
            _ => None,
        }
    }

    #[test]
    fn test_json_matches_override_and_identifier() {
        let bytes = br#"{"app_name": "svc", "debug": true, "offset": -3}"#;
        let instance = decode(bytes, Format::Json, true, &shadow()).unwrap();
        assert_eq!(leaf(&instance, 0), Some(Value::String("svc".into())));
        assert_eq!(leaf(&instance, 1), Some(Value::Bool(true)));
        assert_eq!(leaf(&instance, 2), Some(Value::Int(-3)));
        assert_eq!(leaf(&instance, 5), None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let bytes = br#"{"App_Name": "svc"}"#;
        let err = decode(bytes, Format::Json, true, &shadow()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownField { ref path, .. } if path == "App_Name"));

        let instance = decode(bytes, Format::Json, false, &shadow()).unwrap();
        assert!(instance.is_unset());
    }

    #[test]
    fn test_yaml_nested_and_list_of_records() {
        let yaml = "limits:\n  Max: 4\n  ratio: 0.5\ntiers:\n  - Max: 1\n  - ratio: 2\n";
        let instance = decode(yaml.as_bytes(), Format::Yaml, true, &shadow()).unwrap();

        let Some(ShadowSlot::Record(limits)) = instance.slot(3) else {
            panic!("limits should be a nested shadow");
        };
        assert_eq!(leaf(limits, 0), Some(Value::UInt(4)));
        assert_eq!(leaf(limits, 1), Some(Value::Float(0.5)));

        assert_eq!(
            leaf(&instance, 4),
            Some(Value::List(vec![
                Value::Record(vec![Some(Value::UInt(1)), None]),
                Value::Record(vec![None, Some(Value::Float(2.0))]),
            ]))
        );
    }

    #[test]
    fn test_toml_document() {
        let toml = "app_name = \"svc\"\npair = [1, 2, 3]\nwhen = 1979-05-27T07:32:00Z\n\n[limits]\nMax = 9\n";
        let instance = decode(toml.as_bytes(), Format::Toml, true, &shadow()).unwrap();
        assert_eq!(leaf(&instance, 0), Some(Value::String("svc".into())));
        assert_eq!(
            leaf(&instance, 5),
            Some(Value::List(vec![Value::UInt(1), Value::UInt(2)]))
        );
        assert_eq!(leaf(&instance, 6), Some(Value::String("1979-05-27T07:32:00Z".into())));
    }

    #[test]
    fn test_non_finite_floats_survive() {
        let yaml = "limits:\n  ratio: .inf\ntiers:\n  - ratio: -.inf\n  - ratio: .nan\n";
        let instance = decode(yaml.as_bytes(), Format::Yaml, true, &shadow()).unwrap();
        let Some(ShadowSlot::Record(limits)) = instance.slot(3) else {
            panic!("limits should be a nested shadow");
        };
        assert_eq!(leaf(limits, 1), Some(Value::Float(f64::INFINITY)));
        let Some(Value::List(tiers)) = leaf(&instance, 4) else {
            panic!("tiers should decode to a list");
        };
        assert_eq!(tiers[0], Value::Record(vec![None, Some(Value::Float(f64::NEG_INFINITY))]));
        assert!(matches!(&tiers[1], Value::Record(fields) if matches!(fields[1], Some(Value::Float(f)) if f.is_nan())));

        let toml = "[limits]\nratio = -inf\n\n[[tiers]]\nratio = nan\n";
        let instance = decode(toml.as_bytes(), Format::Toml, true, &shadow()).unwrap();
        let Some(ShadowSlot::Record(limits)) = instance.slot(3) else {
            panic!("limits should be a nested shadow");
        };
        assert_eq!(leaf(limits, 1), Some(Value::Float(f64::NEG_INFINITY)));
        assert!(matches!(
            leaf(&instance, 4),
            Some(Value::List(tiers)) if matches!(&tiers[0], Value::Record(fields) if matches!(fields[1], Some(Value::Float(f)) if f.is_nan()))
        ));
    }

    #[test]
    fn test_float_into_integer_is_mismatch() {
        let err = decode(b"offset: .inf\n", Format::Yaml, false, &shadow()).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { ref path, ref found, .. } if path == "offset" && found == "number"));
    }

    #[test]
    fn test_unknown_nested_field_path() {
        let bytes = br#"{"tiers": [{"Max": 1}, {"maxx": 2}]}"#;
        let err = decode(bytes, Format::Json, true, &shadow()).unwrap_err();
        assert_eq!(err.to_string(), "json config: unknown field \"tiers[1].maxx\"");
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let bytes = br#"{"limits": {"Max": -1}}"#;
        let err = decode(bytes, Format::Json, false, &shadow()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { ref path, ref expected, .. } if path == "limits.Max" && expected == "uint"
        ));

        let bytes = br#"{"debug": "yes"}"#;
        assert!(decode(bytes, Format::Json, false, &shadow()).is_err());
    }

    #[test]
    fn test_empty_and_null_documents() {
        for format in Format::SUPPORTED {
            let instance = decode(b"  \n", format, true, &shadow()).unwrap();
            assert!(instance.is_unset());
        }
        let instance = decode(b"~", Format::Yaml, true, &shadow()).unwrap();
        assert!(instance.is_unset());
    }

    #[test]
    fn test_null_leaf_left_unset() {
        let bytes = br#"{"app_name": null, "limits": null}"#;
        let instance = decode(bytes, Format::Json, true, &shadow()).unwrap();
        assert!(instance.is_unset());
    }

    #[test]
    fn test_malformed_and_non_mapping_documents() {
        let err = decode(b"{not json", Format::Json, false, &shadow()).unwrap_err();
        assert!(matches!(err, DecodeError::Parse { format: Format::Json, .. }));

        let err = decode(b"- a\n- b\n", Format::Yaml, false, &shadow()).unwrap_err();
        assert!(err.to_string().contains("expected a mapping"));

        assert!(decode(b"{}", Format::Auto, false, &shadow()).is_err());
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(Path::new("a.yml"), Format::Auto).unwrap(), Format::Yaml);
        assert_eq!(resolve_format(Path::new("a.yml"), Format::Json).unwrap(), Format::Json);
        let err = resolve_format(Path::new("a.ini"), Format::Auto).unwrap_err();
        assert_eq!(err.to_string(), "unsupported file extension \"ini\"");
    }
}
