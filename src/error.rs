//! Error and diagnostic types.
//!
//! Three tiers:
//! - [`SchemaError`]: the record type itself is unusable (fatal, raised before decoding)
//! - [`DecodeError`]: a source's bytes could not be decoded (fatal for a required file)
//! - [`Diagnostic`]: a single field was skipped (non-fatal, collected and returned)

use crate::types::{Annotations, Format, MASK};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The record type cannot be bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{type_name} is not a record type")]
    NotARecord { type_name: String },

    #[error("duplicate override name \"{name}\" on field {field} of {record}")]
    DuplicateName {
        record: String,
        name: String,
        field: String,
    },
}

/// A source's bytes could not be turned into a shadow instance.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension {extension:?}")]
    UnsupportedExtension { extension: String },

    #[error("failed to decode {format} config: {message}")]
    Parse { format: Format, message: String },

    #[error("{format} config: unknown field \"{path}\"")]
    UnknownField { format: Format, path: String },

    #[error("{format} config: field \"{path}\" expected {expected}, found {found}")]
    TypeMismatch {
        format: Format,
        path: String,
        expected: String,
        found: String,
    },
}

/// Terminal error of a load call.
#[derive(Debug, Error)]
pub enum BindError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("no configuration sources specified")]
    NoSources,

    #[error("{source_name}: {inner}")]
    Source {
        source_name: &'static str,
        #[source]
        inner: Box<BindError>,
    },
}

impl BindError {
    /// The underlying command-line error, e.g. to print help and exit.
    pub fn cli_error(&self) -> Option<&clap::Error> {
        match self {
            BindError::Cli(err) => Some(err),
            BindError::Source { inner, .. } => inner.cli_error(),
            _ => None,
        }
    }
}

/// A value could not be coerced into a field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct Mismatch {
    pub expected: String,
    pub found: String,
}

impl Mismatch {
    pub fn new(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Why a single field was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The path does not name a field of the target.
    FieldNotFound,
    /// The field exists but is opaque.
    Inaccessible,
    TypeMismatch(Mismatch),
    /// The field has no flat text encoding, so the source cannot carry it.
    Unbindable,
    /// An optional config file does not exist.
    MissingFile,
    /// An optional config file could not be decoded; it was skipped whole.
    Decode(String),
}

impl DiagnosticKind {
    /// Hide the offending value when the field is sensitive.
    pub fn redacted(self, annotations: &Annotations) -> Self {
        match self {
            DiagnosticKind::TypeMismatch(mismatch) if annotations.is_sensitive() => {
                DiagnosticKind::TypeMismatch(Mismatch::new(mismatch.expected, MASK))
            }
            other => other,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::FieldNotFound => f.write_str("field not found"),
            DiagnosticKind::Inaccessible => f.write_str("field is not addressable"),
            DiagnosticKind::TypeMismatch(mismatch) => write!(f, "{}", mismatch),
            DiagnosticKind::Unbindable => f.write_str("field has no text encoding"),
            DiagnosticKind::MissingFile => f.write_str("config file not found"),
            DiagnosticKind::Decode(message) => write!(f, "config file skipped: {}", message),
        }
    }
}

/// A non-fatal issue recorded while binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source that produced it (`file`, `env`, `cli`).
    pub source: &'static str,
    /// Dotted declared path, or the file path for [`DiagnosticKind::MissingFile`]
    /// and [`DiagnosticKind::Decode`].
    pub path: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(source: &'static str, path: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            source,
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.path, self.kind)
    }
}
