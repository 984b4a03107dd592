//! Structured file source.

use crate::decode::{decode, resolve_format};
use crate::error::{BindError, DecodeError, Diagnostic, DiagnosticKind};
use crate::reflect::Reflect;
use crate::shadow::{instantiate, synthesize_for};
use crate::transplant::transplant_shadow;
use crate::types::Format;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{info, warn};

/// Loads a JSON, YAML or TOML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub path: PathBuf,
    /// Reject document keys that match no field.
    pub strict: bool,
    pub format: Format,
    /// A missing required file is an error; a missing optional one a diagnostic.
    pub required: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            strict: false,
            format: Format::Auto,
            required: true,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Bind the file onto `target`.
    ///
    /// Decode failures of an optional file are reported as a diagnostic and
    /// leave `target` untouched; schema errors are always returned.
    pub fn apply(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        synthesize_for(target)?;
        match self.read_and_bind(target) {
            Err(BindError::Decode(err)) if !self.required => {
                warn!("Skipping optional config file {}: {}", self.path.display(), err);
                Ok(vec![Diagnostic::new(
                    "file",
                    self.path.display().to_string(),
                    DiagnosticKind::Decode(err.to_string()),
                )])
            }
            other => other,
        }
    }

    fn read_and_bind(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        let format = resolve_format(&self.path, self.format)?;

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && !self.required => {
                info!("Optional config file {} not found, skipping", self.path.display());
                return Ok(vec![Diagnostic::new(
                    "file",
                    self.path.display().to_string(),
                    DiagnosticKind::MissingFile,
                )]);
            }
            Err(source) => {
                return Err(DecodeError::Io {
                    path: self.path.clone(),
                    source,
                }
                .into());
            }
        };

        info!("Loading {} config from {}", format, self.path.display());
        bind_bytes(target, &bytes, format, self.strict)
    }
}

/// Decode `bytes` and transplant every value they set into `target`.
///
/// The shadow type is built before anything is decoded, so schema errors
/// surface even for empty input.
pub fn bind_bytes(
    target: &mut dyn Reflect,
    bytes: &[u8],
    format: Format,
    strict: bool,
) -> Result<Vec<Diagnostic>, BindError> {
    let empty = instantiate(target)?;
    let decoded = decode(bytes, format, strict, empty.record_type())?;
    Ok(transplant_shadow(&decoded, target, "file"))
}
