//! Environment variable source.

use super::root_record;
use crate::error::{BindError, Diagnostic, DiagnosticKind};
use crate::names::{Transform, generated_names, redact, resolve_name};
use crate::reflect::{Record, Reflect};
use crate::transplant::set_text_at;
use crate::types::DEFAULT_ENV_DELIMITER;
use crate::walk::{FieldEntry, walk_with_skipped};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Variable lookup; the process environment unless replaced.
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Binds fields from variables named after their resolved paths.
#[derive(Clone)]
pub struct EnvSource {
    delimiter: String,
    transform: Option<Transform>,
    lookup: Option<Lookup>,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_DELIMITER)
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource")
            .field("delimiter", &self.delimiter)
            .field("transform", &self.transform)
            .field("lookup", &self.lookup.as_ref().map(|_| ".."))
            .finish()
    }
}

impl EnvSource {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            transform: None,
            lookup: None,
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Read variables through `lookup` instead of the process environment.
    pub fn lookup(mut self, lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Fill in the transform and lookup where this source has none of its own.
    pub(crate) fn or_defaults(mut self, transform: Option<&Transform>, lookup: Option<&Lookup>) -> Self {
        if self.transform.is_none() {
            self.transform = transform.cloned();
        }
        if self.lookup.is_none() {
            self.lookup = lookup.cloned();
        }
        self
    }

    /// Variable names this source reads for `T`, in walk order.
    pub fn names<T: Record>(&self) -> Vec<String> {
        generated_names::<T>(&self.delimiter, self.transform.as_ref())
    }

    fn get(&self, name: &str) -> Option<String> {
        match &self.lookup {
            Some(lookup) => lookup(name),
            None => std::env::var(name).ok(),
        }
    }

    pub fn apply(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        let record = root_record(target)?;
        let (entries, skipped) = walk_with_skipped(true, target);
        let entries: Vec<_> = entries.into_iter().map(FieldEntry::into_parts).collect();
        let mut diagnostics: Vec<_> = skipped
            .iter()
            .map(|path| Diagnostic::new("env", path.join("."), DiagnosticKind::Inaccessible))
            .collect();

        for (path, field) in entries {
            let dotted = path.join(".");
            let resolved = resolve_name(&record, &path, &self.delimiter, self.transform.as_ref());
            if !resolved.bindable {
                if !field.shape.is_record() {
                    debug!("Field {} cannot be set from the environment", dotted);
                    diagnostics.push(Diagnostic::new("env", dotted, DiagnosticKind::Unbindable));
                }
                continue;
            }

            let Some(raw) = self.get(&resolved.name).filter(|raw| !raw.is_empty()) else {
                continue;
            };

            match set_text_at(target, &path, &raw) {
                Ok(()) => info!("Set {} from ${} = {}", dotted, resolved.name, redact(&raw, &field.annotations)),
                Err(kind) => {
                    let kind = kind.redacted(&field.annotations);
                    warn!("Unable to set {} from ${}: {}", dotted, resolved.name, kind);
                    diagnostics.push(Diagnostic::new("env", dotted, kind));
                }
            }
        }

        Ok(diagnostics)
    }
}
