//! Command-line flag source.

use super::root_record;
use crate::error::{BindError, Diagnostic, DiagnosticKind};
use crate::names::{Transform, generated_names, redact, resolve_name};
use crate::reflect::{Record, Reflect};
use crate::transplant::set_text_at;
use crate::types::{DEFAULT_CLI_DELIMITER, FieldDescriptor, ScalarKind, Shape};
use crate::walk::{FieldEntry, FieldPath, walk_with_skipped};
use clap::{Arg, ArgAction, Command};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Binds fields from `--<resolved name>` options.
#[derive(Debug, Clone)]
pub struct CliSource {
    delimiter: String,
    transform: Option<Transform>,
    args: Option<Vec<String>>,
    command: Option<Command>,
}

impl Default for CliSource {
    fn default() -> Self {
        Self::new(DEFAULT_CLI_DELIMITER)
    }
}

struct BoundFlag {
    name: String,
    path: FieldPath,
    field: FieldDescriptor,
}

impl CliSource {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            transform: None,
            args: None,
            command: None,
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Parse `args` (program name first) instead of the process arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Register the generated options on an existing command.
    ///
    /// Options the command already defines are left alone.
    pub fn command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub(crate) fn or_defaults(mut self, transform: Option<&Transform>, args: Option<&Vec<String>>) -> Self {
        if self.transform.is_none() {
            self.transform = transform.cloned();
        }
        if self.args.is_none() {
            self.args = args.cloned();
        }
        self
    }

    /// Flag names (without dashes) this source registers for `T`, in walk order.
    pub fn flags<T: Record>(&self) -> Vec<String> {
        generated_names::<T>(&self.delimiter, self.transform.as_ref())
    }

    fn help_for(name: &str, path: &FieldPath, field: &FieldDescriptor) -> String {
        match field.annotations.description() {
            Some(description) => description.to_string(),
            None => format!("A {} value, {} (--{})", field.shape.type_name(), path.join("."), name),
        }
    }

    pub fn apply(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        let args = self.args.clone().unwrap_or_else(|| std::env::args().collect());
        if args.len() <= 1 {
            debug!("No command line arguments supplied, skipping flag parsing");
            return Ok(Vec::new());
        }

        let record = root_record(target)?;
        let (entries, skipped) = walk_with_skipped(true, target);
        let entries: Vec<_> = entries.into_iter().map(FieldEntry::into_parts).collect();
        let mut command = self.command.clone().unwrap_or_else(|| Command::new(record.name));
        let mut taken: HashSet<String> = command
            .get_arguments()
            .map(|arg| arg.get_id().as_str().to_string())
            .collect();
        taken.insert("help".to_string());

        let mut diagnostics: Vec<_> = skipped
            .iter()
            .map(|path| Diagnostic::new("cli", path.join("."), DiagnosticKind::Inaccessible))
            .collect();
        let mut bound = Vec::new();

        for (path, field) in entries {
            let resolved = resolve_name(&record, &path, &self.delimiter, self.transform.as_ref());
            if !resolved.bindable {
                if !field.shape.is_record() {
                    debug!("Field {} cannot be set from the command line", path.join("."));
                    diagnostics.push(Diagnostic::new("cli", path.join("."), DiagnosticKind::Unbindable));
                }
                continue;
            }
            if !taken.insert(resolved.name.clone()) {
                warn!("Flag --{} is already defined, skipping {}", resolved.name, path.join("."));
                continue;
            }

            let mut arg = Arg::new(resolved.name.clone())
                .long(resolved.name.clone())
                .help(Self::help_for(&resolved.name, &path, &field))
                .action(ArgAction::Set);
            if field.shape == Shape::Scalar(ScalarKind::Bool) {
                arg = arg.num_args(0..=1).default_missing_value("true");
            }
            command = command.arg(arg);
            bound.push(BoundFlag {
                name: resolved.name,
                path,
                field,
            });
        }

        let matches = command.try_get_matches_from(args)?;

        for flag in bound {
            let Some(raw) = matches.get_one::<String>(&flag.name) else {
                continue;
            };
            let dotted = flag.path.join(".");
            match set_text_at(target, &flag.path, raw) {
                Ok(()) => info!("Set {} from --{} = {}", dotted, flag.name, redact(raw, &flag.field.annotations)),
                Err(kind) => {
                    let kind = kind.redacted(&flag.field.annotations);
                    warn!("Unable to set {} from --{}: {}", dotted, flag.name, kind);
                    diagnostics.push(Diagnostic::new("cli", dotted, kind));
                }
            }
        }

        Ok(diagnostics)
    }
}
