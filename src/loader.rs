//! Ordered, multi-source loading.
//!
//! A [`Loader`] applies its sources one after another onto the same record.
//! Later sources override the fields they set; fields no source sets keep
//! the record's defaults.

use crate::error::{BindError, Diagnostic};
use crate::names::Transform;
use crate::reflect::{Record, Reflect};
use crate::shadow::synthesize_for;
use crate::sources::{CliSource, EnvSource, FileSource, Lookup, Source};
use crate::types::{DEFAULT_CLI_DELIMITER, DEFAULT_ENV_DELIMITER, Format};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A bound record plus everything that was skipped along the way.
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Loaded<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Builder collecting sources in precedence order (lowest first).
#[derive(Clone, Default)]
pub struct Loader {
    sources: Vec<Source>,
    transform: Option<Transform>,
    args: Option<Vec<String>>,
    lookup: Option<Lookup>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("sources", &self.sources)
            .field("transform", &self.transform)
            .field("args", &self.args)
            .field("lookup", &self.lookup.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Optional config file at `path`, then the environment, then the
    /// command line.
    pub fn defaults(path: impl Into<PathBuf>) -> Self {
        Self::new()
            .optional_file(path)
            .env(DEFAULT_ENV_DELIMITER)
            .cli(DEFAULT_CLI_DELIMITER)
    }

    /// Required config file.
    pub fn file(self, path: impl Into<PathBuf>, strict: bool, format: Format) -> Self {
        self.source(FileSource::new(path).strict(strict).format(format))
    }

    /// Config file that may be absent; lenient, format from the extension.
    pub fn optional_file(self, path: impl Into<PathBuf>) -> Self {
        self.source(FileSource::new(path).optional())
    }

    pub fn env(self, delimiter: impl Into<String>) -> Self {
        self.source(EnvSource::new(delimiter))
    }

    pub fn cli(self, delimiter: impl Into<String>) -> Self {
        self.source(CliSource::new(delimiter))
    }

    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Name transform for environment and command-line sources without their own.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Command-line arguments (program name first) for command-line sources
    /// without their own.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Variable lookup for environment sources without their own.
    pub fn env_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn prepared(&self, source: &Source) -> Source {
        match source {
            Source::File(file) => Source::File(file.clone()),
            Source::Env(env) => Source::Env(
                env.clone()
                    .or_defaults(self.transform.as_ref(), self.lookup.as_ref()),
            ),
            Source::Cli(cli) => Source::Cli(
                cli.clone()
                    .or_defaults(self.transform.as_ref(), self.args.as_ref()),
            ),
        }
    }

    /// Bind a fresh `T::default()`.
    pub fn load<T: Record>(&self) -> Result<Loaded<T>, BindError> {
        let mut value = T::default();
        let diagnostics = self.load_onto(&mut value)?;
        Ok(Loaded { value, diagnostics })
    }

    /// Bind onto an existing record, keeping values no source sets.
    ///
    /// Stops at the first failing source; fields set by earlier sources stay
    /// set.
    pub fn load_onto(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        if self.sources.is_empty() {
            return Err(BindError::NoSources);
        }
        synthesize_for(target)?;

        let mut diagnostics = Vec::new();
        for source in &self.sources {
            let source_name = source.name();
            info!("Applying {} source", source_name);
            let found = self
                .prepared(source)
                .apply(target)
                .map_err(|inner| BindError::Source {
                    source_name,
                    inner: Box::new(inner),
                })?;
            diagnostics.extend(found);
        }

        if !diagnostics.is_empty() {
            warn!("Loaded with {} skipped field(s)", diagnostics.len());
        }
        Ok(diagnostics)
    }
}

/// Load `T` from one config file.
pub fn load_file<T: Record>(path: impl Into<PathBuf>, strict: bool, format: Format) -> Result<Loaded<T>, BindError> {
    Loader::new().file(path, strict, format).load()
}

/// Load `T` from the process environment.
pub fn load_env<T: Record>(delimiter: &str) -> Result<Loaded<T>, BindError> {
    Loader::new().env(delimiter).load()
}

/// Load `T` from the process arguments.
pub fn load_cli<T: Record>(delimiter: &str) -> Result<Loaded<T>, BindError> {
    Loader::new().cli(delimiter).load()
}

/// Environment variable names [`load_env`] reads for `T`.
pub fn generated_env_names<T: Record>(delimiter: &str, transform: Option<&Transform>) -> Vec<String> {
    crate::names::generated_names::<T>(delimiter, transform)
}

/// Flag names (without dashes) [`load_cli`] registers for `T`.
pub fn generated_cli_flags<T: Record>(delimiter: &str, transform: Option<&Transform>) -> Vec<String> {
    crate::names::generated_names::<T>(delimiter, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    #[derive(Debug, Default)]
    struct Conf {
        name: String,
        port: u16,
    }

    crate::record!(Conf { name, port });

    #[derive(Debug, Default)]
    struct Clash {
        a: String,
        b: String,
    }

    crate::record!(Clash {
        a { confy: "x" },
        b { confy: "x" },
    });

    #[test]
    fn test_no_sources() {
        let err = Loader::new().load::<Conf>().unwrap_err();
        assert!(matches!(err, BindError::NoSources));
        assert_eq!(err.to_string(), "no configuration sources specified");
    }

    #[test]
    fn test_later_sources_override() {
        let loaded = Loader::new()
            .env("_")
            .cli(".")
            .env_lookup(|name| match name {
                "name" => Some("from-env".to_string()),
                "port" => Some("1".to_string()),
                _ => None,
            })
            .args(["prog", "--port", "2"])
            .load::<Conf>()
            .unwrap();
        assert_eq!(loaded.value.name, "from-env");
        assert_eq!(loaded.value.port, 2);
        assert!(loaded.diagnostics.is_empty());
    }

    #[test]
    fn test_schema_checked_before_sources() {
        let err = Loader::new()
            .optional_file("/nonexistent/confbind.yaml")
            .load::<Clash>()
            .unwrap_err();
        assert!(matches!(err, BindError::Schema(SchemaError::DuplicateName { .. })));
    }

    #[test]
    fn test_source_errors_are_named() {
        let err = Loader::new()
            .file("/nonexistent/confbind.yaml", false, Format::Auto)
            .load::<Conf>()
            .unwrap_err();
        assert!(matches!(err, BindError::Source { source_name: "file", .. }));
        assert!(err.to_string().starts_with("file: failed to open config file"));
    }

    #[test]
    fn test_defaults_order() {
        let loader = Loader::defaults("app.yaml");
        let names: Vec<_> = loader.sources().iter().map(Source::name).collect();
        assert_eq!(names, vec!["file", "env", "cli"]);
    }

    #[test]
    fn test_generated_listings() {
        assert_eq!(generated_env_names::<Conf>("_", Some(&Transform::upper())), vec!["NAME", "PORT"]);
        assert_eq!(generated_cli_flags::<Conf>(".", None), vec!["name", "port"]);
    }
}
