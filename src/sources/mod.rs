//! Configuration sources.
//!
//! Each source binds onto a target record in place and reports the fields it
//! had to skip. Sources are applied in order by the [`Loader`](crate::Loader).

mod cli;
mod env;
mod file;

pub use cli::CliSource;
pub use env::{EnvSource, Lookup};
pub use file::{FileSource, bind_bytes};

use crate::error::{BindError, Diagnostic, SchemaError};
use crate::reflect::Reflect;
use crate::types::{RecordType, Shape};
use std::sync::Arc;

/// One place configuration values can come from.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileSource),
    Env(EnvSource),
    Cli(CliSource),
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Env(_) => "env",
            Source::Cli(_) => "cli",
        }
    }

    pub fn apply(&self, target: &mut dyn Reflect) -> Result<Vec<Diagnostic>, BindError> {
        match self {
            Source::File(source) => source.apply(target),
            Source::Env(source) => source.apply(target),
            Source::Cli(source) => source.apply(target),
        }
    }
}

impl From<FileSource> for Source {
    fn from(source: FileSource) -> Self {
        Source::File(source)
    }
}

impl From<EnvSource> for Source {
    fn from(source: EnvSource) -> Self {
        Source::Env(source)
    }
}

impl From<CliSource> for Source {
    fn from(source: CliSource) -> Self {
        Source::Cli(source)
    }
}

fn root_record(target: &dyn Reflect) -> Result<Arc<RecordType>, SchemaError> {
    match target.shape() {
        Shape::Record(record) => Ok(record),
        other => Err(SchemaError::NotARecord {
            type_name: other.type_name(),
        }),
    }
}
