//! confbind: bind one record type from config files, environment variables
//! and command-line flags.
//!
//! A record is declared once with [`record!`], which builds a cached
//! descriptor of its fields. Every source walks that descriptor:
//!
//! - files are decoded into a shadow instance whose field names match under
//!   JSON, YAML and TOML alike, then transplanted onto the record
//! - environment variables and flags are named after each field's resolved
//!   path and parsed from text
//!
//! ```no_run
//! use confbind::{Loader, record};
//!
//! #[derive(Debug, Default)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! record!(Server {
//!     host { confy: "hostname" },
//!     port,
//! });
//!
//! let loaded = Loader::defaults("server.yaml").load::<Server>()?;
//! println!("{:?}", loaded.value);
//! # Ok::<(), confbind::BindError>(())
//! ```

pub mod decode;
pub mod error;
pub mod loader;
pub mod names;
pub mod reflect;
pub mod shadow;
pub mod sources;
pub mod transplant;
pub mod types;
pub mod walk;

pub use error::{BindError, DecodeError, Diagnostic, DiagnosticKind, Mismatch, SchemaError};
pub use loader::{
    Loaded, Loader, generated_cli_flags, generated_env_names, load_cli, load_env, load_file,
};
pub use names::{ResolvedName, Transform, redact, resolve_name};
pub use reflect::{Record, RecordBuilder, Reflect, Schema, Shaped};
pub use shadow::{ShadowRecord, instantiate, synthesize};
pub use sources::{CliSource, EnvSource, FileSource, Source};
pub use types::{Annotations, FieldDescriptor, Format, RecordType, ScalarKind, Shape, Value};
pub use walk::{FieldEntry, walk, walk_with_skipped};
