//! Fieldwire
//!
//! Populate configuration records from command-line arguments, environment
//! variables and files, and wire values between their fields, driven by
//! declarative field metadata.
//!
//! A record derives [`Record`]; each member declares its configuration key,
//! default, description, and whether it publishes (`inject_as`) or receives
//! (`inject`) a shared value. A run builds the field tree of the record,
//! orders its fields so children come before parents and injection sources
//! before their targets, marks the fields a provider can set, then applies
//! every hook to every field.

extern crate self as fieldwire;

pub mod configure;
pub mod context;
pub mod error;
pub mod field;
pub mod init;
pub mod inject;
pub mod logging;
pub mod mark;
pub mod parser;
pub mod processor;
pub mod provider;
pub mod record;
pub mod repository;
pub mod resolve;
pub mod usage;
pub mod value;

pub use configure::{Fieldwire, FieldwireBuilder};
pub use context::Context;
pub use error::{ConfigError, ConfigResult, ErrorCode, Phase};
pub use field::{Field, FieldId, FieldRef, FieldTree, NodeKind};
pub use init::{Initialize, InitializeHook};
pub use inject::InjectHook;
pub use parser::{ParseError, Parser};
pub use processor::{Hook, Outcome, Plan, Processor, hook_fn, plan};
pub use provider::{ArgsProvider, EnvProvider, FileProvider, Provider, RawValue};
pub use record::{Member, Record, Tags};
pub use repository::Repository;
pub use usage::UsageMode;
pub use value::{Interface, Kind, StorageError, TypeInfo, Value};

/// Derive [`Record`] and [`Value`] for a struct with named fields.
pub use fieldwire_derive::Record;
