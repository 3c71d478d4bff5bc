//! Structured error types for configuration runs.

use crate::value::StorageError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stage of a configuration run in which an error originated.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validate,
    Build,
    Wire,
    Resolve,
    Hooks,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Validate => write!(f, "validate"),
            Phase::Build => write!(f, "build"),
            Phase::Wire => write!(f, "wire"),
            Phase::Resolve => write!(f, "resolve"),
            Phase::Hooks => write!(f, "hooks"),
        }
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors
    InputShape,
    Unaddressable,
    InvalidEmptyKey,

    // Wiring errors
    DuplicateInjectionSource,
    UndefinedInjectionSource,
    InjectionTypeMismatch,
    NonShareableInjectionSource,
    CyclicDependency,

    // Binding errors
    MissingConfigurationValue,
    ParseFailure,
    NoParserForType,
    ProviderFailure,

    // Pipeline errors
    StorageFailure,
    HookExecution,
}

/// Error raised by a configuration run.
///
/// Every variant carries the path of the field it originated from, except
/// `InputShape` (raised before any field exists) and `CyclicDependency`
/// (which carries the whole cycle instead).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("expected a composite record, {type_name} given")]
    InputShape { type_name: &'static str },

    #[error("cannot address {type_name} for path {path}")]
    Unaddressable {
        path: String,
        type_name: &'static str,
        phase: Phase,
    },

    #[error("invalid empty {tag} for field {path}")]
    InvalidEmptyKey { path: String, tag: &'static str },

    #[error("injection source key {key} already defined at path {existing}, redefined at {path}")]
    DuplicateInjectionSource {
        key: String,
        path: String,
        existing: String,
    },

    #[error("injection source key {key} undefined for path {path}")]
    UndefinedInjectionSource { key: String, path: String },

    #[error("cannot inject {source_type} from {source_path} into {target_type} for field {path}")]
    InjectionTypeMismatch {
        path: String,
        source_path: String,
        source_type: &'static str,
        target_type: &'static str,
    },

    #[error("cannot use {type_name} defined at path {path} as an injection source: value cannot be shared")]
    NonShareableInjectionSource {
        path: String,
        type_name: &'static str,
    },

    #[error("cycle detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("configuring field {path}: missing key {key}")]
    MissingConfigurationValue { path: String, key: String },

    #[error("configuring field {path}: parsing value for key {key}: unable to parse {type_name}: {reason}")]
    ParseFailure {
        path: String,
        key: String,
        type_name: &'static str,
        reason: String,
    },

    #[error("configuring field {path}: no parser for type {type_name}")]
    NoParserForType {
        path: String,
        type_name: &'static str,
    },

    #[error("configuring field {path}: retrieving key {key} from provider {provider}: {source}")]
    Provider {
        path: String,
        key: String,
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("accessing storage of field {path}: {source}")]
    Storage {
        path: String,
        phase: Phase,
        #[source]
        source: StorageError,
    },

    #[error("executing hook {phase} on field {path}: {source}")]
    HookExecution {
        path: String,
        phase: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ConfigError {
    /// Map a storage failure at `path` during `phase` to the matching error.
    ///
    /// Shared storage is reported as `Unaddressable`, everything else as
    /// `Storage`.
    pub fn storage(phase: Phase, path: impl Into<String>, source: StorageError) -> Self {
        match source {
            StorageError::Shared { type_name } => ConfigError::Unaddressable {
                path: path.into(),
                type_name,
                phase,
            },
            source => ConfigError::Storage {
                path: path.into(),
                phase,
                source,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::InputShape { .. } => ErrorCode::InputShape,
            ConfigError::Unaddressable { .. } => ErrorCode::Unaddressable,
            ConfigError::InvalidEmptyKey { .. } => ErrorCode::InvalidEmptyKey,
            ConfigError::DuplicateInjectionSource { .. } => ErrorCode::DuplicateInjectionSource,
            ConfigError::UndefinedInjectionSource { .. } => ErrorCode::UndefinedInjectionSource,
            ConfigError::InjectionTypeMismatch { .. } => ErrorCode::InjectionTypeMismatch,
            ConfigError::NonShareableInjectionSource { .. } => {
                ErrorCode::NonShareableInjectionSource
            }
            ConfigError::CyclicDependency { .. } => ErrorCode::CyclicDependency,
            ConfigError::MissingConfigurationValue { .. } => ErrorCode::MissingConfigurationValue,
            ConfigError::ParseFailure { .. } => ErrorCode::ParseFailure,
            ConfigError::NoParserForType { .. } => ErrorCode::NoParserForType,
            ConfigError::Provider { .. } => ErrorCode::ProviderFailure,
            ConfigError::Storage { .. } => ErrorCode::StorageFailure,
            ConfigError::HookExecution { .. } => ErrorCode::HookExecution,
        }
    }

    /// Phase of the run in which the error was raised.
    pub fn phase(&self) -> Phase {
        match self {
            ConfigError::InputShape { .. } => Phase::Validate,
            ConfigError::Unaddressable { phase, .. } | ConfigError::Storage { phase, .. } => *phase,
            ConfigError::InvalidEmptyKey { .. } => Phase::Build,
            ConfigError::DuplicateInjectionSource { .. }
            | ConfigError::UndefinedInjectionSource { .. }
            | ConfigError::InjectionTypeMismatch { .. }
            | ConfigError::NonShareableInjectionSource { .. } => Phase::Wire,
            ConfigError::CyclicDependency { .. } => Phase::Resolve,
            ConfigError::MissingConfigurationValue { .. }
            | ConfigError::ParseFailure { .. }
            | ConfigError::NoParserForType { .. }
            | ConfigError::Provider { .. }
            | ConfigError::HookExecution { .. } => Phase::Hooks,
        }
    }

    /// Path of the field the error originated from, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ConfigError::InputShape { .. } | ConfigError::CyclicDependency { .. } => None,
            ConfigError::Unaddressable { path, .. }
            | ConfigError::InvalidEmptyKey { path, .. }
            | ConfigError::DuplicateInjectionSource { path, .. }
            | ConfigError::UndefinedInjectionSource { path, .. }
            | ConfigError::InjectionTypeMismatch { path, .. }
            | ConfigError::NonShareableInjectionSource { path, .. }
            | ConfigError::MissingConfigurationValue { path, .. }
            | ConfigError::ParseFailure { path, .. }
            | ConfigError::NoParserForType { path, .. }
            | ConfigError::Provider { path, .. }
            | ConfigError::Storage { path, .. }
            | ConfigError::HookExecution { path, .. } => Some(path),
        }
    }

    /// The error a hook failed with, when it was itself a `ConfigError`.
    ///
    /// Built-in hooks (binding, injection, initialization) report their
    /// failures as `ConfigError`s wrapped in `HookExecution`.
    pub fn hook_cause(&self) -> Option<&ConfigError> {
        match self {
            ConfigError::HookExecution { source, .. } => source.downcast_ref::<ConfigError>(),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::DuplicateInjectionSource).unwrap();
        assert_eq!(json, "\"DUPLICATE_INJECTION_SOURCE\"");

        let json = serde_json::to_string(&Phase::Resolve).unwrap();
        assert_eq!(json, "\"resolve\"");
    }

    #[test]
    fn test_cycle_message() {
        let err = ConfigError::CyclicDependency {
            cycle: vec!["A".into(), "B".into(), "C".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cycle detected: A -> B -> C -> A");
        assert_eq!(err.phase(), Phase::Resolve);
        assert_eq!(err.path(), None);
    }

    #[test]
    fn test_shared_storage_is_unaddressable() {
        let err = ConfigError::storage(
            Phase::Build,
            "$.db",
            StorageError::Shared { type_name: "Arc<Db>" },
        );
        assert_eq!(err.code(), ErrorCode::Unaddressable);
        assert_eq!(err.path(), Some("$.db"));
        assert_eq!(err.phase(), Phase::Build);

        let err = ConfigError::storage(
            Phase::Wire,
            "$.db",
            StorageError::Nil { type_name: "Option<Db>" },
        );
        assert_eq!(err.code(), ErrorCode::StorageFailure);
        assert_eq!(err.phase(), Phase::Wire);
    }

    #[test]
    fn test_hook_cause_downcast() {
        let inner = ConfigError::MissingConfigurationValue {
            path: "$.workers".into(),
            key: "workers".into(),
        };
        let err = ConfigError::HookExecution {
            path: "$.workers".into(),
            phase: "bind".into(),
            source: inner.into(),
        };
        assert!(err.to_string().starts_with("executing hook bind on field $.workers"));
        assert!(matches!(
            err.hook_cause(),
            Some(ConfigError::MissingConfigurationValue { .. })
        ));
    }
}
