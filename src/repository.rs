//! Providers and parsers, and the hook binding configuration values.

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult};
use crate::field::FieldRef;
use crate::parser::{ParseError, Parser};
use crate::processor::Hook;
use crate::provider::{Provider, RawValue};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Provider name recorded when a field falls back to its default literal.
pub const DEFAULT_PROVIDER: &str = "default";

/// A value found by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub value: RawValue,
    pub provider: String,
}

/// A provider failed while looking up a key.
#[derive(Debug, thiserror::Error)]
#[error("provider {provider}: {source}")]
pub struct ProviderError {
    pub provider: String,
    #[source]
    pub source: anyhow::Error,
}

/// Ordered providers and parsers.
///
/// Providers are consulted by ascending priority, ties in registration
/// order. Parsers are tried in registration order.
#[derive(Default)]
pub struct Repository {
    providers: Vec<Arc<dyn Provider>>,
    parsers: Vec<Arc<dyn Parser>>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: impl Provider + 'static) {
        self.add_shared_provider(Arc::new(provider));
    }

    pub fn add_shared_provider(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.priority());
    }

    pub fn add_parser(&mut self, parser: impl Parser + 'static) {
        self.parsers.push(Arc::new(parser));
    }

    pub fn add_parsers(&mut self, parsers: impl IntoIterator<Item = Arc<dyn Parser>>) {
        self.parsers.extend(parsers);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// First value found for `key`, by provider priority.
    pub fn retrieve(&self, key: &str) -> Result<Option<Retrieved>, ProviderError> {
        for provider in &self.providers {
            let found = provider.retrieve(key).map_err(|source| ProviderError {
                provider: provider.name().to_string(),
                source,
            })?;
            if let Some(value) = found {
                return Ok(Some(Retrieved {
                    value,
                    provider: provider.name().to_string(),
                }));
            }
        }
        Ok(None)
    }

    /// Write `raw` into `target` with the first parser handling its type.
    pub fn parse(&self, raw: &RawValue, target: &mut dyn Value) -> Result<(), ParseError> {
        for parser in &self.parsers {
            match parser.parse(raw, target) {
                Err(ParseError::NotParseable) => continue,
                other => return other,
            }
        }

        let type_name = target.type_info().name();
        warn!(type_name, "No parser accepted value");
        Err(ParseError::NoParser { type_name })
    }

    /// Bind the value of a configurable field.
    ///
    /// Without a value from any provider, the default literal is used. A
    /// field with neither is an error.
    pub fn bind(&self, field: &mut FieldRef<'_>) -> ConfigResult<()> {
        let Some(key) = field.configuration_key().map(str::to_string) else {
            return Ok(());
        };
        let path = field.path().to_string();

        let retrieved = self
            .retrieve(&key)
            .map_err(|e| ConfigError::Provider {
                path: path.clone(),
                key: key.clone(),
                provider: e.provider,
                source: e.source,
            })?;

        let (raw, provider) = match retrieved {
            Some(Retrieved { value, provider }) => (value, provider),
            None => match field.tags().default {
                Some(default) => (RawValue::from(default), DEFAULT_PROVIDER.to_string()),
                None => {
                    return Err(ConfigError::MissingConfigurationValue { path, key });
                }
            },
        };
        trace!(path = %path, key = %key, provider = %provider, "Binding value");

        let target_type = field.field().target_type().name();
        let target = field.target()?;
        self.parse(&raw, target).map_err(|e| match e {
            ParseError::NoParser { type_name } => ConfigError::NoParserForType {
                path: path.clone(),
                type_name,
            },
            ParseError::Invalid { type_name, source } => ConfigError::ParseFailure {
                path: path.clone(),
                key: key.clone(),
                type_name,
                reason: source.to_string(),
            },
            ParseError::NotParseable => ConfigError::NoParserForType {
                path: path.clone(),
                type_name: target_type,
            },
        })?;

        debug!(key = %key, provider = %provider, "Bound configuration key");
        field.set_provider(provider);
        Ok(())
    }
}

impl Hook for Repository {
    fn name(&self) -> &str {
        "bind"
    }

    fn call(&self, _ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()> {
        Ok(self.bind(field)?)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("providers", &self.provider_names())
            .field("parsers", &self.parsers.len())
            .finish()
    }
}
