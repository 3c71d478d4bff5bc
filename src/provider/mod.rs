//! Sources of raw configuration values.

mod args;
mod env;
mod file;
pub mod merge;

pub use args::ArgsProvider;
pub use env::{EnvProvider, format_env_key};
pub use file::FileProvider;

use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// A raw value as supplied by a provider, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    /// A value from a structured document.
    Structured(JsonValue),
}

impl RawValue {
    /// Text form of the value. Structured strings are unquoted, other
    /// structured values are rendered as JSON.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Text(text) => Cow::Borrowed(text),
            RawValue::Structured(JsonValue::String(text)) => Cow::Borrowed(text),
            RawValue::Structured(JsonValue::Null) => Cow::Borrowed(""),
            RawValue::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Items of a list value. Text is split on commas, items are trimmed and
    /// empty items dropped.
    pub fn items(&self) -> Vec<Cow<'_, str>> {
        match self {
            RawValue::Structured(JsonValue::Array(items)) => items
                .iter()
                .map(RawValue::structured_text)
                .collect(),
            other => match other.as_text() {
                Cow::Borrowed(text) => split_list(text).map(Cow::Borrowed).collect(),
                Cow::Owned(text) => split_list(&text)
                    .map(|item| Cow::Owned(item.to_string()))
                    .collect(),
            },
        }
    }

    fn structured_text(value: &JsonValue) -> Cow<'_, str> {
        match value {
            JsonValue::String(text) => Cow::Borrowed(text),
            other => Cow::Owned(other.to_string()),
        }
    }
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|item| !item.is_empty())
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        RawValue::Text(text)
    }
}

/// An entity configuration keys can be retrieved from.
pub trait Provider: Send + Sync {
    /// Look up `key`. `Ok(None)` means the provider does not know the key.
    fn retrieve(&self, key: &str) -> anyhow::Result<Option<RawValue>>;

    fn name(&self) -> &str;

    /// Lower values are consulted first.
    fn priority(&self) -> i32;
}
