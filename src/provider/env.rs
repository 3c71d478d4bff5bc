//! Environment variables provider.

use super::{Provider, RawValue};
use std::collections::HashMap;

/// Environment spelling of a configuration key: uppercased, with `.` and
/// `-` replaced by `_`.
pub fn format_env_key(key: &str) -> String {
    key.to_uppercase().replace(['.', '-'], "_")
}

/// Provider reading environment variables.
///
/// Variable names are normalized with [`format_env_key`] when captured, so
/// `database.url` is found in `DATABASE_URL`. With a prefix, only variables
/// starting with `PREFIX_` are visible and the prefix is stripped.
#[derive(Debug, Clone, Default)]
pub struct EnvProvider {
    vars: HashMap<String, String>,
    prefix: Option<String>,
}

impl EnvProvider {
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (format_env_key(key.as_ref()), value.into()))
                .collect(),
            prefix: None,
        }
    }

    /// Capture the environment of the current process.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = Some(format_env_key(prefix.as_ref()));
        self
    }

    /// Variable name looked up for `key`.
    pub fn variable(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{}", format_env_key(key)),
            None => format_env_key(key),
        }
    }
}

impl Provider for EnvProvider {
    fn retrieve(&self, key: &str) -> anyhow::Result<Option<RawValue>> {
        Ok(self.vars.get(&self.variable(key)).cloned().map(RawValue::Text))
    }

    fn name(&self) -> &str {
        "env"
    }

    fn priority(&self) -> i32 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_env_key() {
        assert_eq!(format_env_key("database.url"), "DATABASE_URL");
        assert_eq!(format_env_key("log-level"), "LOG_LEVEL");
        assert_eq!(format_env_key("http.max-body.size"), "HTTP_MAX_BODY_SIZE");
    }

    #[test]
    fn test_retrieve_normalizes_keys() {
        let env = EnvProvider::from_vars([("DATABASE_URL", "postgres://db"), ("log-level", "debug")]);

        assert_eq!(
            env.retrieve("database.url").unwrap(),
            Some(RawValue::from("postgres://db"))
        );
        assert_eq!(env.retrieve("log-level").unwrap(), Some(RawValue::from("debug")));
        assert_eq!(env.retrieve("workers").unwrap(), None);
    }

    #[test]
    fn test_prefix() {
        let env = EnvProvider::from_vars([("APP_WORKERS", "8"), ("WORKERS", "1")]).with_prefix("app");

        assert_eq!(env.variable("workers"), "APP_WORKERS");
        assert_eq!(env.retrieve("workers").unwrap(), Some(RawValue::from("8")));
    }
}
