//! Command-line arguments provider.

use super::{Provider, RawValue};
use std::collections::HashMap;

/// Key of the reserved help flag.
pub const HELP_KEY: &str = "help";

/// Provider reading `--key=value`, `--key value` and bare `--flag`
/// arguments.
///
/// A bare flag, or one followed by another flag, maps to an empty string so
/// an empty flag can be told apart from a missing one.
#[derive(Debug, Clone, Default)]
pub struct ArgsProvider {
    args: HashMap<String, String>,
}

impl ArgsProvider {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut parsed = HashMap::new();

        let mut i = 0;
        while i < args.len() {
            let Some(arg) = args[i].strip_prefix("--") else {
                i += 1;
                continue;
            };

            let (key, value) = match arg.split_once('=') {
                Some((key, value)) => (key, value.to_string()),
                None => match args.get(i + 1) {
                    Some(next) if !next.starts_with("--") => {
                        i += 1;
                        (arg, next.clone())
                    }
                    _ => (arg, String::new()),
                },
            };
            parsed.insert(key.to_string(), value);
            i += 1;
        }

        Self { args: parsed }
    }

    /// Parse the arguments of the current process.
    pub fn from_env() -> Self {
        Self::parse(std::env::args())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Value of the help flag, if it was passed.
    pub fn help(&self) -> Option<String> {
        self.args.get(HELP_KEY).cloned()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl Provider for ArgsProvider {
    fn retrieve(&self, key: &str) -> anyhow::Result<Option<RawValue>> {
        Ok(self.args.get(key).cloned().map(RawValue::Text))
    }

    fn name(&self) -> &str {
        "args"
    }

    fn priority(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let args = ArgsProvider::parse([
            "prog",
            "--workers=4",
            "--name",
            "api",
            "--verbose",
            "--log",
            "stderr",
            "positional",
            "--empty=",
            "--flag",
        ]);

        assert_eq!(args.get("workers"), Some("4"));
        assert_eq!(args.get("name"), Some("api"));
        assert_eq!(args.get("verbose"), Some(""));
        assert_eq!(args.get("log"), Some("stderr"));
        assert_eq!(args.get("empty"), Some(""));
        assert_eq!(args.get("flag"), Some(""));
        assert_eq!(args.get("positional"), None);
        assert_eq!(args.get("prog"), None);
    }

    #[test]
    fn test_value_keeps_equal_signs() {
        let args = ArgsProvider::parse(["--dsn=host=db port=5432"]);
        assert_eq!(args.get("dsn"), Some("host=db port=5432"));
    }

    #[test]
    fn test_help_and_retrieve() {
        let args = ArgsProvider::parse(["--help"]);
        assert_eq!(args.help().as_deref(), Some(""));
        assert_eq!(args.retrieve("help").unwrap(), Some(RawValue::from("")));
        assert_eq!(args.retrieve("missing").unwrap(), None);
        assert_eq!(args.priority(), 1);
        assert_eq!(args.name(), "args");
    }
}
