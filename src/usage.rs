//! Help output listing configurable keys.

use crate::field::Field;
use crate::provider::format_env_key;
use comfy_table::Table;
use comfy_table::presets::NOTHING;

/// Which spelling of each key the usage shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageMode {
    /// Command-line flags only.
    Cli,
    /// Environment variables only.
    Env,
    Both,
}

impl UsageMode {
    /// Mode selected by the value of the help flag: `cli`, `env`, anything
    /// else shows both.
    pub fn from_value(value: &str) -> Self {
        match value {
            "cli" => UsageMode::Cli,
            "env" => UsageMode::Env,
            _ => UsageMode::Both,
        }
    }
}

/// Render the usage of the configurable fields among `fields`.
///
/// Fields with a default are listed as optional, the others as required.
pub fn render_usage(mode: UsageMode, fields: &[&Field]) -> String {
    let mut options: Vec<(&str, &Field)> = fields
        .iter()
        .filter_map(|field| field.configuration_key().map(|key| (key, *field)))
        .collect();
    options.sort_by(|a, b| a.0.cmp(b.0));

    let mut required = Vec::new();
    let mut optional = Vec::new();
    for (key, field) in options {
        let mut row = Vec::with_capacity(4);
        if mode != UsageMode::Env {
            row.push(format!("--{key}"));
        }
        if mode != UsageMode::Cli {
            row.push(format_env_key(key));
        }
        row.push(field.tags().description.unwrap_or_default().to_string());

        match field.tags().default {
            Some(default) => {
                row.push(format!("({default})"));
                optional.push(row);
            }
            None => required.push(row),
        }
    }

    let mut out = String::new();
    out.push_str("\nRequired parameters:\n");
    write_table(&mut out, required);
    out.push_str("\nOptional parameters:\n");
    write_table(&mut out, optional);
    out
}

fn write_table(out: &mut String, rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    for row in rows {
        table.add_row(row);
    }
    for line in table.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use crate::processor::plan;

    #[derive(Debug, Default, Record)]
    pub struct Service {
        #[fieldwire(key = "log-level", default = "info", description = "Log verbosity")]
        pub log_level: String,
        #[fieldwire(key = "database", description = "Database settings")]
        pub database: Database,
    }

    #[derive(Debug, Default, Record)]
    pub struct Database {
        #[fieldwire(key = "url", description = "Connection URL")]
        pub url: String,
    }

    fn usage(mode: UsageMode) -> String {
        let mut service = Service::default();
        let plan = plan(&mut service).unwrap();
        let fields: Vec<&Field> = plan.fields().collect();
        render_usage(mode, &fields)
    }

    #[test]
    fn test_usage_mode_from_value() {
        assert_eq!(UsageMode::from_value("cli"), UsageMode::Cli);
        assert_eq!(UsageMode::from_value("env"), UsageMode::Env);
        assert_eq!(UsageMode::from_value(""), UsageMode::Both);
        assert_eq!(UsageMode::from_value("all"), UsageMode::Both);
    }

    /// Words of each non-empty line, ignoring column padding.
    fn words(text: &str) -> Vec<Vec<&str>> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().collect())
            .collect()
    }

    #[test]
    fn test_render_both_forms() {
        let text = usage(UsageMode::Both);
        assert_eq!(
            words(&text),
            vec![
                vec!["Required", "parameters:"],
                vec!["--database.url", "DATABASE_URL", "Connection", "URL"],
                vec!["Optional", "parameters:"],
                vec!["--log-level", "LOG_LEVEL", "Log", "verbosity", "(info)"],
            ]
        );
    }

    #[test]
    fn test_render_single_form() {
        let cli = usage(UsageMode::Cli);
        assert!(words(&cli).contains(&vec!["--database.url", "Connection", "URL"]));
        assert!(!cli.contains("DATABASE_URL"));

        let env = usage(UsageMode::Env);
        assert!(words(&env).contains(&vec!["LOG_LEVEL", "Log", "verbosity", "(info)"]));
        assert!(!env.contains("--log-level"));
    }

    #[test]
    fn test_empty_section_has_no_rows() {
        let mut database = Database::default();
        let plan = plan(&mut database).unwrap();
        let fields: Vec<&Field> = plan.fields().collect();
        let text = render_usage(UsageMode::Both, &fields);
        assert!(text.ends_with("\nOptional parameters:\n"));
    }
}
