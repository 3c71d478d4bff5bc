//! Configurability marking.

use crate::field::{FieldId, FieldTree};
use tracing::debug;

/// Mark the maximal configurable fields of `tree` and compute their
/// configuration keys.
pub fn mark(tree: &mut FieldTree) {
    mark_field(tree, FieldId::ROOT, "");
    debug!(
        configurable = tree.iter().filter(|f| f.is_configurable()).count(),
        "Marked configurable fields"
    );
}

/// Returns whether the field or one of its descendants is configurable.
fn mark_field(tree: &mut FieldTree, id: FieldId, prefix: &str) -> bool {
    let field = tree.get(id);
    let key = field.key();

    if key.is_none() && (!field.is_anonymous() || field.children().is_empty()) {
        return false;
    }

    let prefix = match key {
        Some(key) => format!("{prefix}.{key}"),
        None => prefix.to_string(),
    };

    let children = field.children().to_vec();
    let mut configurable_children = 0;
    for child in children {
        if mark_field(tree, child, &prefix) {
            configurable_children += 1;
        }
    }

    if key.is_none() {
        return configurable_children > 0;
    }

    if configurable_children == 0 {
        let field = tree.get_mut(id);
        field.configurable = true;
        let key = prefix.strip_prefix('.').unwrap_or(&prefix);
        field.configuration_key = Some(key.to_string());
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use crate::field::build;

    #[derive(Debug, Default, Record)]
    pub struct Service {
        #[fieldwire(key = "workers")]
        pub workers: i64,
        #[fieldwire(key = "database")]
        pub database: Database,
        #[fieldwire(flatten)]
        pub limits: Limits,
        pub untagged: Database,
        #[fieldwire(key = "empty")]
        pub empty: Empty,
    }

    #[derive(Debug, Default, Record)]
    pub struct Database {
        #[fieldwire(key = "url")]
        pub url: String,
        #[fieldwire(key = "pool")]
        pub pool: Pool,
    }

    #[derive(Debug, Default, Record)]
    pub struct Pool {
        #[fieldwire(key = "size")]
        pub size: u32,
    }

    #[derive(Debug, Default, Record)]
    pub struct Limits {
        #[fieldwire(key = "rate")]
        pub rate: u32,
        #[fieldwire(key = "burst")]
        pub burst: u32,
    }

    #[derive(Debug, Default, Record)]
    pub struct Empty {
        pub note: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Dotted {
        #[fieldwire(key = ".hidden")]
        pub hidden: String,
    }

    fn keys(tree: &FieldTree) -> Vec<(&str, &str)> {
        tree.iter()
            .filter(|f| f.is_configurable())
            .map(|f| (f.path(), f.configuration_key().unwrap()))
            .collect()
    }

    #[test]
    fn test_mark_maximal_keys() {
        let mut service = Service::default();
        let mut tree = build(&mut service).unwrap();
        mark(&mut tree);

        assert_eq!(
            keys(&tree),
            vec![
                ("$.workers", "workers"),
                ("$.database.url", "database.url"),
                ("$.database.pool.size", "database.pool.size"),
                ("$.limits.rate", "rate"),
                ("$.limits.burst", "burst"),
                ("$.empty", "empty"),
            ]
        );
    }

    #[test]
    fn test_parents_and_untagged_members_are_never_marked() {
        let mut service = Service::default();
        let mut tree = build(&mut service).unwrap();
        mark(&mut tree);

        for path in ["$", "$.database", "$.limits", "$.untagged", "$.untagged.url"] {
            assert!(!tree.find(path).unwrap().is_configurable(), "{path}");
        }
    }

    #[test]
    fn test_leading_dot_in_key_is_kept() {
        let mut dotted = Dotted::default();
        let mut tree = build(&mut dotted).unwrap();
        mark(&mut tree);

        assert_eq!(keys(&tree), vec![("$.hidden", ".hidden")]);
    }
}
