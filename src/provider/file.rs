//! YAML and JSON file provider.

use super::merge::{deep_merge, deep_merge_all, lookup};
use super::{Provider, RawValue};
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider reading keys from one or more configuration files.
///
/// Files are merged in load order, later files winning. Dotted keys walk
/// nested mappings, so `database.url` reads
///
/// ```yaml
/// database:
///   url: postgres://db
/// ```
#[derive(Debug, Clone)]
pub struct FileProvider {
    document: Value,
    paths: Vec<PathBuf>,
}

impl FileProvider {
    pub fn from_document(document: Value) -> Self {
        Self {
            document,
            paths: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_all([path])
    }

    pub fn load_all<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        let documents = paths
            .iter()
            .map(|path| read_document(path))
            .collect::<Result<Vec<_>>>()?;

        debug!(files = paths.len(), "Loaded config files");
        Ok(Self {
            document: deep_merge_all(documents),
            paths,
        })
    }

    /// Merge another file on top of the loaded ones.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let document = read_document(path)?;
        let base = std::mem::take(&mut self.document);
        self.document = deep_merge(base, document);
        self.paths.push(path.to_path_buf());
        debug!(path = %path.display(), "Loaded config file");
        Ok(())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_document(path, &content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_document(path: &Path, content: &str) -> Result<Value> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Provider for FileProvider {
    fn retrieve(&self, key: &str) -> Result<Option<RawValue>> {
        Ok(match lookup(&self.document, key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(RawValue::Text(text.clone())),
            Some(value) => Some(RawValue::Structured(value.clone())),
        })
    }

    fn name(&self) -> &str {
        "file"
    }

    fn priority(&self) -> i32 {
        3
    }
}
