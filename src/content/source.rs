use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::records::{CategoryRecord, Dataset, NodeRecord};

/// The content endpoints the graph is built from.
pub trait DataSource {
    fn fetch_nodes(&self) -> Result<Vec<NodeRecord>>;
    fn fetch_categories(&self) -> Result<Vec<CategoryRecord>>;
    fn describe(&self) -> String;
}

#[derive(Clone, Debug)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub const NODES_FILE: &'static str = "nodes.json";
    pub const CATEGORIES_FILE: &'static str = "categories.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DataSource for JsonDirSource {
    fn fetch_nodes(&self) -> Result<Vec<NodeRecord>> {
        let path = self.dir.join(Self::NODES_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read node list from {}", path.display()))?;
        parse_listing(&raw, "nodes")
            .with_context(|| format!("failed to parse node list in {}", path.display()))
    }

    fn fetch_categories(&self) -> Result<Vec<CategoryRecord>> {
        let path = self.dir.join(Self::CATEGORIES_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read categories from {}", path.display()))?;
        parse_listing(&raw, "categories")
            .with_context(|| format!("failed to parse categories in {}", path.display()))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Accepts either a bare array or an object wrapping the array under `key`.
fn parse_listing<T: DeserializeOwned>(raw: &str, key: &str) -> Result<Vec<T>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON")?;
    let listing = match parsed {
        Value::Array(_) => parsed,
        Value::Object(mut object) => object
            .remove(key)
            .ok_or_else(|| anyhow!("expected an array or an object with a `{key}` array"))?,
        _ => return Err(anyhow!("unexpected JSON type for `{key}` listing")),
    };

    serde_json::from_value(listing).with_context(|| format!("invalid `{key}` entries"))
}

pub fn load_dataset(source: &dyn DataSource) -> Result<Dataset> {
    let categories = source
        .fetch_categories()
        .with_context(|| format!("failed to fetch categories from {}", source.describe()))?;
    let mut nodes = source
        .fetch_nodes()
        .with_context(|| format!("failed to fetch nodes from {}", source.describe()))?;

    nodes.sort_by_key(|node| node.id);
    let before = nodes.len();
    nodes.dedup_by_key(|node| node.id);
    if nodes.len() != before {
        tracing::warn!(
            dropped = before - nodes.len(),
            "duplicate node ids in data source; keeping the first of each"
        );
    }

    Ok(Dataset { nodes, categories })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_load_dataset_accepts_wrapped_and_bare_listings() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            JsonDirSource::NODES_FILE,
            r#"{"nodes": [{"id": 2, "title": "b"}, {"id": 1, "title": "a", "categories": [5]}]}"#,
        );
        write(
            dir.path(),
            JsonDirSource::CATEGORIES_FILE,
            r##"[{"id": 5, "name": "Ocean", "slug": "ocean", "color": "#2266aa"}]"##,
        );

        let dataset = load_dataset(&JsonDirSource::new(dir.path())).unwrap();

        assert_eq!(dataset.nodes.len(), 2);
        assert_eq!(dataset.nodes[0].id, 1);
        assert_eq!(dataset.nodes[0].categories, vec![5]);
        assert_eq!(dataset.categories[0].slug, "ocean");
    }

    #[test]
    fn test_missing_source_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_dataset(&JsonDirSource::new(dir.path().join("absent"))).unwrap_err();
        assert!(format!("{error:#}").contains("categories"));
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            JsonDirSource::NODES_FILE,
            r#"[{"id": 1, "title": "first"}, {"id": 1, "title": "second"}]"#,
        );
        write(dir.path(), JsonDirSource::CATEGORIES_FILE, "[]");

        let dataset = load_dataset(&JsonDirSource::new(dir.path())).unwrap();
        assert_eq!(dataset.nodes.len(), 1);
        assert_eq!(dataset.nodes[0].title, "first");
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        assert!(parse_listing::<CategoryRecord>("42", "categories").is_err());
        assert!(parse_listing::<CategoryRecord>(r#"{"other": []}"#, "categories").is_err());
    }
}
