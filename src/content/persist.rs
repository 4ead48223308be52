use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::records::{Dataset, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
}

/// Receives node positions after a drag. Saves are fire-and-forget.
pub trait PositionStore {
    fn save(&self, record: PositionRecord);
}

/// Writes positions to a JSON file from a background thread.
pub struct JsonFilePositionStore {
    tx: Sender<PositionRecord>,
}

impl JsonFilePositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel::<PositionRecord>();

        thread::spawn(move || {
            while let Ok(record) = rx.recv() {
                if let Err(error) = write_position(&path, record) {
                    tracing::warn!(id = record.id, "failed to persist node position: {error:#}");
                }
            }
        });

        Self { tx }
    }
}

impl PositionStore for JsonFilePositionStore {
    fn save(&self, record: PositionRecord) {
        if self.tx.send(record).is_err() {
            tracing::warn!(id = record.id, "position writer has stopped; dropping save");
        }
    }
}

pub fn read_positions(path: &Path) -> Result<HashMap<NodeId, (f32, f32)>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read positions from {}", path.display()));
        }
    };

    let records: Vec<PositionRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid positions file {}", path.display()))?;

    Ok(records
        .into_iter()
        .filter(|record| record.x.is_finite() && record.y.is_finite())
        .map(|record| (record.id, (record.x, record.y)))
        .collect())
}

/// Saved positions override whatever the data source reported.
pub fn apply_positions(dataset: &mut Dataset, positions: &HashMap<NodeId, (f32, f32)>) {
    for node in &mut dataset.nodes {
        if let Some(&(x, y)) = positions.get(&node.id) {
            node.x = Some(x);
            node.y = Some(y);
        }
    }
}

fn write_position(path: &Path, record: PositionRecord) -> Result<()> {
    let mut positions = read_positions(path)?;
    positions.insert(record.id, (record.x, record.y));

    let mut records = positions
        .into_iter()
        .map(|(id, (x, y))| PositionRecord { id, x, y })
        .collect::<Vec<_>>();
    records.sort_by_key(|record| record.id);

    let encoded = serde_json::to_string_pretty(&records).context("failed to encode positions")?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, encoded)
        .with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeRecord;

    #[test]
    fn test_read_positions_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let positions = read_positions(&dir.path().join("positions.json")).unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_write_position_merges_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");

        write_position(&path, PositionRecord { id: 3, x: 1.0, y: 2.0 }).unwrap();
        write_position(&path, PositionRecord { id: 1, x: 5.0, y: 6.0 }).unwrap();
        write_position(&path, PositionRecord { id: 3, x: 7.0, y: 8.0 }).unwrap();

        let positions = read_positions(&path).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[&3], (7.0, 8.0));
        assert_eq!(positions[&1], (5.0, 6.0));
    }

    #[test]
    fn test_apply_positions_overrides_dataset() {
        let mut dataset = Dataset {
            nodes: vec![NodeRecord::new(1, "a"), NodeRecord::new(2, "b").with_position(1.0, 1.0)],
            categories: Vec::new(),
        };
        let positions = HashMap::from([(2, (40.0, 50.0))]);

        apply_positions(&mut dataset, &positions);

        assert_eq!(dataset.nodes[0].persisted_position(), None);
        assert_eq!(dataset.nodes[1].persisted_position(), Some((40.0, 50.0)));
    }
}
