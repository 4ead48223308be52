mod persist;
mod records;
mod source;

pub use persist::{JsonFilePositionStore, PositionRecord, PositionStore, apply_positions, read_positions};
pub use records::{CategoryId, CategoryRecord, Dataset, NodeId, NodeKind, NodeRecord, PriorityLevel};
pub use source::{DataSource, JsonDirSource, load_dataset};
