//! Layer store collaborators.
//!
//! The kernel only talks to a [`LayerStore`]: it loads named layers before a
//! run and hands pheromone snapshots back during and after it. Two stores are
//! provided. [`MemoryStore`] keeps layers in a map and is what tests use.
//! [`DirectoryStore`] keeps one file per layer, either bincode with a
//! versioned header or pretty JSON.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::grid::LayerData;

/// Version number for binary layer files (increment when format changes)
const LAYER_FILE_VERSION: u32 = 1;

/// Errors that can occur while loading or saving layers
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("layer `{0}` not found in store")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layer file version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("layer `{name}` is malformed: {reason}")]
    Malformed { name: String, reason: String },
}

/// Persistent home of named layers.
pub trait LayerStore {
    fn load_layer(&mut self, name: &str) -> Result<LayerData, StoreError>;
    fn save_layer(&mut self, name: &str, layer: &LayerData) -> Result<(), StoreError>;
    fn contains(&self, name: &str) -> bool;
}

fn check_shape(name: &str, layer: &LayerData) -> Result<(), StoreError> {
    if layer.rows * layer.cols != layer.cells.len() {
        return Err(StoreError::Malformed {
            name: name.to_string(),
            reason: format!(
                "{}x{} header but {} cells",
                layer.rows,
                layer.cols,
                layer.cells.len()
            ),
        });
    }
    Ok(())
}

/// In-memory store keyed by layer name.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    layers: BTreeMap<String, LayerData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, layer: LayerData) {
        self.layers.insert(name.into(), layer);
    }

    pub fn get(&self, name: &str) -> Option<&LayerData> {
        self.layers.get(name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerStore for MemoryStore {
    fn load_layer(&mut self, name: &str) -> Result<LayerData, StoreError> {
        self.layers
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn save_layer(&mut self, name: &str, layer: &LayerData) -> Result<(), StoreError> {
        check_shape(name, layer)?;
        self.layers.insert(name.to_string(), layer.clone());
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }
}

/// On-disk encoding used by [`DirectoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFormat {
    #[default]
    Binary,
    Json,
}

impl StoreFormat {
    fn extension(&self) -> &'static str {
        match self {
            StoreFormat::Binary => "layer",
            StoreFormat::Json => "json",
        }
    }
}

/// Versioned wrapper written in front of every binary layer.
#[derive(Serialize, Deserialize)]
struct LayerFile {
    version: u32,
    layer: LayerData,
}

/// Store holding one file per layer in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    format: StoreFormat,
}

impl DirectoryStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>, format: StoreFormat) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, format })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", name, self.format.extension()))
    }
}

impl LayerStore for DirectoryStore {
    fn load_layer(&mut self, name: &str) -> Result<LayerData, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let reader = BufReader::new(File::open(&path)?);
        let layer = match self.format {
            StoreFormat::Binary => {
                let file: LayerFile = bincode::deserialize_from(reader)?;
                if file.version != LAYER_FILE_VERSION {
                    return Err(StoreError::VersionMismatch {
                        expected: LAYER_FILE_VERSION,
                        found: file.version,
                    });
                }
                file.layer
            }
            StoreFormat::Json => serde_json::from_reader(reader)?,
        };
        check_shape(name, &layer)?;
        Ok(layer)
    }

    fn save_layer(&mut self, name: &str, layer: &LayerData) -> Result<(), StoreError> {
        check_shape(name, layer)?;
        let writer = BufWriter::new(File::create(self.path_for(name))?);
        match self.format {
            StoreFormat::Binary => {
                let file = LayerFile {
                    version: LAYER_FILE_VERSION,
                    layer: layer.clone(),
                };
                bincode::serialize_into(writer, &file)?;
            }
            StoreFormat::Json => serde_json::to_writer_pretty(writer, layer)?,
        }
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Bounds;

    fn sample() -> LayerData {
        LayerData {
            bounds: Bounds::new(2.0, 0.0, 3.0, 0.0),
            rows: 2,
            cols: 3,
            cells: vec![Some(1.0), None, Some(-1.5), Some(0.0), Some(2.25), None],
        }
    }

    #[test]
    fn test_memory_store_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.load_layer("cost"),
            Err(StoreError::NotFound(_))
        ));
        store.save_layer("cost", &sample()).unwrap();
        assert!(store.contains("cost"));
        assert_eq!(store.load_layer("cost").unwrap(), sample());
    }

    #[test]
    fn test_malformed_layer_rejected() {
        let mut store = MemoryStore::new();
        let mut bad = sample();
        bad.cells.pop();
        assert!(matches!(
            store.save_layer("cost", &bad),
            Err(StoreError::Malformed { .. })
        ));
        assert!(!store.contains("cost"));
    }

    #[test]
    fn test_directory_store_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path(), StoreFormat::Binary).unwrap();
        assert!(!store.contains("pher"));
        store.save_layer("pher", &sample()).unwrap();
        assert!(store.contains("pher"));
        assert!(dir.path().join("pher.layer").exists());
        assert_eq!(store.load_layer("pher").unwrap(), sample());
    }

    #[test]
    fn test_directory_store_json_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path(), StoreFormat::Json).unwrap();
        store.save_layer("sites", &sample()).unwrap();

        let text = fs::read_to_string(dir.path().join("sites.json")).unwrap();
        assert!(text.contains("null"));
        assert_eq!(store.load_layer("sites").unwrap().to_rows()[0][1], None);
    }

    #[test]
    fn test_directory_store_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::open(dir.path(), StoreFormat::Binary).unwrap();
        let file = LayerFile {
            version: LAYER_FILE_VERSION + 1,
            layer: sample(),
        };
        let writer = BufWriter::new(File::create(store.path_for("old")).unwrap());
        bincode::serialize_into(writer, &file).unwrap();

        match store.load_layer("old") {
            Err(StoreError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, LAYER_FILE_VERSION);
                assert_eq!(found, LAYER_FILE_VERSION + 1);
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
