//! Save and load Q-network weights keyed by a model identifier.
//!
//! A missing model is `Ok(None)`, not an error. Callers treat any load error
//! as "start from fresh weights".

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{RaceError, Result};
use crate::network::NeuralNetwork;

pub trait ModelStore: Send {
    fn save(&self, id: &str, network: &NeuralNetwork) -> Result<()>;

    fn load(&self, id: &str) -> Result<Option<NeuralNetwork>>;
}

/// One bincode file per model, `<dir>/<id>.bin`.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileModelStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", id))
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, id: &str, network: &NeuralNetwork) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        network.save(&self.path_for(id))
    }

    fn load(&self, id: &str) -> Result<Option<NeuralNetwork>> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => NeuralNetwork::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryModelStore {
    models: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models
            .lock()
            .map(|models| models.contains_key(id))
            .unwrap_or(false)
    }

    /// Store raw bytes under `id`, bypassing serialization.
    pub fn insert_raw(&self, id: &str, bytes: Vec<u8>) -> Result<()> {
        self.lock()?.insert(id.to_string(), bytes);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.models
            .lock()
            .map_err(|_| RaceError::Io("model store lock poisoned".to_string()))
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, id: &str, network: &NeuralNetwork) -> Result<()> {
        let bytes = network.to_bytes()?;
        self.lock()?.insert(id.to_string(), bytes);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<NeuralNetwork>> {
        match self.lock()?.get(id) {
            Some(bytes) => NeuralNetwork::from_bytes(bytes).map(Some),
            None => Ok(None),
        }
    }
}
