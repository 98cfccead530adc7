//! Durable storage for fitted model state
//!
//! The model and the scaler are stored as two opaque blobs that are only
//! meaningful together:
//! - Writes go through a temp file, fsync and rename
//! - A store holding just one of the two blobs reports the state as incomplete
//! - [`compute_checksum`] binds a scaler blob to the model blob it was fitted with

use crate::error::PersistenceError;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

pub const MODEL_FILE_NAME: &str = "aqi_model.json";
pub const SCALER_FILE_NAME: &str = "aqi_scaler.json";

/// The persisted pair of model and scaler blobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlobs {
    pub model: Vec<u8>,
    pub scaler: Vec<u8>,
}

/// Backing storage for the estimator's fitted state
pub trait ModelStore: Send + Sync {
    /// Load both blobs; `Ok(None)` when nothing has been stored yet
    fn load(&self) -> Result<Option<StoredBlobs>, PersistenceError>;

    /// Replace both blobs
    fn save(&self, blobs: &StoredBlobs) -> Result<(), PersistenceError>;

    /// Whether both blobs appear to be present, without decoding them
    fn has_state(&self) -> bool;
}

/// File-backed store keeping both blobs in one directory
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE_NAME)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE_NAME)
    }

    fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io(path, e)),
        }
    }

    /// Write to a temp file first, then rename over the final path
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| PersistenceError::io(&temp_path, e))?;
        file.write_all(bytes)
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| PersistenceError::io(path, e))?;
        Ok(())
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<Option<StoredBlobs>, PersistenceError> {
        let model = Self::read_optional(&self.model_path())?;
        let scaler = Self::read_optional(&self.scaler_path())?;
        debug!(dir = %self.dir.display(), "Read persisted model state");
        pair_up(model, scaler)
    }

    fn save(&self, blobs: &StoredBlobs) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        Self::write_atomic(&self.model_path(), &blobs.model)?;
        Self::write_atomic(&self.scaler_path(), &blobs.scaler)?;
        info!(
            dir = %self.dir.display(),
            model_bytes = blobs.model.len(),
            scaler_bytes = blobs.scaler.len(),
            "Persisted model state"
        );
        Ok(())
    }

    fn has_state(&self) -> bool {
        self.model_path().is_file() && self.scaler_path().is_file()
    }
}

/// In-memory store, mainly for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    model: Mutex<Option<Vec<u8>>>,
    scaler: Mutex<Option<Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the model blob, leaving the scaler behind
    pub fn discard_model(&self) {
        if let Ok(mut guard) = self.model.lock() {
            *guard = None;
        }
    }

    /// Drop the scaler blob, leaving the model behind
    pub fn discard_scaler(&self) {
        if let Ok(mut guard) = self.scaler.lock() {
            *guard = None;
        }
    }

    /// Overwrite the scaler blob alone
    pub fn replace_scaler(&self, bytes: Vec<u8>) {
        if let Ok(mut guard) = self.scaler.lock() {
            *guard = Some(bytes);
        }
    }
}

fn poisoned() -> PersistenceError {
    PersistenceError::Incompatible("memory store lock poisoned".to_string())
}

impl ModelStore for MemoryModelStore {
    fn load(&self) -> Result<Option<StoredBlobs>, PersistenceError> {
        let model = self.model.lock().map_err(|_| poisoned())?.clone();
        let scaler = self.scaler.lock().map_err(|_| poisoned())?.clone();
        pair_up(model, scaler)
    }

    fn save(&self, blobs: &StoredBlobs) -> Result<(), PersistenceError> {
        *self.model.lock().map_err(|_| poisoned())? = Some(blobs.model.clone());
        *self.scaler.lock().map_err(|_| poisoned())? = Some(blobs.scaler.clone());
        Ok(())
    }

    fn has_state(&self) -> bool {
        let model = self.model.lock().map(|g| g.is_some()).unwrap_or(false);
        let scaler = self.scaler.lock().map(|g| g.is_some()).unwrap_or(false);
        model && scaler
    }
}

fn pair_up(
    model: Option<Vec<u8>>,
    scaler: Option<Vec<u8>>,
) -> Result<Option<StoredBlobs>, PersistenceError> {
    match (model, scaler) {
        (Some(model), Some(scaler)) => Ok(Some(StoredBlobs { model, scaler })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(PersistenceError::Incomplete { missing: "scaler" }),
        (None, Some(_)) => Err(PersistenceError::Incomplete { missing: "model" }),
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
