//! Key-value persistence of camera records, keyed by device identifier.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::debug;

use crate::CameraRecord;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid device key {0:?}")]
    InvalidKey(String),
    #[error("record for {0:?} contains non-finite values")]
    NonFinite(String),
}

/// Storage for camera records.
///
/// `put` replaces any previous record for the key; readers never observe a
/// partially written record.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CameraRecord>, StoreError>;
    fn put(&self, key: &str, record: &CameraRecord) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per device in a directory.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Bytes outside `[A-Za-z0-9._-]` are percent-encoded,
    /// so `b8:27:eb:00:11:22` maps to `b8%3A27%3Aeb%3A00%3A11%3A22.json` and
    /// distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.bytes().all(|b| b == b'.') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut stem = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
                stem.push(char::from(b));
            } else {
                stem.push_str(&format!("%{b:02X}"));
            }
        }
        Ok(self.dir.join(format!("{stem}.json")))
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<CameraRecord>, StoreError> {
        let path = self.path_for(key)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: CameraRecord = serde_json::from_str(&raw)?;
        debug!("loaded camera record {}", path.display());
        Ok(Some(record))
    }

    fn put(&self, key: &str, record: &CameraRecord) -> Result<(), StoreError> {
        if !record.is_finite() {
            return Err(StoreError::NonFinite(key.to_string()));
        }
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(record)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(io::Error::from)?;
        debug!("saved camera record {}", path.display());
        Ok(())
    }
}

/// Process-local store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CameraRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<CameraRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, record: &CameraRecord) -> Result<(), StoreError> {
        if !record.is_finite() {
            return Err(StoreError::NonFinite(key.to_string()));
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.to_string(), record.clone());
        Ok(())
    }
}
