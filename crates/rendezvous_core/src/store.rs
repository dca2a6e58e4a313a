//! The shared rental record: the external source of truth both parties
//! converge on.
//!
//! Real deployments put this behind a remote service; the engine only
//! depends on the [`RecordStore`] trait. The in-memory implementation backs
//! tests (and lets them play the counterpart by writing to a cloned handle);
//! the JSON file implementation backs the demo.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;
use h3o::LatLng;
use serde::{Deserialize, Serialize};

use crate::ecs::TargetLocation;

const RECORD_FILE_VERSION: u32 = 1;

/// Raw persisted fields of one rental. The target triple is nullable and may
/// be partially populated; a partial triple reads as "not yet confirmed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRecord {
    pub id: String,
    pub status: String,
    pub target_lat: Option<f64>,
    pub target_lon: Option<f64>,
    pub target_address: Option<String>,
    /// Engine-timeline milliseconds.
    pub requested_at: Option<u64>,
    pub confirmed_at: Option<u64>,
}

impl RentalRecord {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            target_lat: None,
            target_lon: None,
            target_address: None,
            requested_at: None,
            confirmed_at: None,
        }
    }

    /// The confirmed meeting point, if the triple is fully populated with a
    /// valid coordinate.
    pub fn target_location(&self) -> Option<TargetLocation> {
        let lat = self.target_lat?;
        let lon = self.target_lon?;
        let address = self.target_address.as_ref()?;
        let point = LatLng::new(lat, lon).ok()?;
        Some(TargetLocation {
            point,
            address: address.clone(),
        })
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Io(String),
    InvalidFormat(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "record '{id}' not found"),
            StoreError::Io(message) => write!(f, "{message}"),
            StoreError::InvalidFormat(message) => write!(f, "{message}"),
        }
    }
}

/// Record access as the engine sees it. Records are created out-of-band,
/// updated in place, and never deleted.
pub trait RecordStore: Send + Sync {
    fn get(&self, id: &str) -> Result<RentalRecord, StoreError>;
    fn update(&self, record: &RentalRecord) -> Result<(), StoreError>;
}

/// ECS resource wrapping a shared record store handle.
#[derive(Resource)]
pub struct RecordStoreResource(pub Arc<dyn RecordStore>);

/// Read-modify-write of the raw status field only.
pub fn write_raw_status(
    store: &dyn RecordStore,
    id: &str,
    raw_status: &str,
) -> Result<(), StoreError> {
    let mut record = store.get(id)?;
    record.status = raw_status.to_string();
    store.update(&record)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Shared in-memory store. Cloning shares the underlying map, so a test can
/// keep one handle and mutate records the way the counterpart's device would.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<Mutex<HashMap<String, RentalRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, creating it if absent.
    pub fn seed(&self, record: RentalRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.id.clone(), record);
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: &str) -> Result<RentalRecord, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::Io("record store lock poisoned".to_string()))?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update(&self, record: &RentalRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Io("record store lock poisoned".to_string()))?;
        if !records.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct RecordLibrary {
    version: u32,
    records: Vec<RentalRecord>,
}

impl RecordLibrary {
    fn empty() -> Self {
        Self {
            version: RECORD_FILE_VERSION,
            records: Vec::new(),
        }
    }
}

/// Single-file JSON store with atomic writes (temp file + rename). A missing
/// file reads as an empty library.
pub struct JsonFileRecordStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn seed(&self, record: RentalRecord) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut library = self.load_library()?;
        if let Some(existing) = library.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            library.records.push(record);
        }
        self.save_library_atomic(&library)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.guard
            .lock()
            .map_err(|_| StoreError::Io("record file lock poisoned".to_string()))
    }

    fn load_library(&self) -> Result<RecordLibrary, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(RecordLibrary::empty())
            }
            Err(error) => {
                return Err(StoreError::Io(format!(
                    "failed to read '{}': {error}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&contents).map_err(|error| {
            StoreError::InvalidFormat(format!(
                "failed to parse '{}': {error}",
                self.path.display()
            ))
        })
    }

    fn save_library_atomic(&self, library: &RecordLibrary) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(library)
            .map_err(|error| StoreError::InvalidFormat(format!("failed to encode records: {error}")))?;
        let tmp_path = temp_sibling(&self.path);
        {
            let mut file = File::create(&tmp_path).map_err(|error| {
                StoreError::Io(format!("failed to create '{}': {error}", tmp_path.display()))
            })?;
            file.write_all(json.as_bytes()).map_err(|error| {
                StoreError::Io(format!("failed to write '{}': {error}", tmp_path.display()))
            })?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|error| {
            StoreError::Io(format!(
                "failed to replace '{}': {error}",
                self.path.display()
            ))
        })
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl RecordStore for JsonFileRecordStore {
    fn get(&self, id: &str) -> Result<RentalRecord, StoreError> {
        let _guard = self.lock()?;
        let library = self.load_library()?;
        library
            .records
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn update(&self, record: &RentalRecord) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut library = self.load_library()?;
        let Some(existing) = library.records.iter_mut().find(|r| r.id == record.id) else {
            return Err(StoreError::NotFound(record.id.clone()));
        };
        *existing = record.clone();
        self.save_library_atomic(&library)
    }
}
