//! `FileConfirmedMappingsStore` — persists the confirmed-mappings document
//! as JSON, writing atomically (write to a sibling temp file, then rename)
//! so a crash mid-write never leaves a half-written document.
//! An in-process mutex serializes concurrent writers within this run;
//! cross-process coordination is out of scope (DESIGN.md).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::core::error::CollaboratorError;
use crate::core::model::ConfirmedMappingsDocument;
use crate::core::store::ConfirmedMappingsStore;

pub struct FileConfirmedMappingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfirmedMappingsStore {
    pub fn new(path: PathBuf) -> Self {
        FileConfirmedMappingsStore { path, write_lock: Mutex::new(()) }
    }
}

impl ConfirmedMappingsStore for FileConfirmedMappingsStore {
    fn load(&self) -> Result<Option<ConfirmedMappingsDocument>, CollaboratorError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|error| CollaboratorError::Store(format!("reading {}: {error}", self.path.display())))?;
        let document = serde_json::from_str(&content).map_err(|error| CollaboratorError::Store(format!("parsing {}: {error}", self.path.display())))?;
        Ok(Some(document))
    }

    fn persist(&self, document: &ConfirmedMappingsDocument) -> Result<(), CollaboratorError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|error| CollaboratorError::Store(format!("creating {}: {error}", dir.display())))?;
            }
        }

        let serialized = serde_json::to_string_pretty(document).map_err(|error| CollaboratorError::Store(format!("serializing confirmed mappings: {error}")))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, serialized).map_err(|error| CollaboratorError::Store(format!("writing {}: {error}", temp_path.display())))?;
        fs::rename(&temp_path, &self.path).map_err(|error| CollaboratorError::Store(format!("renaming {} to {}: {error}", temp_path.display(), self.path.display())))
    }
}

impl FileConfirmedMappingsStore {
    fn temp_path(&self) -> PathBuf {
        let file_name = self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "confirmed-mappings.json".to_string());
        self.path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()))
    }
}
