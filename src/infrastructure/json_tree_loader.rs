//! `JsonTreeLoader` — reads a `LoadedTree` from a JSON file on disk. This is
//! the concrete adapter behind the `TreeLoader` port; `download_photos` is
//! accepted for interface parity but this loader never performs network
//! I/O, so photo fingerprints are taken as-is from the file.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::error::CollaboratorError;
use crate::core::model::LoadedTree;
use crate::core::tree_loader::{TreeLoadOptions, TreeLoader};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeLoader;

impl TreeLoader for JsonTreeLoader {
    fn load(&self, path: &Path, options: &TreeLoadOptions) -> Result<LoadedTree, CollaboratorError> {
        debug!(path = %path.display(), download_photos = options.download_photos, "loading tree from json");
        let content = fs::read_to_string(path).map_err(|error| CollaboratorError::Loader(format!("reading {}: {error}", path.display())))?;
        serde_json::from_str::<LoadedTree>(&content).map_err(|error| CollaboratorError::Loader(format!("parsing {}: {error}", path.display())))
    }
}
