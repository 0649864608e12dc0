//! `TreeLoader` — the injected port that turns a genealogical file on disk
//! into a `LoadedTree`. The wire format itself is not specified;
//! this crate ships a JSON adapter (`infrastructure::JsonTreeLoader`)
//! matching the serde shape of `LoadedTree`/`Person`/`Family`.

use std::path::Path;

use crate::core::error::CollaboratorError;
use crate::core::model::LoadedTree;

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeLoadOptions {
    pub download_photos: bool,
}

pub trait TreeLoader {
    fn load(&self, path: &Path, options: &TreeLoadOptions) -> Result<LoadedTree, CollaboratorError>;
}
