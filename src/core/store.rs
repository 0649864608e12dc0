//! `ConfirmedMappingsStore` — the injected port reading and writing the
//! confirmed-mappings JSON document. Suspension point for the
//! engine: all I/O happens through this trait, never inline in the core.

use crate::core::error::CollaboratorError;
use crate::core::model::ConfirmedMappingsDocument;

pub trait ConfirmedMappingsStore {
    /// Returns `None` if no document has been persisted yet for this pair
    /// of trees.
    fn load(&self) -> Result<Option<ConfirmedMappingsDocument>, CollaboratorError>;

    fn persist(&self, document: &ConfirmedMappingsDocument) -> Result<(), CollaboratorError>;
}
