//! Error kinds for the Wave Compare Engine.
//!
//! `ConfigurationError` is fatal and returned before BFS starts.
//! `GraphError` and validation issues are never fatal — they are logged
//! and accumulated into the `CompareResult` instead of aborting the run.
//! `CollaboratorError` wraps a failure from an injected port (the fuzzy
//! matcher, the confirmed-mappings store); the offending proposal is
//! skipped and the engine continues.

use thiserror::Error;

use crate::core::model::{FamilyId, PersonId};

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("anchor source id {0} not found in the source tree")]
    AnchorSourceNotFound(PersonId),

    #[error("anchor destination id {0} not found in the destination tree")]
    AnchorDestNotFound(PersonId),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("family {family_id} references missing person {person_id}")]
    MissingPerson { family_id: FamilyId, person_id: PersonId },
}

/// A failure from an injected collaborator (fuzzy matcher, confirmed
/// mappings store, interactive confirmation). Never fatal: the call site
/// logs it, skips the affected proposal, and continues.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("fuzzy matcher failed: {0}")]
    FuzzyMatcher(String),

    #[error("confirmed mappings store failed: {0}")]
    Store(String),

    #[error("interactive confirmation failed: {0}")]
    Confirmation(String),

    #[error("tree loader failed: {0}")]
    Loader(String),
}

/// Top-level error returned by `WaveCompareEngine::run` when the engine
/// cannot even start.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
