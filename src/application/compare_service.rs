//! `CompareService` — the application-layer orchestration that wires the
//! injected collaborators (tree loader, fuzzy matcher, photo comparator,
//! confirmed-mappings store, interactive confirmation) around the core
//! engine. This is the thin layer a CLI or any other front end calls into;
//! it owns no comparison logic of its own.

use std::path::Path;

use tracing::{info, warn};

use crate::core::adjudicator::InteractiveConfirmation;
use crate::core::engine::{EngineOutcome, WaveCompareEngine};
use crate::core::error::EngineError;
use crate::core::fuzzy::FuzzyMatcher;
use crate::core::indexer::TreeIndexer;
use crate::core::model::{CompareOptions, CompareResult, ConfirmedDecisionType, ConfirmedMappingsDocument, HighConfidenceReport, PersonId};
use crate::core::photo::PhotoComparator;
use crate::core::report::HighConfidenceReportBuilder;
use crate::core::store::ConfirmedMappingsStore;
use crate::core::tree_loader::{TreeLoadOptions, TreeLoader};

pub struct CompareRequest<'a> {
    pub source_path: &'a Path,
    pub dest_path: &'a Path,
    pub anchor_source: PersonId,
    pub anchor_dest: PersonId,
    pub options: CompareOptions,
    pub report_confidence_threshold: u8,
    pub download_photos: bool,
}

pub struct CompareRun {
    pub result: CompareResult,
    pub report: HighConfidenceReport,
    pub detailed_log: String,
}

pub struct CompareService<'a> {
    pub loader: &'a dyn TreeLoader,
    pub fuzzy: &'a dyn FuzzyMatcher,
    pub photo: &'a dyn PhotoComparator,
    pub store: Option<&'a dyn ConfirmedMappingsStore>,
}

impl<'a> CompareService<'a> {
    pub fn run(&self, request: CompareRequest<'_>, confirmation: &mut dyn InteractiveConfirmation) -> Result<CompareRun, EngineError> {
        let load_options = TreeLoadOptions {
            download_photos: request.download_photos,
        };

        let source_loaded = self.loader.load(request.source_path, &load_options).map_err(|error| {
            warn!("failed to load source tree: {error}");
            error
        });
        let dest_loaded = self.loader.load(request.dest_path, &load_options).map_err(|error| {
            warn!("failed to load destination tree: {error}");
            error
        });
        let (source_loaded, dest_loaded) = match (source_loaded, dest_loaded) {
            (Ok(s), Ok(d)) => (s, d),
            (Err(e), _) | (_, Err(e)) => return Err(EngineError::Configuration(crate::core::error::ConfigurationError::InvalidOption(e.to_string()))),
        };

        let source_graph = TreeIndexer::build(&source_loaded);
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let confirmed_document = self
            .store
            .map(|store| store.load())
            .transpose()
            .unwrap_or_else(|error| {
                warn!("confirmed mappings store failed, continuing without it: {error}");
                None
            })
            .flatten();

        let outcome: EngineOutcome = WaveCompareEngine::run(
            &source_graph,
            &dest_graph,
            request.anchor_source,
            request.anchor_dest,
            request.options,
            self.fuzzy,
            confirmation,
            confirmed_document.as_ref(),
            || false,
        )?;

        if let Some(store) = self.store {
            if !outcome.confirmed_decisions.is_empty() {
                let mut document = confirmed_document.unwrap_or_else(|| ConfirmedMappingsDocument {
                    source_file: request.source_path.display().to_string(),
                    destination_file: request.dest_path.display().to_string(),
                    mappings: Vec::new(),
                });
                document.mappings.retain(|existing| !outcome.confirmed_decisions.iter().any(|new| new.source_id == existing.source_id));
                document.mappings.extend(outcome.confirmed_decisions.iter().cloned());
                let confirmed_count = outcome.confirmed_decisions.iter().filter(|d| d.decision_type == ConfirmedDecisionType::Confirmed).count();
                if let Err(error) = store.persist(&document) {
                    warn!("failed to persist confirmed mappings, continuing: {error}");
                } else {
                    info!("persisted {} confirmed decisions ({confirmed_count} newly confirmed)", document.mappings.len());
                }
            }
        }

        let report = HighConfidenceReportBuilder::build(&source_graph, &dest_graph, &mappings_table_from(&outcome.result), request.report_confidence_threshold, self.photo);

        Ok(CompareRun {
            detailed_log: outcome.log.render(),
            result: outcome.result,
            report,
        })
    }
}

/// Rebuilds a `MappingTable` from the flat mapping list in a finished
/// `CompareResult`, for the report builder — which needs table lookups,
/// not just the list the serialized result carries.
fn mappings_table_from(result: &CompareResult) -> crate::core::model::MappingTable {
    let mut table = crate::core::model::MappingTable::new();
    for mapping in &result.mappings {
        if mapping.found_via == crate::core::model::RelationType::Anchor {
            table.insert_anchor(mapping.clone());
        } else {
            table.insert(mapping.clone());
        }
    }
    table
}
