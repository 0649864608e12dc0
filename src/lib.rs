pub mod application;
pub mod core;
pub mod infrastructure;

pub use crate::application::{CompareRequest, CompareRun, CompareService, EngineConfig, EngineConfigError};
pub use crate::infrastructure::{FileConfirmedMappingsStore, JsonTreeLoader};
pub use crate::core::adjudicator::{AdjudicationDecision, AdjudicationRequest, AdjudicationResponse, AutoRejectConfirmation, CandidateOption, InteractiveConfirmation, ScriptedConfirmation};
pub use crate::core::conflict_resolver::MappingConflictResolver;
pub use crate::core::detailed_log::{DetailedLog, LogLevel};
pub use crate::core::engine::WaveCompareEngine;
pub use crate::core::error::{CollaboratorError, ConfigurationError, EngineError, GraphError};
pub use crate::core::family_matcher::FamilyMatcher;
pub use crate::core::family_member_matcher::FamilyMemberMatcher;
pub use crate::core::fuzzy::{CandidateMatch, DefaultFuzzyMatcher, FuzzyMatcher, MatchScore};
pub use crate::core::indexer::TreeIndexer;
pub use crate::core::model::*;
pub use crate::core::navigator::TreeNavigator;
pub use crate::core::photo::{NoPhotosComparator, PhotoComparator};
pub use crate::core::report::HighConfidenceReportBuilder;
pub use crate::core::store::ConfirmedMappingsStore;
pub use crate::core::threshold::ThresholdCalculator;
pub use crate::core::tree_loader::{TreeLoadOptions, TreeLoader};
pub use crate::core::validator::WaveMappingValidator;
pub use crate::core::engine::EngineOutcome;
