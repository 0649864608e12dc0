//! `InteractiveConfirmation` — the optional mid-confidence adjudication
//! port. Modeled as a synchronous call on an injected
//! collaborator; no real input loop lives in the core. Tests (and the
//! reference engine wiring) use `ScriptedConfirmation`, which replays a
//! fixed sequence of pre-recorded decisions so comparisons stay
//! deterministic.

use crate::core::fuzzy::MatchField;
use crate::core::model::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjudicationDecision {
    Confirmed,
    Rejected,
    Skipped,
}

/// One ranked candidate shown to the adjudicator, with the field
/// breakdown and relative-match counts.
#[derive(Debug, Clone)]
pub struct CandidateOption {
    pub dest_id: PersonId,
    pub score: u8,
    pub field_breakdown: Vec<(MatchField, f32)>,
    pub matching_parent_count: usize,
    pub matching_child_count: usize,
    pub matching_sibling_count: usize,
    pub spouse_match: bool,
}

#[derive(Debug, Clone)]
pub struct AdjudicationRequest {
    pub source_id: PersonId,
    pub candidates: Vec<CandidateOption>,
}

#[derive(Debug, Clone)]
pub struct AdjudicationResponse {
    pub decision: AdjudicationDecision,
    /// Index into `request.candidates`, present only when `Confirmed`.
    pub selected_index: Option<usize>,
}

/// External collaborator contract: a single synchronous prompt. A
/// refused or failed prompt is never fatal to the engine — callers treat
/// any error as `Skipped`.
pub trait InteractiveConfirmation {
    fn ask(&mut self, request: &AdjudicationRequest) -> AdjudicationResponse;
}

/// Default port for non-interactive runs: always rejects, so an engine
/// wired without a real adjudicator never silently auto-accepts a
/// mid-confidence mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoRejectConfirmation;

impl InteractiveConfirmation for AutoRejectConfirmation {
    fn ask(&mut self, _request: &AdjudicationRequest) -> AdjudicationResponse {
        AdjudicationResponse {
            decision: AdjudicationDecision::Rejected,
            selected_index: None,
        }
    }
}

/// Replays a fixed script of responses, one per call, in order. Panics if
/// asked more times than the script provides — a test author error, not a
/// runtime condition.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmation {
    script: std::collections::VecDeque<AdjudicationResponse>,
}

impl ScriptedConfirmation {
    pub fn new(script: impl IntoIterator<Item = AdjudicationResponse>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl InteractiveConfirmation for ScriptedConfirmation {
    fn ask(&mut self, _request: &AdjudicationRequest) -> AdjudicationResponse {
        self.script.pop_front().expect("ScriptedConfirmation ran out of recorded responses")
    }
}
