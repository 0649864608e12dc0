//! The data model shared by every Wave Compare Engine component.
//!
//! `TreeGraph` is built once per comparison and never mutated afterward;
//! `MappingTable` is the only structure the engine writes to while BFS runs.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier for a person, shared by both the source and
/// destination trees (the engine never compares ids across trees directly,
/// only through a `PersonMapping`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a family union (spouse pair plus their children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub Uuid);

impl FamilyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FamilyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unknown
    }
}

impl Gender {
    /// Two genders are consistent if equal, or if at least one is Unknown
    /// (used by the validator and the resolver).
    pub fn consistent_with(&self, other: &Gender) -> bool {
        matches!(self, Gender::Unknown) || matches!(other, Gender::Unknown) || self == other
    }
}

/// A possibly-partial date: genealogical sources often carry only a year,
/// or only an original free-text string the importer couldn't fully parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateInfo {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub original: Option<String>,
}

impl DateInfo {
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Best-effort parse of `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`. Anything
    /// else is kept only as `original` with no structured fields.
    pub fn from_original(s: &str) -> DateInfo {
        let parts: Vec<&str> = s.splitn(3, '-').collect();
        let year = parts.first().and_then(|p| p.parse::<i32>().ok());
        let month = parts.get(1).and_then(|p| p.parse::<u32>().ok());
        let day = parts.get(2).and_then(|p| p.parse::<u32>().ok());
        DateInfo {
            year,
            month,
            day,
            original: Some(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub maiden_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth: Option<DateInfo>,
    #[serde(default)]
    pub death: Option<DateInfo>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub death_place: Option<String>,
    #[serde(default)]
    pub burial_place: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub photo_fingerprints: Vec<String>,
    #[serde(default)]
    pub father_id: Option<PersonId>,
    #[serde(default)]
    pub mother_id: Option<PersonId>,
    #[serde(default)]
    pub spouse_ids: BTreeSet<PersonId>,
    #[serde(default)]
    pub children_ids: Vec<PersonId>,
    /// Derived by `TreeIndexer`, not carried on the wire from a loader.
    #[serde(default, skip_serializing)]
    pub sibling_ids: Vec<PersonId>,
    /// Precomputed by `TreeIndexer::build` from `last_name`; lower-cased,
    /// diacritics-folded comparison key used by the acceleration indices.
    #[serde(default, skip_serializing)]
    pub normalized_last_name: Option<String>,
}

impl Person {
    pub fn new(id: PersonId) -> Self {
        Person {
            id,
            ..Default::default()
        }
    }

    pub fn has_any_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

pub fn normalize_last_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: FamilyId,
    #[serde(default)]
    pub husband_id: Option<PersonId>,
    #[serde(default)]
    pub wife_id: Option<PersonId>,
    #[serde(default)]
    pub child_ids: Vec<PersonId>,
    #[serde(default)]
    pub marriage_date: Option<DateInfo>,
    #[serde(default)]
    pub marriage_place: Option<String>,
    #[serde(default)]
    pub divorce_date: Option<DateInfo>,
    #[serde(default)]
    pub divorce_place: Option<String>,
}

impl Family {
    /// The two spouse slots, filtering out empty ones.
    pub fn spouses(&self) -> Vec<PersonId> {
        [self.husband_id, self.wife_id].into_iter().flatten().collect()
    }

    pub fn spouse_slot_of(&self, id: PersonId) -> Option<SpouseSlot> {
        if self.husband_id == Some(id) {
            Some(SpouseSlot::Husband)
        } else if self.wife_id == Some(id) {
            Some(SpouseSlot::Wife)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpouseSlot {
    Husband,
    Wife,
}

/// The data a loader hands the indexer: a flat bag of persons and families,
/// no reverse indices yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedTree {
    pub persons: HashMap<PersonId, Person>,
    pub families: HashMap<FamilyId, Family>,
}

/// Raised by `TreeIndexer::build` when a family references a missing
/// person; the family is skipped, never a fatal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexWarning {
    pub family_id: FamilyId,
    pub message: String,
}

/// Immutable, indexed view of a loaded tree. Built once per comparison by
/// `TreeIndexer`; every other component only reads through it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeGraph {
    pub persons: HashMap<PersonId, Person>,
    pub families: HashMap<FamilyId, Family>,
    pub person_to_families_as_spouse: HashMap<PersonId, Vec<FamilyId>>,
    pub person_to_families_as_child: HashMap<PersonId, Vec<FamilyId>>,
    pub persons_by_birth_year: HashMap<i32, Vec<PersonId>>,
    pub persons_by_normalized_last_name: HashMap<String, Vec<PersonId>>,
    pub warnings: Vec<IndexWarning>,
}

impl TreeGraph {
    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    pub fn family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(&id)
    }
}

/// The relation a mapping was discovered through (a tagged
/// variant rather than a class hierarchy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    Anchor,
    Spouse,
    Parent,
    Child,
    Sibling,
}

/// A directed assertion that a source person corresponds to a destination
/// person, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMapping {
    pub source_id: PersonId,
    pub dest_id: PersonId,
    pub score: u8,
    pub level: u32,
    pub found_via: RelationType,
    pub found_in_family_id: Option<FamilyId>,
    pub found_from_person_id: Option<PersonId>,
    /// Monotonically increasing insertion sequence, not a wall-clock
    /// timestamp — see DESIGN.md: wall-clock time would break the
    /// determinism property.
    pub found_at: u64,
}

/// `sourceId -> PersonMapping`. Anchors are locked: `MappingConflictResolver`
/// never rewrites them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    entries: HashMap<PersonId, PersonMapping>,
    anchors: BTreeSet<PersonId>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: PersonId) -> Option<&PersonMapping> {
        self.entries.get(&source_id)
    }

    pub fn contains_source(&self, source_id: PersonId) -> bool {
        self.entries.contains_key(&source_id)
    }

    pub fn is_anchor(&self, source_id: PersonId) -> bool {
        self.anchors.contains(&source_id)
    }

    /// Destination occupied by some other source than `except`.
    pub fn dest_taken_by_other(&self, dest_id: PersonId, except: PersonId) -> Option<PersonId> {
        self.entries
            .values()
            .find(|m| m.dest_id == dest_id && m.source_id != except)
            .map(|m| m.source_id)
    }

    pub fn dest_is_mapped(&self, dest_id: PersonId) -> bool {
        self.entries.values().any(|m| m.dest_id == dest_id)
    }

    /// Inserts an anchor mapping; anchors are permanent from here on.
    pub fn insert_anchor(&mut self, mapping: PersonMapping) {
        self.anchors.insert(mapping.source_id);
        self.entries.insert(mapping.source_id, mapping);
    }

    /// Inserts a non-anchor mapping discovered during BFS. Panics if the
    /// source is already an anchor — callers must never attempt this.
    pub fn insert(&mut self, mapping: PersonMapping) {
        assert!(
            !self.anchors.contains(&mapping.source_id),
            "attempted to overwrite anchor mapping for {}",
            mapping.source_id
        );
        self.entries.insert(mapping.source_id, mapping);
    }

    /// Overwrites a non-anchor mapping's destination/score during conflict
    /// resolution; other metadata is preserved.
    pub fn rewrite_non_anchor(&mut self, source_id: PersonId, dest_id: PersonId, score: u8) {
        if self.anchors.contains(&source_id) {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&source_id) {
            existing.dest_id = dest_id;
            existing.score = score;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonMapping> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.entries.keys().copied()
    }

    pub fn dest_ids(&self) -> BTreeSet<PersonId> {
        self.entries.values().map(|m| m.dest_id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueKind {
    InvalidSourceId,
    InvalidDestId,
    GenderMismatch,
    BirthYearMismatch,
    DeathYearMismatch,
    DuplicateMapping,
    LowMatchScore,
    FamilyInconsistency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub kind: ValidationIssueKind,
    pub source_id: Option<PersonId>,
    pub dest_id: Option<PersonId>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdStrategy {
    Fixed,
    Adaptive,
    Aggressive,
    Conservative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    /// 0 means unlimited: maxLevel is advisory and only prunes enqueues
    /// when `nextLevel > maxLevel`, so 0 must not mean "cut off at level 0";
    /// it means "no cutoff at all".
    pub max_level: u32,
    pub threshold_strategy: ThresholdStrategy,
    pub base_threshold: u8,
    pub resolve_conflicts: bool,
    pub interactive: bool,
    pub low_confidence_threshold: u8,
    pub min_confidence_threshold: u8,
    pub max_candidates: usize,
    pub confirmed_mappings_path: Option<PathBuf>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            max_level: 0,
            threshold_strategy: ThresholdStrategy::Adaptive,
            base_threshold: 60,
            resolve_conflicts: true,
            interactive: false,
            low_confidence_threshold: 85,
            min_confidence_threshold: 60,
            max_candidates: 3,
            confirmed_mappings_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub level: u32,
    pub persons_processed: usize,
    pub families_examined: usize,
    pub new_mappings: usize,
    /// Wall-clock duration of this level's processing, in milliseconds.
    /// Excluded from the determinism property check (DESIGN.md) since
    /// timing is inherently non-deterministic.
    pub elapsed_millis: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub persons_mapped: usize,
    pub families_examined: usize,
    pub validation_issues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub anchor_source: PersonId,
    pub anchor_dest: PersonId,
    pub options: CompareOptions,
    pub mappings: Vec<PersonMapping>,
    pub unmatched_source: Vec<PersonId>,
    pub unmatched_destination: Vec<PersonId>,
    pub validation_issues: Vec<ValidationIssue>,
    pub level_stats: Vec<LevelStats>,
    pub totals: Totals,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub field: String,
    pub source_value: Option<String>,
    pub dest_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub source_id: PersonId,
    pub dest_id: PersonId,
    pub score: u8,
    pub matched_by: RelationType,
    pub fields_to_update: Vec<FieldDiff>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationPointer {
    pub related_source_id: PersonId,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecord {
    pub person: Person,
    pub primary_relation: RelationPointer,
    pub additional_relations: Vec<RelationPointer>,
    pub source_family_id: Option<FamilyId>,
    pub depth_from_existing: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighConfidenceReport {
    pub nodes_to_update: Vec<UpdateRecord>,
    pub nodes_to_add: Vec<AddRecord>,
}

/// A decision recorded by the interactive adjudicator and persisted to the
/// confirmed-mappings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedDecisionType {
    Confirmed,
    Rejected,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedMappingEntry {
    pub source_id: PersonId,
    pub dest_id: Option<PersonId>,
    #[serde(rename = "type")]
    pub decision_type: ConfirmedDecisionType,
    /// Opaque monotonic sequence, not wall-clock time (see `PersonMapping::found_at`).
    pub confirmed_at: u64,
    pub original_score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedMappingsDocument {
    pub source_file: String,
    pub destination_file: String,
    pub mappings: Vec<ConfirmedMappingEntry>,
}
