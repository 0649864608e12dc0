//! `FamilyMatcher` — picks the destination family aligning with a source
//! family under the current mapping table.

use crate::core::fuzzy::FuzzyMatcher;
use crate::core::model::{Family, FamilyId, MappingTable, TreeGraph};

/// Per-candidate scoring breakdown, emitted to the detailed log
/// regardless of whether the candidate was chosen.
#[derive(Debug, Clone)]
pub struct FamilyCandidateScore {
    pub candidate_family_id: FamilyId,
    pub structure_score: f32,
    pub husband_score: Option<u8>,
    pub wife_score: Option<u8>,
    pub combined_score: f32,
    pub conflict: Option<String>,
}

pub struct FamilyMatcher;

impl FamilyMatcher {
    /// Returns the chosen destination family (if any non-conflicting
    /// candidate scored above zero structure/personal signal) plus the
    /// full per-candidate log, in candidate input order.
    pub fn choose(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_family: &Family,
        candidates: &[FamilyId],
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
    ) -> (Option<FamilyId>, Vec<FamilyCandidateScore>) {
        let mut log = Vec::with_capacity(candidates.len());
        let mut best: Option<(FamilyId, f32)> = None;

        for &candidate_id in candidates {
            let Some(dest_family) = dest_graph.family(candidate_id) else {
                continue;
            };
            let score = Self::score_candidate(source_graph, dest_graph, source_family, dest_family, mappings, fuzzy);

            if score.conflict.is_none() {
                let is_better = match &best {
                    None => true,
                    Some((_, best_score)) => score.combined_score > *best_score,
                };
                if is_better {
                    best = Some((candidate_id, score.combined_score));
                }
            }
            log.push(score);
        }

        (best.map(|(id, _)| id), log)
    }

    fn score_candidate(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_family: &Family,
        dest_family: &Family,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
    ) -> FamilyCandidateScore {
        let dest_spouses = dest_family.spouses();
        let mut structure = 0.0_f32;
        let mut conflict: Option<String> = None;

        for source_spouse in source_family.spouses() {
            match mappings.get(source_spouse) {
                Some(mapping) if dest_spouses.contains(&mapping.dest_id) => {
                    structure += 50.0;
                }
                Some(mapping) => {
                    if !dest_spouses.is_empty() {
                        conflict = Some(format!(
                            "source spouse {source_spouse} already mapped to {} which is not in candidate family {}",
                            mapping.dest_id, dest_family.id
                        ));
                    }
                }
                None => {
                    if dest_spouses.iter().any(|&d| !mappings.dest_is_mapped(d)) {
                        structure += 10.0;
                    }
                }
            }
        }

        for &source_child in &source_family.child_ids {
            match mappings.get(source_child) {
                Some(mapping) if dest_family.child_ids.contains(&mapping.dest_id) => {
                    structure += 20.0;
                }
                Some(mapping) => {
                    if !dest_family.child_ids.is_empty() {
                        conflict = Some(format!(
                            "source child {source_child} already mapped to {} which is not a child of candidate family {}",
                            mapping.dest_id, dest_family.id
                        ));
                    }
                }
                None => {}
            }
        }

        let husband_score = Self::slot_personal_score(
            source_graph,
            dest_graph,
            source_family.husband_id,
            dest_family.husband_id,
            mappings,
            fuzzy,
        );
        let wife_score = Self::slot_personal_score(
            source_graph,
            dest_graph,
            source_family.wife_id,
            dest_family.wife_id,
            mappings,
            fuzzy,
        );

        let combined_score = match (husband_score, wife_score) {
            (Some(h), Some(w)) => 0.4 * structure + 0.3 * h as f32 + 0.3 * w as f32,
            (Some(s), None) | (None, Some(s)) => 0.4 * structure + 0.6 * s as f32,
            (None, None) => structure,
        };

        FamilyCandidateScore {
            candidate_family_id: dest_family.id,
            structure_score: structure,
            husband_score,
            wife_score,
            combined_score,
            conflict,
        }
    }

    fn slot_personal_score(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_slot: Option<crate::core::model::PersonId>,
        dest_slot: Option<crate::core::model::PersonId>,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
    ) -> Option<u8> {
        let source_id = source_slot?;
        let dest_id = dest_slot?;
        if mappings.contains_source(source_id) || mappings.dest_is_mapped(dest_id) {
            return None;
        }
        let source_person = source_graph.person(source_id)?;
        let dest_person = dest_graph.person(dest_id)?;
        Some(fuzzy.compare(source_person, dest_person).score)
    }
}
