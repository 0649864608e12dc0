//! `WaveCompareEngine` — the BFS orchestrator tying every other component
//! together. Single-threaded, cooperative: the only
//! suspension points are the interactive adjudicator and whatever I/O the
//! caller's confirmed-mappings store performs around a run, both outside
//! this module.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Instant;

use crate::core::adjudicator::{AdjudicationDecision, AdjudicationRequest, CandidateOption, InteractiveConfirmation};
use crate::core::conflict_resolver::MappingConflictResolver;
use crate::core::detailed_log::DetailedLog;
use crate::core::error::{ConfigurationError, EngineError};
use crate::core::family_matcher::FamilyMatcher;
use crate::core::family_member_matcher::FamilyMemberMatcher;
use crate::core::fuzzy::FuzzyMatcher;
use crate::core::model::{
    CompareOptions, CompareResult, ConfirmedDecisionType, ConfirmedMappingEntry, ConfirmedMappingsDocument, FamilyId, LevelStats, MappingTable, PersonId, PersonMapping, RelationType, TreeGraph,
    Totals,
};
use crate::core::navigator::TreeNavigator;
use crate::core::validator::WaveMappingValidator;

/// Which side of a family union is being expanded from the just-mapped
/// person: are they the spouse, or one of the children?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FamilySide {
    Spouse,
    Child,
}

pub struct EngineOutcome {
    pub result: CompareResult,
    pub log: DetailedLog,
    /// Decisions made by the interactive adjudicator during this run, for
    /// the caller to persist via a `ConfirmedMappingsStore`.
    /// Empty when `options.interactive` is false.
    pub confirmed_decisions: Vec<ConfirmedMappingEntry>,
}

pub struct WaveCompareEngine;

impl WaveCompareEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        anchor_source: PersonId,
        anchor_dest: PersonId,
        options: CompareOptions,
        fuzzy: &dyn FuzzyMatcher,
        confirmation: &mut dyn InteractiveConfirmation,
        confirmed_mappings: Option<&ConfirmedMappingsDocument>,
        mut is_cancelled: impl FnMut() -> bool,
    ) -> Result<EngineOutcome, EngineError> {
        if source_graph.person(anchor_source).is_none() {
            return Err(EngineError::Configuration(ConfigurationError::AnchorSourceNotFound(anchor_source)));
        }
        if dest_graph.person(anchor_dest).is_none() {
            return Err(EngineError::Configuration(ConfigurationError::AnchorDestNotFound(anchor_dest)));
        }

        let mut log = DetailedLog::new();
        let mut mappings = MappingTable::new();
        let mut validation_issues = Vec::new();
        let mut confirmed_decisions = Vec::new();
        let mut next_seq: u64 = 0;

        mappings.insert_anchor(PersonMapping {
            source_id: anchor_source,
            dest_id: anchor_dest,
            score: 100,
            level: 0,
            found_via: RelationType::Anchor,
            found_in_family_id: None,
            found_from_person_id: None,
            found_at: next_seq,
        });
        next_seq += 1;
        log.info(0, format!("seeded anchor {anchor_source} -> {anchor_dest}"));

        let mut rejected_pairs: HashSet<(PersonId, Option<PersonId>)> = HashSet::new();
        if let Some(doc) = confirmed_mappings {
            for entry in &doc.mappings {
                match entry.decision_type {
                    ConfirmedDecisionType::Confirmed => {
                        if let Some(dest_id) = entry.dest_id {
                            if !mappings.contains_source(entry.source_id) && source_graph.person(entry.source_id).is_some() && dest_graph.person(dest_id).is_some() {
                                mappings.insert_anchor(PersonMapping {
                                    source_id: entry.source_id,
                                    dest_id,
                                    score: 100,
                                    level: 0,
                                    found_via: RelationType::Anchor,
                                    found_in_family_id: None,
                                    found_from_person_id: None,
                                    found_at: next_seq,
                                });
                                next_seq += 1;
                            }
                        }
                    }
                    ConfirmedDecisionType::Rejected | ConfirmedDecisionType::Skipped => {
                        rejected_pairs.insert((entry.source_id, entry.dest_id));
                    }
                }
            }
        }

        let mut seeded: Vec<&PersonMapping> = mappings.iter().collect();
        seeded.sort_by_key(|m| m.found_at);
        let mut queue: VecDeque<(PersonId, u32)> = seeded.iter().map(|m| (m.source_id, m.level)).collect();
        let mut processed: HashSet<PersonId> = seeded.iter().map(|m| m.source_id).collect();

        let mut stats_by_level: BTreeMap<u32, LevelStats> = BTreeMap::new();
        let mut interrupted = false;

        while let Some((sid, level)) = queue.pop_front() {
            if is_cancelled() {
                interrupted = true;
                break;
            }

            let level_start = Instant::now();
            {
                let stat = stats_by_level.entry(level).or_insert_with(|| LevelStats { level, ..Default::default() });
                stat.persons_processed += 1;
            }

            if !mappings.contains_source(sid) {
                log.debug(level, format!("{sid} is an exploration seed; no expansion"));
                continue;
            }
            let did = mappings.get(sid).unwrap().dest_id;

            for side in [FamilySide::Spouse, FamilySide::Child] {
                Self::expand_side(
                    source_graph,
                    dest_graph,
                    &mut mappings,
                    fuzzy,
                    confirmation,
                    &options,
                    &mut validation_issues,
                    &mut confirmed_decisions,
                    &mut log,
                    &mut queue,
                    &mut processed,
                    &mut next_seq,
                    &rejected_pairs,
                    sid,
                    did,
                    level,
                    side,
                    &mut stats_by_level,
                );
            }

            let elapsed = level_start.elapsed().as_millis() as u64;
            stats_by_level.entry(level).or_insert_with(|| LevelStats { level, ..Default::default() }).elapsed_millis += elapsed;
        }

        if options.resolve_conflicts && !interrupted {
            MappingConflictResolver::resolve(source_graph, dest_graph, &mut mappings, fuzzy);
            log.info(0, "conflict resolution pass complete");
        }

        let mut unmatched_source: Vec<PersonId> = source_graph.persons.keys().copied().filter(|id| !mappings.contains_source(*id)).collect();
        unmatched_source.sort_by_key(|id| id.0);
        let mut unmatched_destination: Vec<PersonId> = dest_graph.persons.keys().copied().filter(|id| !mappings.dest_is_mapped(*id)).collect();
        unmatched_destination.sort_by_key(|id| id.0);

        let mut mapping_list: Vec<PersonMapping> = mappings.iter().cloned().collect();
        mapping_list.sort_by_key(|m| m.found_at);

        let level_stats: Vec<LevelStats> = stats_by_level.into_values().collect();
        let totals = Totals {
            persons_mapped: mapping_list.len(),
            families_examined: level_stats.iter().map(|s| s.families_examined).sum(),
            validation_issues: validation_issues.len(),
        };

        let result = CompareResult {
            anchor_source,
            anchor_dest,
            options,
            mappings: mapping_list,
            unmatched_source,
            unmatched_destination,
            validation_issues,
            level_stats,
            totals,
            interrupted,
        };

        Ok(EngineOutcome { result, log, confirmed_decisions })
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_side(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        mappings: &mut MappingTable,
        fuzzy: &dyn FuzzyMatcher,
        confirmation: &mut dyn InteractiveConfirmation,
        options: &CompareOptions,
        validation_issues: &mut Vec<crate::core::model::ValidationIssue>,
        confirmed_decisions: &mut Vec<ConfirmedMappingEntry>,
        log: &mut DetailedLog,
        queue: &mut VecDeque<(PersonId, u32)>,
        processed: &mut HashSet<PersonId>,
        next_seq: &mut u64,
        rejected_pairs: &HashSet<(PersonId, Option<PersonId>)>,
        sid: PersonId,
        did: PersonId,
        level: u32,
        side: FamilySide,
        stats_by_level: &mut BTreeMap<u32, LevelStats>,
    ) {
        let source_family_ids: Vec<FamilyId> = match side {
            FamilySide::Spouse => TreeNavigator::families_as_spouse(source_graph, sid).to_vec(),
            FamilySide::Child => TreeNavigator::families_as_child(source_graph, sid).to_vec(),
        };
        let dest_family_ids: Vec<FamilyId> = match side {
            FamilySide::Spouse => TreeNavigator::families_as_spouse(dest_graph, did).to_vec(),
            FamilySide::Child => TreeNavigator::families_as_child(dest_graph, did).to_vec(),
        };

        stats_by_level.entry(level).or_insert_with(|| LevelStats { level, ..Default::default() }).families_examined += source_family_ids.len();

        let next_level = level + 1;
        let level_allowed = options.max_level == 0 || next_level <= options.max_level;

        for source_family_id in source_family_ids {
            let Some(source_family) = source_graph.family(source_family_id) else { continue };

            let (chosen, candidate_log) = FamilyMatcher::choose(source_graph, dest_graph, source_family, &dest_family_ids, mappings, fuzzy);
            for candidate in &candidate_log {
                log.debug(
                    level,
                    format!(
                        "family {source_family_id} candidate {}: structure={:.1} combined={:.1} conflict={:?}",
                        candidate.candidate_family_id, candidate.structure_score, candidate.combined_score, candidate.conflict
                    ),
                );
            }

            let Some(dest_family_id) = chosen else {
                log.info(level, format!("no aligning destination family found for source family {source_family_id}"));
                continue;
            };
            let Some(dest_family) = dest_graph.family(dest_family_id) else { continue };

            let proposals = FamilyMemberMatcher::match_family(source_graph, dest_graph, source_family, dest_family, mappings, fuzzy, options.threshold_strategy, options.base_threshold, next_level, sid, next_seq);

            for proposal in proposals {
                if processed.contains(&proposal.source_id) {
                    log.debug(level, format!("{} already processed; discarding later proposal", proposal.source_id));
                    continue;
                }

                let issues = WaveMappingValidator::validate(source_graph, dest_graph, &proposal, mappings);
                let passed = WaveMappingValidator::passes(&issues);
                validation_issues.extend(issues);
                if !passed {
                    log.warning(level, format!("{} -> {} rejected by validator", proposal.source_id, proposal.dest_id));
                    continue;
                }

                let accepted = if options.interactive {
                    Self::adjudicate(
                        source_graph,
                        dest_graph,
                        mappings,
                        fuzzy,
                        confirmation,
                        options,
                        confirmed_decisions,
                        rejected_pairs,
                        proposal,
                        next_seq,
                    )
                } else {
                    Some(proposal)
                };

                let Some(accepted) = accepted else {
                    continue;
                };

                log.info(level, format!("{} -> {} accepted via {:?}", accepted.source_id, accepted.dest_id, accepted.found_via));
                let accepted_source_id = accepted.source_id;
                mappings.insert(accepted);
                processed.insert(accepted_source_id);
                if level_allowed {
                    queue.push_back((accepted_source_id, next_level));
                }
                stats_by_level.entry(level).or_insert_with(|| LevelStats { level, ..Default::default() }).new_mappings += 1;
            }

            if level_allowed {
                for member in source_family.spouses().into_iter().chain(source_family.child_ids.iter().copied()) {
                    if processed.insert(member) {
                        queue.push_back((member, next_level));
                        log.debug(level, format!("{member} enqueued as an exploration seed"));
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn adjudicate(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
        confirmation: &mut dyn InteractiveConfirmation,
        options: &CompareOptions,
        confirmed_decisions: &mut Vec<ConfirmedMappingEntry>,
        rejected_pairs: &HashSet<(PersonId, Option<PersonId>)>,
        proposal: PersonMapping,
        next_seq: &mut u64,
    ) -> Option<PersonMapping> {
        if rejected_pairs.contains(&(proposal.source_id, Some(proposal.dest_id))) || rejected_pairs.contains(&(proposal.source_id, None)) {
            confirmed_decisions.push(ConfirmedMappingEntry {
                source_id: proposal.source_id,
                dest_id: Some(proposal.dest_id),
                decision_type: ConfirmedDecisionType::Rejected,
                confirmed_at: *next_seq,
                original_score: proposal.score,
            });
            *next_seq += 1;
            return None;
        }

        if proposal.score >= options.low_confidence_threshold {
            return Some(proposal);
        }
        if proposal.score < options.min_confidence_threshold {
            confirmed_decisions.push(ConfirmedMappingEntry {
                source_id: proposal.source_id,
                dest_id: Some(proposal.dest_id),
                decision_type: ConfirmedDecisionType::Rejected,
                confirmed_at: *next_seq,
                original_score: proposal.score,
            });
            *next_seq += 1;
            return None;
        }

        let Some(source_person) = source_graph.person(proposal.source_id) else {
            return None;
        };
        let mut candidate_ids: Vec<PersonId> = TreeNavigator::immediate_relatives(dest_graph, proposal.dest_id).into_iter().map(|(id, _)| id).collect();
        if !candidate_ids.contains(&proposal.dest_id) {
            candidate_ids.push(proposal.dest_id);
        }
        let candidate_persons: Vec<_> = candidate_ids.iter().filter_map(|id| dest_graph.person(*id)).collect();
        let mut ranked = fuzzy.find_matches(source_person, &candidate_persons, 0);
        ranked.truncate(options.max_candidates.max(1));

        let dest_spouses = TreeNavigator::spouses(dest_graph, proposal.dest_id);
        let candidates: Vec<CandidateOption> = ranked
            .iter()
            .map(|candidate_match| {
                let score = fuzzy.compare(source_person, dest_graph.person(candidate_match.candidate_id).unwrap());
                CandidateOption {
                    dest_id: candidate_match.candidate_id,
                    score: candidate_match.score,
                    field_breakdown: vec![
                        (crate::core::fuzzy::MatchField::FirstName, score.sub_score(crate::core::fuzzy::MatchField::FirstName)),
                        (crate::core::fuzzy::MatchField::LastName, score.sub_score(crate::core::fuzzy::MatchField::LastName)),
                        (crate::core::fuzzy::MatchField::BirthDate, score.sub_score(crate::core::fuzzy::MatchField::BirthDate)),
                        (crate::core::fuzzy::MatchField::BirthPlace, score.sub_score(crate::core::fuzzy::MatchField::BirthPlace)),
                    ],
                    matching_parent_count: TreeNavigator::parents(dest_graph, candidate_match.candidate_id)
                        .iter()
                        .filter(|p| mappings.dest_is_mapped(**p))
                        .count(),
                    matching_child_count: TreeNavigator::children(dest_graph, candidate_match.candidate_id)
                        .iter()
                        .filter(|c| mappings.dest_is_mapped(**c))
                        .count(),
                    matching_sibling_count: TreeNavigator::siblings(dest_graph, candidate_match.candidate_id)
                        .iter()
                        .filter(|s| mappings.dest_is_mapped(**s))
                        .count(),
                    spouse_match: dest_spouses.contains(&candidate_match.candidate_id),
                }
            })
            .collect();

        let request = AdjudicationRequest { source_id: proposal.source_id, candidates };
        let response = confirmation.ask(&request);

        let entry_dest_id = Some(proposal.dest_id);
        match response.decision {
            AdjudicationDecision::Confirmed => {
                let (final_dest_id, final_score) = match response.selected_index.and_then(|i| request.candidates.get(i)) {
                    Some(chosen) => (chosen.dest_id, chosen.score),
                    None => (proposal.dest_id, proposal.score),
                };
                confirmed_decisions.push(ConfirmedMappingEntry {
                    source_id: proposal.source_id,
                    dest_id: Some(final_dest_id),
                    decision_type: ConfirmedDecisionType::Confirmed,
                    confirmed_at: *next_seq,
                    original_score: proposal.score,
                });
                *next_seq += 1;
                Some(PersonMapping {
                    dest_id: final_dest_id,
                    score: final_score,
                    ..proposal
                })
            }
            AdjudicationDecision::Rejected => {
                confirmed_decisions.push(ConfirmedMappingEntry {
                    source_id: proposal.source_id,
                    dest_id: entry_dest_id,
                    decision_type: ConfirmedDecisionType::Rejected,
                    confirmed_at: *next_seq,
                    original_score: proposal.score,
                });
                *next_seq += 1;
                None
            }
            AdjudicationDecision::Skipped => {
                confirmed_decisions.push(ConfirmedMappingEntry {
                    source_id: proposal.source_id,
                    dest_id: entry_dest_id,
                    decision_type: ConfirmedDecisionType::Skipped,
                    confirmed_at: *next_seq,
                    original_score: proposal.score,
                });
                *next_seq += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adjudicator::AutoRejectConfirmation;
    use crate::core::fuzzy::DefaultFuzzyMatcher;
    use crate::core::indexer::TreeIndexer;
    use crate::core::model::{DateInfo, Family, LoadedTree, Person};

    fn person(first: &str, last: &str, year: i32) -> Person {
        Person {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            birth: Some(DateInfo {
                year: Some(year),
                ..Default::default()
            }),
            ..Person::new(PersonId::new())
        }
    }

    #[test]
    fn anchor_only_disjoint_trees() {
        let mut source_loaded = LoadedTree::default();
        let p1 = person("John", "Smith", 1950);
        let p1_id = p1.id;
        source_loaded.persons.insert(p1_id, p1);
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let d1 = person("John", "Smith", 1950);
        let d1_id = d1.id;
        let d2 = person("Zelda", "Okafor", 1990);
        let d2_id = d2.id;
        dest_loaded.persons.insert(d1_id, d1);
        dest_loaded.persons.insert(d2_id, d2);
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let fuzzy = DefaultFuzzyMatcher;
        let mut confirmation = AutoRejectConfirmation;
        let outcome = WaveCompareEngine::run(&source_graph, &dest_graph, p1_id, d1_id, CompareOptions::default(), &fuzzy, &mut confirmation, None, || false).unwrap();

        assert_eq!(outcome.result.mappings.len(), 1);
        assert_eq!(outcome.result.mappings[0].dest_id, d1_id);
        assert!(outcome.result.unmatched_source.is_empty());
        assert_eq!(outcome.result.unmatched_destination, vec![d2_id]);
    }

    #[test]
    fn spouse_propagates_one_level() {
        let mut source_loaded = LoadedTree::default();
        let p1 = person("John", "Smith", 1950);
        let p2 = person("Jane", "Smith", 1952);
        let (p1_id, p2_id) = (p1.id, p2.id);
        source_loaded.persons.insert(p1_id, p1);
        source_loaded.persons.insert(p2_id, p2);
        let source_family_id = FamilyId::new();
        source_loaded.families.insert(
            source_family_id,
            Family {
                id: source_family_id,
                husband_id: Some(p1_id),
                wife_id: Some(p2_id),
                ..Default::default()
            },
        );
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let d1 = person("John", "Smith", 1950);
        let d2 = person("Jane", "Smith", 1952);
        let (d1_id, d2_id) = (d1.id, d2.id);
        dest_loaded.persons.insert(d1_id, d1);
        dest_loaded.persons.insert(d2_id, d2);
        let dest_family_id = FamilyId::new();
        dest_loaded.families.insert(
            dest_family_id,
            Family {
                id: dest_family_id,
                husband_id: Some(d1_id),
                wife_id: Some(d2_id),
                ..Default::default()
            },
        );
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let fuzzy = DefaultFuzzyMatcher;
        let mut confirmation = AutoRejectConfirmation;
        let mut options = CompareOptions::default();
        options.resolve_conflicts = false;
        let outcome = WaveCompareEngine::run(&source_graph, &dest_graph, p1_id, d1_id, options, &fuzzy, &mut confirmation, None, || false).unwrap();

        assert_eq!(outcome.result.mappings.len(), 2);
        let spouse_mapping = outcome.result.mappings.iter().find(|m| m.source_id == p2_id).unwrap();
        assert_eq!(spouse_mapping.dest_id, d2_id);
        assert_eq!(spouse_mapping.found_via, RelationType::Spouse);
        assert_eq!(spouse_mapping.level, 1);
    }

    #[test]
    fn unknown_anchor_source_is_a_configuration_error() {
        let source_graph = TreeIndexer::build(&LoadedTree::default());
        let dest_graph = TreeIndexer::build(&LoadedTree::default());
        let fuzzy = DefaultFuzzyMatcher;
        let mut confirmation = AutoRejectConfirmation;
        let result = WaveCompareEngine::run(&source_graph, &dest_graph, PersonId::new(), PersonId::new(), CompareOptions::default(), &fuzzy, &mut confirmation, None, || false);
        assert!(result.is_err());
    }
}
