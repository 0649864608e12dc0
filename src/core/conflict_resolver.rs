//! `MappingConflictResolver` — the single place a previously accepted,
//! non-anchor mapping may be rewritten, run once after BFS drains.
//! Anchors are immutable.

use std::collections::HashSet;

use crate::core::fuzzy::{CandidateMatch, FuzzyMatcher};
use crate::core::model::{MappingTable, PersonId, TreeGraph};
use crate::core::navigator::TreeNavigator;

pub struct MappingConflictResolver;

struct ResolverTuple {
    source_id: PersonId,
    dest_id: PersonId,
    score: u8,
    exclusivity: f32,
}

impl MappingConflictResolver {
    pub fn resolve(source_graph: &TreeGraph, dest_graph: &TreeGraph, mappings: &mut MappingTable, fuzzy: &dyn FuzzyMatcher) {
        let mut non_anchor_sources: Vec<PersonId> = mappings.iter().filter(|m| !mappings.is_anchor(m.source_id)).map(|m| m.source_id).collect();
        non_anchor_sources.sort_by_key(|id| id.0);

        let mut tuples = Vec::new();
        for source_id in non_anchor_sources {
            tuples.extend(Self::tuples_for_source(source_graph, dest_graph, mappings, fuzzy, source_id));
        }

        tuples.sort_by(|a, b| {
            b.exclusivity
                .partial_cmp(&a.exclusivity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.source_id.0.cmp(&b.source_id.0))
                .then_with(|| a.dest_id.0.cmp(&b.dest_id.0))
        });

        let mut assigned_sources = HashSet::new();
        let mut assigned_dests: HashSet<PersonId> = mappings.iter().filter(|m| mappings.is_anchor(m.source_id)).map(|m| m.dest_id).collect();

        let mut rewrites = Vec::new();
        for tuple in tuples {
            if assigned_sources.contains(&tuple.source_id) || assigned_dests.contains(&tuple.dest_id) {
                continue;
            }
            assigned_sources.insert(tuple.source_id);
            assigned_dests.insert(tuple.dest_id);
            rewrites.push((tuple.source_id, tuple.dest_id, tuple.score));
        }

        for (source_id, dest_id, score) in rewrites {
            let unchanged = mappings.get(source_id).is_some_and(|m| m.dest_id == dest_id && m.score == score);
            if !unchanged {
                mappings.rewrite_non_anchor(source_id, dest_id, score);
            }
        }
    }

    fn tuples_for_source(source_graph: &TreeGraph, dest_graph: &TreeGraph, mappings: &MappingTable, fuzzy: &dyn FuzzyMatcher, source_id: PersonId) -> Vec<ResolverTuple> {
        let Some(current) = mappings.get(source_id) else {
            return Vec::new();
        };
        let Some(source_person) = source_graph.person(source_id) else {
            return Vec::new();
        };

        let candidate_ids = two_degree_relatives(dest_graph, current.dest_id);
        let candidate_persons: Vec<_> = candidate_ids.iter().filter_map(|id| dest_graph.person(*id)).collect();
        let mut matches = fuzzy.find_matches(source_person, &candidate_persons, 50);

        if !matches.iter().any(|m| m.candidate_id == current.dest_id) {
            matches.push(CandidateMatch {
                candidate_id: current.dest_id,
                score: current.score,
                reasons: Vec::new(),
            });
            matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.candidate_id.0.cmp(&b.candidate_id.0)));
        }

        let best_score = matches.first().map(|m| m.score).unwrap_or(0);
        let second_score = matches.get(1).map(|m| m.score).unwrap_or(0);
        let exclusivity = if best_score == 0 { 0.0 } else { (best_score as f32 - second_score as f32) / best_score as f32 };

        matches
            .into_iter()
            .map(|m| ResolverTuple {
                source_id,
                dest_id: m.candidate_id,
                score: m.score,
                exclusivity,
            })
            .collect()
    }
}

/// Self plus parents, spouses, children, siblings, grandparents,
/// grandchildren, nieces/nephews, aunts/uncles, and step-parents via a
/// parent's other spouses.
fn two_degree_relatives(graph: &TreeGraph, id: PersonId) -> Vec<PersonId> {
    let mut seen = HashSet::new();
    seen.insert(id);

    let parents = TreeNavigator::parents(graph, id);
    let spouses = TreeNavigator::spouses(graph, id);
    let children = TreeNavigator::children(graph, id);
    let siblings = TreeNavigator::siblings(graph, id);

    let mut extra = Vec::new();
    for &parent in &parents {
        extra.extend(TreeNavigator::parents(graph, parent)); // grandparents
        extra.extend(TreeNavigator::siblings(graph, parent)); // aunts/uncles
        extra.extend(TreeNavigator::spouses(graph, parent)); // step-parents
    }
    for &child in &children {
        extra.extend(TreeNavigator::children(graph, child)); // grandchildren
    }
    for &sibling in &siblings {
        extra.extend(TreeNavigator::children(graph, sibling)); // nieces/nephews
    }

    let mut out = Vec::new();
    for candidate in parents.into_iter().chain(spouses).chain(children).chain(siblings).chain(extra) {
        if seen.insert(candidate) {
            out.push(candidate);
        }
    }
    out
}
