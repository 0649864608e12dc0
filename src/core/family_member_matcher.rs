//! `FamilyMemberMatcher` — matches spouses and the children-set of two
//! already-aligned families. Returns proposed `PersonMapping`s;
//! none are inserted into the mapping table here — that is the engine's job
//! after validation.

use crate::core::fuzzy::FuzzyMatcher;
use crate::core::model::{Family, MappingTable, PersonId, RelationType, TreeGraph};
use crate::core::model::{PersonMapping, ThresholdStrategy};
use crate::core::threshold::ThresholdCalculator;

pub struct FamilyMemberMatcher;

impl FamilyMemberMatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn match_family(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_family: &Family,
        dest_family: &Family,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
        strategy: ThresholdStrategy,
        base_threshold: u8,
        level: u32,
        found_from_person_id: PersonId,
        next_seq: &mut u64,
    ) -> Vec<PersonMapping> {
        let mut proposals = Self::match_spouses(
            source_graph,
            dest_graph,
            source_family,
            dest_family,
            mappings,
            fuzzy,
            strategy,
            base_threshold,
            level,
            found_from_person_id,
            next_seq,
        );
        proposals.extend(Self::match_children(
            source_graph,
            dest_graph,
            source_family,
            dest_family,
            mappings,
            fuzzy,
            strategy,
            base_threshold,
            level,
            found_from_person_id,
            next_seq,
        ));
        proposals
    }

    #[allow(clippy::too_many_arguments)]
    fn match_spouses(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_family: &Family,
        dest_family: &Family,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
        strategy: ThresholdStrategy,
        base_threshold: u8,
        level: u32,
        found_from_person_id: PersonId,
        next_seq: &mut u64,
    ) -> Vec<PersonMapping> {
        let mut out = Vec::new();
        let threshold = ThresholdCalculator::spouse_threshold(strategy, base_threshold, 1);

        for (source_slot, dest_slot) in [
            (source_family.husband_id, dest_family.husband_id),
            (source_family.wife_id, dest_family.wife_id),
        ] {
            let (Some(source_id), Some(dest_id)) = (source_slot, dest_slot) else {
                continue;
            };
            if mappings.contains_source(source_id) {
                continue;
            }
            let (Some(source_person), Some(dest_person)) = (source_graph.person(source_id), dest_graph.person(dest_id)) else {
                continue;
            };
            let score = fuzzy.compare(source_person, dest_person).score;
            if score >= threshold {
                out.push(PersonMapping {
                    source_id,
                    dest_id,
                    score,
                    level,
                    found_via: RelationType::Spouse,
                    found_in_family_id: Some(dest_family.id),
                    found_from_person_id: Some(found_from_person_id),
                    found_at: *next_seq,
                });
                *next_seq += 1;
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn match_children(
        source_graph: &TreeGraph,
        dest_graph: &TreeGraph,
        source_family: &Family,
        dest_family: &Family,
        mappings: &MappingTable,
        fuzzy: &dyn FuzzyMatcher,
        strategy: ThresholdStrategy,
        base_threshold: u8,
        level: u32,
        found_from_person_id: PersonId,
        next_seq: &mut u64,
    ) -> Vec<PersonMapping> {
        let unmatched_source: Vec<(usize, PersonId)> = source_family
            .child_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !mappings.contains_source(**id))
            .map(|(i, id)| (i, *id))
            .collect();
        let unmatched_dest: Vec<(usize, PersonId)> = dest_family
            .child_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !mappings.dest_is_mapped(**id))
            .map(|(j, id)| (j, *id))
            .collect();

        if unmatched_source.is_empty() || unmatched_dest.is_empty() {
            return Vec::new();
        }

        let threshold = ThresholdCalculator::child_threshold(
            strategy,
            base_threshold,
            unmatched_source.len().min(unmatched_dest.len()),
        );

        struct Triple {
            source_idx: usize,
            dest_idx: usize,
            source_id: PersonId,
            dest_id: PersonId,
            score: u8,
            order_delta: usize,
            year_delta: Option<i32>,
        }

        let mut triples = Vec::new();
        for (src_pos, &(i, source_id)) in unmatched_source.iter().enumerate() {
            let Some(source_person) = source_graph.person(source_id) else {
                continue;
            };
            for (dst_pos, &(j, dest_id)) in unmatched_dest.iter().enumerate() {
                let Some(dest_person) = dest_graph.person(dest_id) else {
                    continue;
                };
                if source_person.gender != crate::core::model::Gender::Unknown
                    && dest_person.gender != crate::core::model::Gender::Unknown
                    && source_person.gender != dest_person.gender
                {
                    continue;
                }

                let base = fuzzy.compare(source_person, dest_person).score as f32 * 0.6;
                let order_delta = i.abs_diff(j);
                let order_bonus = match order_delta {
                    0 | 1 => 10.0,
                    2 => 5.0,
                    _ => 0.0,
                };
                let year_delta = match (
                    source_person.birth.as_ref().and_then(|d| d.year()),
                    dest_person.birth.as_ref().and_then(|d| d.year()),
                ) {
                    (Some(ya), Some(yb)) => Some((ya - yb).abs()),
                    _ => None,
                };
                let year_bonus = match year_delta {
                    Some(0) => 15.0,
                    Some(1..=2) => 10.0,
                    Some(3..=5) => 5.0,
                    _ => 0.0,
                };

                let score = (base + order_bonus + year_bonus).round().clamp(0.0, 100.0) as u8;
                triples.push(Triple {
                    source_idx: src_pos,
                    dest_idx: dst_pos,
                    source_id,
                    dest_id,
                    score,
                    order_delta,
                    year_delta,
                });
            }
        }

        triples.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.order_delta.cmp(&b.order_delta))
                .then_with(|| {
                    let ya = a.year_delta.unwrap_or(i32::MAX);
                    let yb = b.year_delta.unwrap_or(i32::MAX);
                    ya.cmp(&yb)
                })
                .then_with(|| a.dest_id.0.cmp(&b.dest_id.0))
        });

        let mut used_source = vec![false; unmatched_source.len()];
        let mut used_dest = vec![false; unmatched_dest.len()];
        let mut out = Vec::new();

        for triple in triples {
            if triple.score < threshold {
                continue;
            }
            if used_source[triple.source_idx] || used_dest[triple.dest_idx] {
                continue;
            }
            used_source[triple.source_idx] = true;
            used_dest[triple.dest_idx] = true;
            out.push(PersonMapping {
                source_id: triple.source_id,
                dest_id: triple.dest_id,
                score: triple.score,
                level,
                found_via: RelationType::Child,
                found_in_family_id: Some(dest_family.id),
                found_from_person_id: Some(found_from_person_id),
                found_at: *next_seq,
            });
            *next_seq += 1;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fuzzy::DefaultFuzzyMatcher;
    use crate::core::indexer::TreeIndexer;
    use crate::core::model::{DateInfo, FamilyId, LoadedTree, Person};

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
    fn matches_spouse_above_threshold() {
        let mut source_loaded = LoadedTree::default();
        let s_husband = person("John", "Smith", 1950);
        let s_husband_id = s_husband.id;
        source_loaded.persons.insert(s_husband_id, s_husband);
        let source_family_id = FamilyId::new();
        source_loaded.families.insert(
            source_family_id,
            Family {
                id: source_family_id,
                husband_id: Some(s_husband_id),
                ..Default::default()
            },
        );
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let d_husband = person("John", "Smith", 1950);
        let d_husband_id = d_husband.id;
        dest_loaded.persons.insert(d_husband_id, d_husband);
        let dest_family_id = FamilyId::new();
        dest_loaded.families.insert(
            dest_family_id,
            Family {
                id: dest_family_id,
                husband_id: Some(d_husband_id),
                ..Default::default()
            },
        );
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let mappings = MappingTable::new();
        let fuzzy = DefaultFuzzyMatcher;
        let mut seq = 0;
        let proposals = FamilyMemberMatcher::match_family(
            &source_graph,
            &dest_graph,
            source_loaded.families.get(&source_family_id).unwrap(),
            dest_loaded.families.get(&dest_family_id).unwrap(),
            &mappings,
            &fuzzy,
            ThresholdStrategy::Adaptive,
            60,
            1,
            s_husband_id,
            &mut seq,
        );

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].dest_id, d_husband_id);
        assert_eq!(proposals[0].found_via, RelationType::Spouse);
    }

    #[test]
    fn matches_children_preserving_birth_order() {
        let mut source_loaded = LoadedTree::default();
        let s1 = person("Alice", "Smith", 1970);
        let s2 = person("Bob", "Smith", 1972);
        let (s1_id, s2_id) = (s1.id, s2.id);
        source_loaded.persons.insert(s1_id, s1);
        source_loaded.persons.insert(s2_id, s2);
        let source_family_id = FamilyId::new();
        source_loaded.families.insert(
            source_family_id,
            Family {
                id: source_family_id,
                child_ids: vec![s1_id, s2_id],
                ..Default::default()
            },
        );
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let d1 = person("Alice", "Smith", 1970);
        let d2 = person("Bob", "Smith", 1972);
        let (d1_id, d2_id) = (d1.id, d2.id);
        dest_loaded.persons.insert(d1_id, d1);
        dest_loaded.persons.insert(d2_id, d2);
        let dest_family_id = FamilyId::new();
        dest_loaded.families.insert(
            dest_family_id,
            Family {
                id: dest_family_id,
                child_ids: vec![d1_id, d2_id],
                ..Default::default()
            },
        );
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let mappings = MappingTable::new();
        let fuzzy = DefaultFuzzyMatcher;
        let mut seq = 0;
        let proposals = FamilyMemberMatcher::match_family(
            &source_graph,
            &dest_graph,
            source_loaded.families.get(&source_family_id).unwrap(),
            dest_loaded.families.get(&dest_family_id).unwrap(),
            &mappings,
            &fuzzy,
            ThresholdStrategy::Adaptive,
            60,
            1,
            s1_id,
            &mut seq,
        );

        assert_eq!(proposals.len(), 2);
        let dest_of = |sid: PersonId| proposals.iter().find(|p| p.source_id == sid).unwrap().dest_id;
        assert_eq!(dest_of(s1_id), d1_id);
        assert_eq!(dest_of(s2_id), d2_id);
    }

    #[test]
    fn gender_mismatch_blocks_child_pairing() {
        let mut source_loaded = LoadedTree::default();
        let mut s1 = person("Alice", "Smith", 1970);
        s1.gender = crate::core::model::Gender::Female;
        let s1_id = s1.id;
        source_loaded.persons.insert(s1_id, s1);
        let source_family_id = FamilyId::new();
        source_loaded.families.insert(
            source_family_id,
            Family {
                id: source_family_id,
                child_ids: vec![s1_id],
                ..Default::default()
            },
        );
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let mut d1 = person("Alice", "Smith", 1970);
        d1.gender = crate::core::model::Gender::Male;
        let d1_id = d1.id;
        dest_loaded.persons.insert(d1_id, d1);
        let dest_family_id = FamilyId::new();
        dest_loaded.families.insert(
            dest_family_id,
            Family {
                id: dest_family_id,
                child_ids: vec![d1_id],
                ..Default::default()
            },
        );
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let mappings = MappingTable::new();
        let fuzzy = DefaultFuzzyMatcher;
        let mut seq = 0;
        let proposals = FamilyMemberMatcher::match_family(
            &source_graph,
            &dest_graph,
            source_loaded.families.get(&source_family_id).unwrap(),
            dest_loaded.families.get(&dest_family_id).unwrap(),
            &mappings,
            &fuzzy,
            ThresholdStrategy::Adaptive,
            60,
            1,
            s1_id,
            &mut seq,
        );

        assert!(proposals.is_empty());
    }
}
