//! Property-based tests for the universal invariants every comparison run
//! must satisfy, independent of the literal scenario fixtures.
//!
//! Trees here are a single two-generation family (husband + wife + children)
//! mirrored on both sides, with an exact-score `TableFuzzyMatcher` standing
//! in for the heuristic matcher so candidate scores are fully controlled.

use std::collections::HashMap;

use proptest::prelude::*;
use wavecompare::{
    AutoRejectConfirmation, CompareOptions, DefaultFuzzyMatcher, Family, FamilyId, Gender, LoadedTree, MatchScore, Person, PersonId, ThresholdStrategy, TreeIndexer, WaveCompareEngine,
};

struct TableFuzzyMatcher {
    table: HashMap<(PersonId, PersonId), u8>,
}

impl wavecompare::FuzzyMatcher for TableFuzzyMatcher {
    fn compare(&self, a: &Person, b: &Person) -> MatchScore {
        let score = self.table.get(&(a.id, b.id)).copied().unwrap_or(0);
        MatchScore { score, reasons: Vec::new() }
    }
}

fn person(first: &str, last: &str, gender: Gender) -> Person {
    Person {
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        gender,
        ..Person::new(PersonId::new())
    }
}

/// Builds mirrored source/destination families: one husband+wife pair, plus
/// `child_count` children on each side. Returns the graphs, the anchor pair
/// (husband on both sides), and the per-pair source/dest child ids in order.
fn build_mirrored_trees(child_count: usize, genders: &[Gender]) -> (wavecompare::TreeGraph, wavecompare::TreeGraph, PersonId, PersonId, Vec<PersonId>, Vec<PersonId>) {
    let mut source_loaded = LoadedTree::default();
    let s_husband = person("Anchor", "Family", Gender::Male);
    let s_wife = person("Wife", "Family", Gender::Female);
    let (s_husband_id, s_wife_id) = (s_husband.id, s_wife.id);
    source_loaded.persons.insert(s_husband_id, s_husband);
    source_loaded.persons.insert(s_wife_id, s_wife);

    let mut dest_loaded = LoadedTree::default();
    let d_husband = person("Anchor", "Family", Gender::Male);
    let d_wife = person("Wife", "Family", Gender::Female);
    let (d_husband_id, d_wife_id) = (d_husband.id, d_wife.id);
    dest_loaded.persons.insert(d_husband_id, d_husband);
    dest_loaded.persons.insert(d_wife_id, d_wife);

    let mut source_children = Vec::new();
    let mut dest_children = Vec::new();
    for i in 0..child_count {
        let gender = genders.get(i).copied().unwrap_or(Gender::Unknown);
        let mut s_child = person(&format!("Child{i}"), "Family", gender);
        s_child.father_id = Some(s_husband_id);
        s_child.mother_id = Some(s_wife_id);
        let s_child_id = s_child.id;
        source_loaded.persons.insert(s_child_id, s_child);
        source_children.push(s_child_id);

        let mut d_child = person(&format!("Child{i}"), "Family", gender);
        d_child.father_id = Some(d_husband_id);
        d_child.mother_id = Some(d_wife_id);
        let d_child_id = d_child.id;
        dest_loaded.persons.insert(d_child_id, d_child);
        dest_children.push(d_child_id);
    }

    let sf_id = FamilyId::new();
    source_loaded.families.insert(
        sf_id,
        Family {
            id: sf_id,
            husband_id: Some(s_husband_id),
            wife_id: Some(s_wife_id),
            child_ids: source_children.clone(),
            ..Default::default()
        },
    );
    let df_id = FamilyId::new();
    dest_loaded.families.insert(
        df_id,
        Family {
            id: df_id,
            husband_id: Some(d_husband_id),
            wife_id: Some(d_wife_id),
            child_ids: dest_children.clone(),
            ..Default::default()
        },
    );

    (TreeIndexer::build(&source_loaded), TreeIndexer::build(&dest_loaded), s_husband_id, d_husband_id, source_children, dest_children)
}

fn run_engine(
    source_graph: &wavecompare::TreeGraph,
    dest_graph: &wavecompare::TreeGraph,
    anchor_source: PersonId,
    anchor_dest: PersonId,
    options: CompareOptions,
    table: HashMap<(PersonId, PersonId), u8>,
) -> wavecompare::CompareResult {
    let fuzzy = TableFuzzyMatcher { table };
    let mut confirmation = AutoRejectConfirmation;
    WaveCompareEngine::run(source_graph, dest_graph, anchor_source, anchor_dest, options, &fuzzy, &mut confirmation, None, || false)
        .expect("engine run should not fail on well-formed graphs")
        .result
}

fn scores_strategy(child_count: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=100, child_count * child_count)
}

proptest! {
    /// Property 1 (anchor invariance) and property 2 (destination uniqueness).
    #[test]
    fn anchor_invariant_and_destination_unique(child_count in 0usize..4, raw_scores in scores_strategy(4), base_threshold in 0u8..=100) {
        let child_count = child_count.min(4);
        let genders = vec![Gender::Unknown; child_count];
        let (source_graph, dest_graph, anchor_source, anchor_dest, source_children, dest_children) = build_mirrored_trees(child_count, &genders);

        let mut table = HashMap::new();
        for (i, &s) in source_children.iter().enumerate() {
            for (j, &d) in dest_children.iter().enumerate() {
                let score = raw_scores[i * child_count + j];
                table.insert((s, d), score);
            }
        }

        let options = CompareOptions {
            threshold_strategy: ThresholdStrategy::Adaptive,
            base_threshold,
            ..CompareOptions::default()
        };
        let result = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options, table);

        let anchor_mapping = result.mappings.iter().find(|m| m.source_id == anchor_source).expect("anchor must remain mapped");
        prop_assert_eq!(anchor_mapping.dest_id, anchor_dest);

        let mut seen_dest = std::collections::HashSet::new();
        for mapping in &result.mappings {
            prop_assert!(seen_dest.insert(mapping.dest_id), "destination {:?} claimed by more than one source", mapping.dest_id);
        }
    }

    /// Property 3: every accepted mapping has consistent genders (equal or
    /// at least one Unknown) — the validator rejects anything else.
    #[test]
    fn gender_consistency_holds(raw_scores in scores_strategy(3), gender_bits in prop::collection::vec(0u8..3, 3)) {
        let genders: Vec<Gender> = gender_bits
            .iter()
            .map(|b| match b {
                0 => Gender::Male,
                1 => Gender::Female,
                _ => Gender::Unknown,
            })
            .collect();
        let (source_graph, dest_graph, anchor_source, anchor_dest, source_children, dest_children) = build_mirrored_trees(3, &genders);

        let mut table = HashMap::new();
        for (i, &s) in source_children.iter().enumerate() {
            for (j, &d) in dest_children.iter().enumerate() {
                table.insert((s, d), raw_scores[i * 3 + j]);
            }
        }

        let options = CompareOptions::default();
        let result = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options, table);

        for mapping in &result.mappings {
            let source_person = source_graph.person(mapping.source_id).unwrap();
            let dest_person = dest_graph.person(mapping.dest_id).unwrap();
            prop_assert!(source_person.gender.consistent_with(&dest_person.gender));
        }
    }

    /// Property 5: under the Fixed strategy, raising baseThreshold never
    /// adds mappings and never removes the anchor.
    #[test]
    fn raising_fixed_threshold_never_adds_mappings(raw_scores in scores_strategy(3), low in 0u8..=50, delta in 1u8..=50) {
        let high = low.saturating_add(delta).min(100);
        let genders = vec![Gender::Unknown; 3];
        let (source_graph, dest_graph, anchor_source, anchor_dest, source_children, dest_children) = build_mirrored_trees(3, &genders);

        let mut table = HashMap::new();
        for (i, &s) in source_children.iter().enumerate() {
            for (j, &d) in dest_children.iter().enumerate() {
                table.insert((s, d), raw_scores[i * 3 + j]);
            }
        }

        let options_low = CompareOptions {
            threshold_strategy: ThresholdStrategy::Fixed,
            base_threshold: low,
            ..CompareOptions::default()
        };
        let options_high = CompareOptions {
            threshold_strategy: ThresholdStrategy::Fixed,
            base_threshold: high,
            ..CompareOptions::default()
        };

        let result_low = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options_low, table.clone());
        let result_high = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options_high, table);

        prop_assert!(result_high.mappings.len() <= result_low.mappings.len());

        let anchor_still_mapped = result_high.mappings.iter().any(|m| m.source_id == anchor_source && m.dest_id == anchor_dest);
        prop_assert!(anchor_still_mapped);

        let low_sources: std::collections::HashSet<_> = result_low.mappings.iter().map(|m| m.source_id).collect();
        for mapping in &result_high.mappings {
            prop_assert!(low_sources.contains(&mapping.source_id), "raising the threshold introduced a new mapping");
        }
    }

    /// Property 6: determinism — identical inputs and a fixed (non-interactive)
    /// script produce identical `CompareResult` JSON once `elapsedMillis`,
    /// which is wall-clock and excluded by design, is zeroed out first.
    #[test]
    fn determinism_across_repeated_runs(child_count in 0usize..4, raw_scores in scores_strategy(4), base_threshold in 0u8..=100) {
        let child_count = child_count.min(4);
        let genders = vec![Gender::Unknown; child_count];
        let (source_graph, dest_graph, anchor_source, anchor_dest, source_children, dest_children) = build_mirrored_trees(child_count, &genders);

        let mut table = HashMap::new();
        for (i, &s) in source_children.iter().enumerate() {
            for (j, &d) in dest_children.iter().enumerate() {
                table.insert((s, d), raw_scores[i * child_count + j]);
            }
        }

        let options = CompareOptions {
            threshold_strategy: ThresholdStrategy::Adaptive,
            base_threshold,
            ..CompareOptions::default()
        };

        let result_a = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options.clone(), table.clone());
        let result_b = run_engine(&source_graph, &dest_graph, anchor_source, anchor_dest, options, table);

        prop_assert_eq!(zero_elapsed(result_a), zero_elapsed(result_b));
    }
}

fn zero_elapsed(mut result: wavecompare::CompareResult) -> String {
    for stats in &mut result.level_stats {
        stats.elapsed_millis = 0;
    }
    serde_json::to_string(&result).expect("CompareResult always serializes")
}

/// Fuzzy compare over real heuristics instead of an exact table, to make
/// sure anchor invariance and destination uniqueness also hold against the
/// shipped `DefaultFuzzyMatcher`, not just against engineered scores.
#[test]
fn default_fuzzy_matcher_keeps_anchor_and_uniqueness() {
    let genders = vec![Gender::Male, Gender::Female, Gender::Unknown];
    let (source_graph, dest_graph, anchor_source, anchor_dest, _, _) = build_mirrored_trees(3, &genders);

    let fuzzy = DefaultFuzzyMatcher;
    let mut confirmation = AutoRejectConfirmation;
    let outcome = WaveCompareEngine::run(&source_graph, &dest_graph, anchor_source, anchor_dest, CompareOptions::default(), &fuzzy, &mut confirmation, None, || false).unwrap();

    let anchor_mapping = outcome.result.mappings.iter().find(|m| m.source_id == anchor_source).unwrap();
    assert_eq!(anchor_mapping.dest_id, anchor_dest);

    let mut seen = std::collections::HashSet::new();
    for mapping in &outcome.result.mappings {
        assert!(seen.insert(mapping.dest_id));
    }
}
