//! `HighConfidenceReportBuilder` — derives field diffs for already-mapped
//! persons and candidate additions for unmatched source persons, from the
//! final mapping table.

use crate::core::model::{
    AddRecord, DateInfo, FieldDiff, Gender, HighConfidenceReport, MappingTable, Person, PersonId, RelationPointer, RelationType, TreeGraph, UpdateRecord,
};
use crate::core::navigator::TreeNavigator;
use crate::core::photo::PhotoComparator;

pub struct HighConfidenceReportBuilder;

impl HighConfidenceReportBuilder {
    pub fn build(source_graph: &TreeGraph, dest_graph: &TreeGraph, mappings: &MappingTable, confidence_threshold: u8, photo: &dyn PhotoComparator) -> HighConfidenceReport {
        HighConfidenceReport {
            nodes_to_update: Self::build_updates(source_graph, dest_graph, mappings, confidence_threshold, photo),
            nodes_to_add: Self::build_additions(source_graph, mappings, confidence_threshold),
        }
    }

    fn build_updates(source_graph: &TreeGraph, dest_graph: &TreeGraph, mappings: &MappingTable, confidence_threshold: u8, photo: &dyn PhotoComparator) -> Vec<UpdateRecord> {
        let mut mapping_list: Vec<_> = mappings.iter().filter(|m| m.score >= confidence_threshold).collect();
        mapping_list.sort_by_key(|m| m.source_id.0);

        let mut updates = Vec::new();
        for mapping in mapping_list {
            let (Some(source_person), Some(dest_person)) = (source_graph.person(mapping.source_id), dest_graph.person(mapping.dest_id)) else {
                continue;
            };
            let diffs = field_diffs(source_person, dest_person, photo);
            if !diffs.is_empty() {
                updates.push(UpdateRecord {
                    source_id: mapping.source_id,
                    dest_id: mapping.dest_id,
                    score: mapping.score,
                    matched_by: mapping.found_via,
                    fields_to_update: diffs,
                });
            }
        }
        updates
    }

    fn build_additions(source_graph: &TreeGraph, mappings: &MappingTable, confidence_threshold: u8) -> Vec<AddRecord> {
        let mut unmatched: Vec<PersonId> = source_graph.persons.keys().copied().filter(|id| !mappings.contains_source(*id)).collect();
        unmatched.sort_by_key(|id| id.0);

        let mut additions = Vec::new();
        for source_id in unmatched {
            let Some(person) = source_graph.person(source_id) else {
                continue;
            };
            if !person.has_any_name() {
                continue;
            }

            let Some((primary, mut additional)) = Self::high_confidence_relations(source_graph, mappings, confidence_threshold, source_id) else {
                continue;
            };

            let source_family_id = if primary.relation_type == RelationType::Child {
                TreeNavigator::families_as_child(source_graph, source_id).first().copied()
            } else {
                None
            };

            additional.sort_by_key(|r| r.related_source_id.0);

            additions.push(AddRecord {
                person: person.clone(),
                primary_relation: primary,
                additional_relations: additional,
                source_family_id,
                depth_from_existing: 1,
            });
        }
        additions
    }

    /// Priority order: all spouses, then both parents, then all children,
    /// then siblings — siblings only considered if nothing above produced
    /// a relation. The first relation found becomes primary.
    fn high_confidence_relations(graph: &TreeGraph, mappings: &MappingTable, confidence_threshold: u8, source_id: PersonId) -> Option<(RelationPointer, Vec<RelationPointer>)> {
        let mapped_at_threshold = |candidate: PersonId| mappings.get(candidate).is_some_and(|m| m.score >= confidence_threshold);

        let mut from = |ids: Vec<PersonId>, relation_type: RelationType| -> Vec<RelationPointer> {
            ids.into_iter()
                .filter(|id| mapped_at_threshold(*id))
                .map(|related_source_id| RelationPointer { related_source_id, relation_type })
                .collect()
        };

        let spouses = from(TreeNavigator::spouses(graph, source_id), RelationType::Spouse);
        if !spouses.is_empty() {
            let mut iter = spouses.into_iter();
            let primary = iter.next().unwrap();
            return Some((primary, iter.collect()));
        }

        // A related id found via `parents` is source_id's parent, so
        // source_id is that relative's child — tag Child, not Parent.
        let parents = from(TreeNavigator::parents(graph, source_id), RelationType::Child);
        if !parents.is_empty() {
            let mut iter = parents.into_iter();
            let primary = iter.next().unwrap();
            return Some((primary, iter.collect()));
        }

        // Symmetric reasoning: a related id found via `children` is
        // source_id's child, so source_id is that relative's parent.
        let children = from(TreeNavigator::children(graph, source_id), RelationType::Parent);
        if !children.is_empty() {
            let mut iter = children.into_iter();
            let primary = iter.next().unwrap();
            return Some((primary, iter.collect()));
        }

        let siblings = from(TreeNavigator::siblings(graph, source_id), RelationType::Sibling);
        if !siblings.is_empty() {
            let mut iter = siblings.into_iter();
            let primary = iter.next().unwrap();
            return Some((primary, iter.collect()));
        }

        None
    }
}

fn field_diffs(source: &Person, dest: &Person, photo: &dyn PhotoComparator) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();
    push_string_diff(&mut diffs, "firstName", &source.first_name, &dest.first_name);
    push_string_diff(&mut diffs, "middleName", &source.middle_name, &dest.middle_name);
    push_string_diff(&mut diffs, "lastName", &source.last_name, &dest.last_name);
    push_string_diff(&mut diffs, "maidenName", &source.maiden_name, &dest.maiden_name);
    push_string_diff(&mut diffs, "suffix", &source.suffix, &dest.suffix);
    push_string_diff(&mut diffs, "nickname", &source.nickname, &dest.nickname);
    push_date_diff(&mut diffs, "birthDate", &source.birth, &dest.birth);
    push_date_diff(&mut diffs, "deathDate", &source.death, &dest.death);
    push_string_diff(&mut diffs, "birthPlace", &source.birth_place, &dest.birth_place);
    push_string_diff(&mut diffs, "deathPlace", &source.death_place, &dest.death_place);
    push_string_diff(&mut diffs, "burialPlace", &source.burial_place, &dest.burial_place);
    push_string_diff(&mut diffs, "occupation", &source.occupation, &dest.occupation);

    if source.gender != Gender::Unknown && dest.gender != Gender::Unknown && source.gender != dest.gender {
        diffs.push(FieldDiff {
            field: "gender".to_string(),
            source_value: Some(format!("{:?}", source.gender)),
            dest_value: Some(format!("{:?}", dest.gender)),
        });
    }

    if source.photo_fingerprints.iter().any(|s| !dest.photo_fingerprints.iter().any(|d| photo.equivalent(s, d))) {
        diffs.push(FieldDiff {
            field: "photoFingerprints".to_string(),
            source_value: Some(source.photo_fingerprints.join(",")),
            dest_value: Some(dest.photo_fingerprints.join(",")),
        });
    }

    diffs
}

fn push_string_diff(diffs: &mut Vec<FieldDiff>, field: &str, source: &Option<String>, dest: &Option<String>) {
    if source.is_some() && source != dest {
        diffs.push(FieldDiff {
            field: field.to_string(),
            source_value: source.clone(),
            dest_value: dest.clone(),
        });
    }
}

fn push_date_diff(diffs: &mut Vec<FieldDiff>, field: &str, source: &Option<DateInfo>, dest: &Option<DateInfo>) {
    let Some(source) = source else { return };
    let matches = dest.as_ref().is_some_and(|d| d.year == source.year && d.month == source.month && d.day == source.day);
    if !matches {
        diffs.push(FieldDiff {
            field: field.to_string(),
            source_value: Some(source.original.clone().unwrap_or_else(|| format!("{:?}", source.year))),
            dest_value: dest.as_ref().map(|d| d.original.clone().unwrap_or_else(|| format!("{:?}", d.year))),
        });
    }
}
