//! `TreeNavigator` — stateless helpers over a `TreeGraph`.
//! Every function here is pure; self-loops from malformed data (a person
//! listed as their own spouse or child) are filtered out.

use crate::core::model::{FamilyId, PersonId, RelationType, TreeGraph};

pub struct TreeNavigator;

impl TreeNavigator {
    pub fn families_as_spouse(graph: &TreeGraph, id: PersonId) -> &[FamilyId] {
        graph
            .person_to_families_as_spouse
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn families_as_child(graph: &TreeGraph, id: PersonId) -> &[FamilyId] {
        graph
            .person_to_families_as_child
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parents(graph: &TreeGraph, id: PersonId) -> Vec<PersonId> {
        let Some(person) = graph.person(id) else {
            return Vec::new();
        };
        [person.father_id, person.mother_id]
            .into_iter()
            .flatten()
            .filter(|&p| p != id)
            .collect()
    }

    pub fn spouses(graph: &TreeGraph, id: PersonId) -> Vec<PersonId> {
        let mut out = Vec::new();
        for &family_id in Self::families_as_spouse(graph, id) {
            if let Some(family) = graph.family(family_id) {
                for spouse in family.spouses() {
                    if spouse != id && !out.contains(&spouse) {
                        out.push(spouse);
                    }
                }
            }
        }
        out
    }

    pub fn children(graph: &TreeGraph, id: PersonId) -> Vec<PersonId> {
        let mut out = Vec::new();
        for &family_id in Self::families_as_spouse(graph, id) {
            if let Some(family) = graph.family(family_id) {
                for &child in &family.child_ids {
                    if child != id && !out.contains(&child) {
                        out.push(child);
                    }
                }
            }
        }
        out
    }

    pub fn siblings(graph: &TreeGraph, id: PersonId) -> Vec<PersonId> {
        graph
            .person(id)
            .map(|p| p.sibling_ids.iter().copied().filter(|&s| s != id).collect())
            .unwrap_or_default()
    }

    /// All immediate relatives with their relation tag, duplicates removed.
    pub fn immediate_relatives(graph: &TreeGraph, id: PersonId) -> Vec<(PersonId, RelationType)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut push_all = |ids: Vec<PersonId>, relation: RelationType, out: &mut Vec<_>| {
            for other in ids {
                if other != id && seen.insert(other) {
                    out.push((other, relation));
                }
            }
        };
        push_all(Self::parents(graph, id), RelationType::Parent, &mut out);
        push_all(Self::spouses(graph, id), RelationType::Spouse, &mut out);
        push_all(Self::children(graph, id), RelationType::Child, &mut out);
        push_all(Self::siblings(graph, id), RelationType::Sibling, &mut out);
        out
    }
}
