//! `TreeIndexer` — builds an immutable indexed `TreeGraph` from a loaded
//! tree. Pure function, never mutates its input, never fails
//! fatally: a family referencing a missing person is skipped and logged.

use std::collections::HashMap;

use crate::core::model::{
    normalize_last_name, FamilyId, IndexWarning, LoadedTree, Person, PersonId, TreeGraph,
};

pub struct TreeIndexer;

impl TreeIndexer {
    pub fn build(loaded: &LoadedTree) -> TreeGraph {
        let mut persons = loaded.persons.clone();
        let mut families = HashMap::new();
        let mut person_to_families_as_spouse: HashMap<PersonId, Vec<FamilyId>> = HashMap::new();
        let mut person_to_families_as_child: HashMap<PersonId, Vec<FamilyId>> = HashMap::new();
        let mut warnings = Vec::new();

        let mut family_ids: Vec<&FamilyId> = loaded.families.keys().collect();
        family_ids.sort_by_key(|id| id.0);

        for family_id in family_ids {
            let family = &loaded.families[family_id];
            if let Some(missing) = first_missing_person(family, &persons) {
                warnings.push(IndexWarning {
                    family_id: *family_id,
                    message: format!("family {family_id} references missing person {missing}"),
                });
                tracing::warn!(%family_id, %missing, "skipping malformed family during indexing");
                continue;
            }

            families.insert(*family_id, family.clone());

            for spouse_id in family.spouses() {
                person_to_families_as_spouse
                    .entry(spouse_id)
                    .or_default()
                    .push(*family_id);
            }
            for child_id in &family.child_ids {
                person_to_families_as_child
                    .entry(*child_id)
                    .or_default()
                    .push(*family_id);
            }
        }

        for families in person_to_families_as_spouse.values_mut() {
            families.sort_by_key(|id| id.0);
        }
        for families in person_to_families_as_child.values_mut() {
            families.sort_by_key(|id| id.0);
        }

        derive_siblings(&mut persons, &families);
        precompute_normalized_last_names(&mut persons);

        let persons_by_birth_year = bucket_by_birth_year(&persons);
        let persons_by_normalized_last_name = bucket_by_normalized_last_name(&persons);

        TreeGraph {
            persons,
            families,
            person_to_families_as_spouse,
            person_to_families_as_child,
            persons_by_birth_year,
            persons_by_normalized_last_name,
            warnings,
        }
    }
}

fn first_missing_person(
    family: &crate::core::model::Family,
    persons: &HashMap<PersonId, Person>,
) -> Option<PersonId> {
    family
        .spouses()
        .into_iter()
        .chain(family.child_ids.iter().copied())
        .find(|id| !persons.contains_key(id))
}

fn derive_siblings(
    persons: &mut HashMap<PersonId, Person>,
    families: &HashMap<FamilyId, crate::core::model::Family>,
) {
    let mut family_ids: Vec<&FamilyId> = families.keys().collect();
    family_ids.sort_by_key(|id| id.0);

    let mut sibling_sets: HashMap<PersonId, Vec<PersonId>> = HashMap::new();
    for family_id in family_ids {
        let family = &families[family_id];
        for &child in &family.child_ids {
            let siblings: Vec<PersonId> = family
                .child_ids
                .iter()
                .copied()
                .filter(|&id| id != child)
                .collect();
            sibling_sets.entry(child).or_default().extend(siblings);
        }
    }
    for (id, siblings) in sibling_sets {
        if let Some(person) = persons.get_mut(&id) {
            let mut deduped = Vec::new();
            for s in siblings {
                if s != id && !deduped.contains(&s) {
                    deduped.push(s);
                }
            }
            person.sibling_ids = deduped;
        }
    }
}

fn precompute_normalized_last_names(persons: &mut HashMap<PersonId, Person>) {
    for person in persons.values_mut() {
        person.normalized_last_name = person.last_name.as_deref().map(normalize_last_name);
    }
}

fn bucket_by_birth_year(persons: &HashMap<PersonId, Person>) -> HashMap<i32, Vec<PersonId>> {
    let mut buckets: HashMap<i32, Vec<PersonId>> = HashMap::new();
    for person in persons.values() {
        if let Some(year) = person.birth.as_ref().and_then(|b| b.year()) {
            buckets.entry(year).or_default().push(person.id);
        }
    }
    buckets
}

fn bucket_by_normalized_last_name(persons: &HashMap<PersonId, Person>) -> HashMap<String, Vec<PersonId>> {
    let mut buckets: HashMap<String, Vec<PersonId>> = HashMap::new();
    for person in persons.values() {
        if let Some(key) = &person.normalized_last_name {
            buckets.entry(key.clone()).or_default().push(person.id);
        }
    }
    buckets
}
