//! `WaveMappingValidator` — gates every proposed mapping before it is
//! inserted into the mapping table. Runs the checks in order
//! but never short-circuits: every issue, passing or not, is accumulated
//! so the final report can show why a mapping was accepted or rejected.

use crate::core::model::{Gender, MappingTable, PersonMapping, TreeGraph, ValidationIssue, ValidationIssueKind, ValidationSeverity};
use crate::core::navigator::TreeNavigator;

pub struct WaveMappingValidator;

impl WaveMappingValidator {
    pub fn validate(source_graph: &TreeGraph, dest_graph: &TreeGraph, mapping: &PersonMapping, mappings: &MappingTable) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let source_person = source_graph.person(mapping.source_id);
        let dest_person = dest_graph.person(mapping.dest_id);

        if source_person.is_none() {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::High,
                kind: ValidationIssueKind::InvalidSourceId,
                source_id: Some(mapping.source_id),
                dest_id: None,
                message: format!("source id {} not found in source tree", mapping.source_id),
            });
        }
        if dest_person.is_none() {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::High,
                kind: ValidationIssueKind::InvalidDestId,
                source_id: None,
                dest_id: Some(mapping.dest_id),
                message: format!("destination id {} not found in destination tree", mapping.dest_id),
            });
        }
        let (Some(source_person), Some(dest_person)) = (source_person, dest_person) else {
            return issues;
        };

        if source_person.gender != Gender::Unknown && dest_person.gender != Gender::Unknown && source_person.gender != dest_person.gender {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::High,
                kind: ValidationIssueKind::GenderMismatch,
                source_id: Some(mapping.source_id),
                dest_id: Some(mapping.dest_id),
                message: format!("{:?} vs {:?}", source_person.gender, dest_person.gender),
            });
        }

        if let Some(issue) = year_issue(
            source_person.birth.as_ref().and_then(|d| d.year()),
            dest_person.birth.as_ref().and_then(|d| d.year()),
            ValidationIssueKind::BirthYearMismatch,
            mapping,
        ) {
            issues.push(issue);
        }
        if let Some(issue) = year_issue(
            source_person.death.as_ref().and_then(|d| d.year()),
            dest_person.death.as_ref().and_then(|d| d.year()),
            ValidationIssueKind::DeathYearMismatch,
            mapping,
        ) {
            issues.push(issue);
        }

        if let Some(other_source) = mappings.dest_taken_by_other(mapping.dest_id, mapping.source_id) {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::High,
                kind: ValidationIssueKind::DuplicateMapping,
                source_id: Some(mapping.source_id),
                dest_id: Some(mapping.dest_id),
                message: format!("destination {} already claimed by source {other_source}", mapping.dest_id),
            });
        }

        if mapping.score < 40 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Medium,
                kind: ValidationIssueKind::LowMatchScore,
                source_id: Some(mapping.source_id),
                dest_id: Some(mapping.dest_id),
                message: format!("score {} below 40", mapping.score),
            });
        }

        issues.extend(family_consistency_issues(source_graph, dest_graph, mapping, mappings));

        issues
    }

    pub fn passes(issues: &[ValidationIssue]) -> bool {
        !issues.iter().any(|issue| issue.severity == ValidationSeverity::High)
    }
}

fn year_issue(source_year: Option<i32>, dest_year: Option<i32>, kind: ValidationIssueKind, mapping: &PersonMapping) -> Option<ValidationIssue> {
    let (sy, dy) = (source_year?, dest_year?);
    let delta = (sy - dy).abs();
    let severity = match delta {
        0..=5 => return None,
        6..=15 => ValidationSeverity::Medium,
        _ => ValidationSeverity::High,
    };
    Some(ValidationIssue {
        severity,
        kind,
        source_id: Some(mapping.source_id),
        dest_id: Some(mapping.dest_id),
        message: format!("years {sy} vs {dy} (diff {delta})"),
    })
}

/// For every already-mapped relative of the source person, the proposed
/// destination must agree with that relative's existing mapping.
fn family_consistency_issues(source_graph: &TreeGraph, dest_graph: &TreeGraph, mapping: &PersonMapping, mappings: &MappingTable) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Some(dest_person) = dest_graph.person(mapping.dest_id) else {
        return issues;
    };

    let mut check = |relative_source_id: Option<crate::core::model::PersonId>, relative_dest_id: Option<crate::core::model::PersonId>, label: &str| {
        let Some(relative_source_id) = relative_source_id else {
            return;
        };
        let Some(existing) = mappings.get(relative_source_id) else {
            return;
        };
        if Some(existing.dest_id) != relative_dest_id {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Medium,
                kind: ValidationIssueKind::FamilyInconsistency,
                source_id: Some(mapping.source_id),
                dest_id: Some(mapping.dest_id),
                message: format!("{label} {relative_source_id} is already mapped to {}, not the destination's {label}", existing.dest_id),
            });
        }
    };

    check(source_graph.person(mapping.source_id).and_then(|p| p.father_id), dest_person.father_id, "father");
    check(source_graph.person(mapping.source_id).and_then(|p| p.mother_id), dest_person.mother_id, "mother");

    let source_spouses = TreeNavigator::spouses(source_graph, mapping.source_id);
    let dest_spouses = TreeNavigator::spouses(dest_graph, mapping.dest_id);
    for spouse in &source_spouses {
        if let Some(existing) = mappings.get(*spouse) {
            if !dest_spouses.contains(&existing.dest_id) {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Medium,
                    kind: ValidationIssueKind::FamilyInconsistency,
                    source_id: Some(mapping.source_id),
                    dest_id: Some(mapping.dest_id),
                    message: format!("spouse {spouse} is already mapped to {}, not one of the destination's spouses", existing.dest_id),
                });
            }
        }
    }

    let source_children = TreeNavigator::children(source_graph, mapping.source_id);
    let dest_children = TreeNavigator::children(dest_graph, mapping.dest_id);
    for child in &source_children {
        if let Some(existing) = mappings.get(*child) {
            if !dest_children.contains(&existing.dest_id) {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Medium,
                    kind: ValidationIssueKind::FamilyInconsistency,
                    source_id: Some(mapping.source_id),
                    dest_id: Some(mapping.dest_id),
                    message: format!("child {child} is already mapped to {}, not one of the destination's children", existing.dest_id),
                });
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indexer::TreeIndexer;
    use crate::core::model::{DateInfo, FamilyId, Family, LoadedTree, Person, PersonId, RelationType};

    fn person(first: &str, year: i32) -> Person {
        Person {
            first_name: Some(first.to_string()),
            birth: Some(DateInfo {
                year: Some(year),
                ..Default::default()
            }),
            ..Person::new(PersonId::new())
        }
    }

    fn single_person_graphs() -> (TreeGraph, TreeGraph, PersonId, PersonId) {
        let mut source_loaded = LoadedTree::default();
        let source_person = person("John", 1950);
        let source_id = source_person.id;
        source_loaded.persons.insert(source_id, source_person);

        let mut dest_loaded = LoadedTree::default();
        let dest_person = person("John", 1950);
        let dest_id = dest_person.id;
        dest_loaded.persons.insert(dest_id, dest_person);

        (TreeIndexer::build(&source_loaded), TreeIndexer::build(&dest_loaded), source_id, dest_id)
    }

    fn base_mapping(source_id: PersonId, dest_id: PersonId, score: u8) -> PersonMapping {
        PersonMapping {
            source_id,
            dest_id,
            score,
            level: 1,
            found_via: RelationType::Child,
            found_in_family_id: None,
            found_from_person_id: None,
            found_at: 0,
        }
    }

    #[test]
    fn clean_mapping_passes() {
        let (source_graph, dest_graph, source_id, dest_id) = single_person_graphs();
        let mappings = MappingTable::new();
        let mapping = base_mapping(source_id, dest_id, 90);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(WaveMappingValidator::passes(&issues));
    }

    #[test]
    fn unknown_ids_reject() {
        let (source_graph, dest_graph, _, _) = single_person_graphs();
        let mappings = MappingTable::new();
        let mapping = base_mapping(PersonId::new(), PersonId::new(), 90);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(!WaveMappingValidator::passes(&issues));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn large_birth_year_gap_is_high() {
        let mut source_loaded = LoadedTree::default();
        let source_person = person("John", 1900);
        let source_id = source_person.id;
        source_loaded.persons.insert(source_id, source_person);
        let mut dest_loaded = LoadedTree::default();
        let dest_person = person("John", 1950);
        let dest_id = dest_person.id;
        dest_loaded.persons.insert(dest_id, dest_person);

        let source_graph = TreeIndexer::build(&source_loaded);
        let dest_graph = TreeIndexer::build(&dest_loaded);
        let mappings = MappingTable::new();
        let mapping = base_mapping(source_id, dest_id, 90);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(!WaveMappingValidator::passes(&issues));
        assert!(issues.iter().any(|i| i.kind == ValidationIssueKind::BirthYearMismatch && i.severity == ValidationSeverity::High));
    }

    #[test]
    fn duplicate_destination_rejected() {
        let (source_graph, dest_graph, source_id, dest_id) = single_person_graphs();
        let other_source = PersonId::new();
        let mut mappings = MappingTable::new();
        mappings.insert_anchor(base_mapping(other_source, dest_id, 100));
        let mapping = base_mapping(source_id, dest_id, 90);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(!WaveMappingValidator::passes(&issues));
        assert!(issues.iter().any(|i| i.kind == ValidationIssueKind::DuplicateMapping));
    }

    #[test]
    fn low_score_is_medium_not_rejecting() {
        let (source_graph, dest_graph, source_id, dest_id) = single_person_graphs();
        let mappings = MappingTable::new();
        let mapping = base_mapping(source_id, dest_id, 20);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(WaveMappingValidator::passes(&issues));
        assert!(issues.iter().any(|i| i.kind == ValidationIssueKind::LowMatchScore));
    }

    #[test]
    fn family_inconsistency_flagged_when_spouse_points_elsewhere() {
        let mut source_loaded = LoadedTree::default();
        let s_husband = person("John", 1950);
        let s_wife = person("Jane", 1952);
        let (s_husband_id, s_wife_id) = (s_husband.id, s_wife.id);
        source_loaded.persons.insert(s_husband_id, s_husband);
        source_loaded.persons.insert(s_wife_id, s_wife);
        let source_family_id = FamilyId::new();
        source_loaded.families.insert(
            source_family_id,
            Family {
                id: source_family_id,
                husband_id: Some(s_husband_id),
                wife_id: Some(s_wife_id),
                ..Default::default()
            },
        );
        let source_graph = TreeIndexer::build(&source_loaded);

        let mut dest_loaded = LoadedTree::default();
        let d_husband = person("John", 1950);
        let d_wife_a = person("Jane", 1952);
        let d_wife_b = person("Someone", 1953);
        let (d_husband_id, d_wife_a_id, d_wife_b_id) = (d_husband.id, d_wife_a.id, d_wife_b.id);
        dest_loaded.persons.insert(d_husband_id, d_husband);
        dest_loaded.persons.insert(d_wife_a_id, d_wife_a);
        dest_loaded.persons.insert(d_wife_b_id, d_wife_b);
        let dest_family_id = FamilyId::new();
        dest_loaded.families.insert(
            dest_family_id,
            Family {
                id: dest_family_id,
                husband_id: Some(d_husband_id),
                wife_id: Some(d_wife_a_id),
                ..Default::default()
            },
        );
        let dest_graph = TreeIndexer::build(&dest_loaded);

        let mut mappings = MappingTable::new();
        mappings.insert_anchor(base_mapping(s_wife_id, d_wife_b_id, 90));

        let mapping = base_mapping(s_husband_id, d_husband_id, 90);
        let issues = WaveMappingValidator::validate(&source_graph, &dest_graph, &mapping, &mappings);
        assert!(WaveMappingValidator::passes(&issues));
        assert!(issues.iter().any(|i| i.kind == ValidationIssueKind::FamilyInconsistency));
    }
}
