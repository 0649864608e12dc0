//! The `FuzzyMatcher` contract and a deterministic reference
//! implementation.
//!
//! The engine only depends on the trait: a production deployment injects
//! its own matcher (treated as an external collaborator port). This crate
//! ships `DefaultFuzzyMatcher` so the engine, its tests, and the demo CLI
//! are runnable without any injected collaborator. It is not meant to be
//! a production-quality name matcher.

use serde::{Deserialize, Serialize};

use crate::core::model::{Gender, Person};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchField {
    FirstName,
    LastName,
    MaidenName,
    BirthDate,
    BirthPlace,
    Gender,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReason {
    pub field: MatchField,
    pub points: i32,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u8,
    pub reasons: Vec<MatchReason>,
}

impl MatchScore {
    /// Per-field sub-score in 0..1, using the documented weights
    /// (25/20/15/10 for first/last/birth-date/birth-place), for the
    /// interactive adjudicator's candidate breakdown display.
    pub fn sub_score(&self, field: MatchField) -> f32 {
        let weight = match field {
            MatchField::FirstName => 25.0,
            MatchField::LastName => 20.0,
            MatchField::BirthDate => 15.0,
            MatchField::BirthPlace => 10.0,
            MatchField::MaidenName | MatchField::Gender => return 0.0,
        };
        let points: i32 = self
            .reasons
            .iter()
            .filter(|r| r.field == field)
            .map(|r| r.points)
            .sum();
        (points as f32 / weight).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub candidate_id: crate::core::model::PersonId,
    pub score: u8,
    pub reasons: Vec<MatchReason>,
}

/// External collaborator contract: deterministic, side-effect-free,
/// symmetric up to rounding.
pub trait FuzzyMatcher {
    fn compare(&self, a: &Person, b: &Person) -> MatchScore;

    fn find_matches(&self, person: &Person, candidates: &[&Person], min_score: u8) -> Vec<CandidateMatch> {
        let mut matches: Vec<CandidateMatch> = candidates
            .iter()
            .map(|candidate| {
                let score = self.compare(person, candidate);
                CandidateMatch {
                    candidate_id: candidate.id,
                    score: score.score,
                    reasons: score.reasons,
                }
            })
            .filter(|m| m.score >= min_score)
            .collect();

        matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.candidate_id.0.cmp(&b.candidate_id.0)));
        matches
    }
}

/// Reference `FuzzyMatcher` built from simple, deterministic string and
/// date-proximity heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFuzzyMatcher;

impl FuzzyMatcher for DefaultFuzzyMatcher {
    fn compare(&self, a: &Person, b: &Person) -> MatchScore {
        let mut reasons = Vec::new();
        let mut total: i32 = 0;

        if let (Some(fa), Some(fb)) = (&a.first_name, &b.first_name) {
            let sim = string_similarity(fa, fb);
            let points = (sim * 25.0).round() as i32;
            total += points;
            reasons.push(MatchReason {
                field: MatchField::FirstName,
                points,
                details: format!("'{fa}' vs '{fb}' (similarity {sim:.2})"),
            });
        }

        if let (Some(la), Some(lb)) = (&a.last_name, &b.last_name) {
            let sim = string_similarity(la, lb);
            let points = (sim * 20.0).round() as i32;
            total += points;
            reasons.push(MatchReason {
                field: MatchField::LastName,
                points,
                details: format!("'{la}' vs '{lb}' (similarity {sim:.2})"),
            });
        }

        for (maiden, last, label) in [
            (&a.maiden_name, &b.last_name, "a.maiden vs b.last"),
            (&b.maiden_name, &a.last_name, "b.maiden vs a.last"),
        ] {
            if let (Some(m), Some(l)) = (maiden, last) {
                let sim = string_similarity(m, l);
                let points = (sim * 20.0).round() as i32;
                if points > 0 {
                    total += points;
                    reasons.push(MatchReason {
                        field: MatchField::MaidenName,
                        points,
                        details: format!("{label}: '{m}' vs '{l}' (similarity {sim:.2})"),
                    });
                }
            }
        }

        if let (Some(ba), Some(bb)) = (&a.birth, &b.birth) {
            if let (Some(ya), Some(yb)) = (ba.year(), bb.year()) {
                let diff = (ya - yb).abs();
                let points = match diff {
                    0 => 15,
                    1..=2 => 10,
                    3..=5 => 5,
                    _ => 0,
                };
                total += points;
                reasons.push(MatchReason {
                    field: MatchField::BirthDate,
                    points,
                    details: format!("birth years {ya} vs {yb} (diff {diff})"),
                });
            }
        }

        if let (Some(pa), Some(pb)) = (&a.birth_place, &b.birth_place) {
            let sim = string_similarity(pa, pb);
            let points = (sim * 10.0).round() as i32;
            total += points;
            reasons.push(MatchReason {
                field: MatchField::BirthPlace,
                points,
                details: format!("'{pa}' vs '{pb}' (similarity {sim:.2})"),
            });
        }

        if a.gender != Gender::Unknown && b.gender != Gender::Unknown {
            let points = if a.gender == b.gender { 10 } else { -20 };
            total += points;
            reasons.push(MatchReason {
                field: MatchField::Gender,
                points,
                details: format!("{:?} vs {:?}", a.gender, b.gender),
            });
        }

        MatchScore {
            score: total.clamp(0, 100) as u8,
            reasons,
        }
    }
}

/// Normalized similarity in 0..1 based on case-insensitive Levenshtein
/// distance. `1.0` for an exact match (after trimming/lowercasing), `0.0`
/// for completely dissimilar strings of any length.
fn string_similarity(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = levenshtein(&a, &b);
    let max_len = a.chars().count().max(b.chars().count()) as f32;
    (1.0 - (distance as f32 / max_len)).max(0.0)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut row: Vec<usize> = (0..=m).collect();

    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = temp;
        }
    }
    row[m]
}
