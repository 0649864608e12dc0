//! `ThresholdCalculator` — the sole source of accept thresholds.
//! No other component hard-codes a score cutoff.

use crate::core::model::{RelationType, ThresholdStrategy};

pub struct ThresholdCalculator;

impl ThresholdCalculator {
    pub fn threshold(strategy: ThresholdStrategy, base_threshold: u8, relation: RelationType, candidate_count: usize) -> u8 {
        if strategy == ThresholdStrategy::Fixed {
            return base_threshold;
        }

        let base = relation_base(relation) as i32;
        let candidate_adjustment = candidate_count_adjustment(candidate_count);
        let strategy_bias = strategy_bias(strategy);

        (base + candidate_adjustment + strategy_bias).clamp(30, 85) as u8
    }

    pub fn spouse_threshold(strategy: ThresholdStrategy, base_threshold: u8, candidate_count: usize) -> u8 {
        Self::threshold(strategy, base_threshold, RelationType::Spouse, candidate_count)
    }

    pub fn child_threshold(strategy: ThresholdStrategy, base_threshold: u8, candidate_count: usize) -> u8 {
        Self::threshold(strategy, base_threshold, RelationType::Child, candidate_count)
    }

    pub fn parent_threshold(strategy: ThresholdStrategy, base_threshold: u8, candidate_count: usize) -> u8 {
        Self::threshold(strategy, base_threshold, RelationType::Parent, candidate_count)
    }
}

fn relation_base(relation: RelationType) -> u8 {
    match relation {
        RelationType::Anchor => 100,
        RelationType::Spouse => 40,
        RelationType::Parent => 45,
        RelationType::Child => 50,
        RelationType::Sibling => 55,
    }
}

fn candidate_count_adjustment(candidate_count: usize) -> i32 {
    match candidate_count {
        0 | 1 => -5,
        2 => 0,
        3 | 4 => 5,
        5..=8 => 10,
        _ => 15,
    }
}

fn strategy_bias(strategy: ThresholdStrategy) -> i32 {
    match strategy {
        ThresholdStrategy::Aggressive => -10,
        ThresholdStrategy::Conservative => 15,
        ThresholdStrategy::Adaptive => 0,
        ThresholdStrategy::Fixed => 0,
    }
}
