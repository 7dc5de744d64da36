use super::weights::{Category, ScoringWeights};
use super::CategoryBreakdown;

/// Ceiling of every per-category sub-score.
pub(crate) const SUBSCORE_CAP: u64 = 100;

pub(crate) fn subscore(category: Category, count: u64) -> u8 {
    let points = count
        .saturating_mul(category.points_per_event())
        .min(SUBSCORE_CAP);
    points as u8
}

/// Weighted average of the capped sub-scores, rounded half away from zero.
pub(crate) fn weighted_score(
    counts: &[(Category, u64)],
    weights: &ScoringWeights,
) -> (u8, Vec<CategoryBreakdown>) {
    let mut breakdown = Vec::with_capacity(counts.len());
    let mut raw: u64 = 0;

    for (category, count) in counts {
        let sub = subscore(*category, *count);
        let weight = weights.weight(*category);
        raw += u64::from(sub) * u64::from(weight);
        breakdown.push(CategoryBreakdown {
            category: *category,
            count: *count,
            subscore: sub,
            weight,
        });
    }

    let total = weights.total();
    let score = (raw as f64 / total as f64).round() as u64;
    (score.min(SUBSCORE_CAP) as u8, breakdown)
}
