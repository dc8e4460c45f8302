use crate::model::{BloomStatistics, LevelDistribution, Outcome};
use crate::types::BloomLevel;

/// Count outcomes per level and convert to percentages.
///
/// Percentages are computed in tenths with the largest-remainder method, so
/// the six values always add up to exactly 100.0 (or are all zero when there
/// is nothing to count). Ties in the remainder go to the lower level.
pub fn distribution<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> LevelDistribution {
    let mut counts = [0u32; BloomLevel::COUNT];
    for o in outcomes {
        counts[o.bloom_level.index()] += 1;
    }
    from_counts(counts)
}

pub fn from_counts(counts: [u32; BloomLevel::COUNT]) -> LevelDistribution {
    let total: u32 = counts.iter().sum();
    let mut percentages = [0.0; BloomLevel::COUNT];
    if total == 0 {
        return LevelDistribution {
            counts,
            percentages,
            total,
        };
    }

    let shares: Vec<u64> = largest_remainder(
        &counts.iter().map(|c| u64::from(*c)).collect::<Vec<_>>(),
        1000,
    );
    for (i, tenths) in shares.into_iter().enumerate() {
        percentages[i] = tenths as f64 / 10.0;
    }
    LevelDistribution {
        counts,
        percentages,
        total,
    }
}

pub fn bloom_statistics(module_outcomes: &[&Outcome], course_outcomes: &[Outcome]) -> BloomStatistics {
    BloomStatistics {
        module_level: distribution(module_outcomes.iter().copied()),
        course_level: distribution(course_outcomes),
    }
}

/// Split `target` units across `parts` in proportion, returning integers
/// that sum to `target`. Leftover units go to the largest fractional parts;
/// ties resolve to the earliest index. All-zero input yields all zeros.
pub fn largest_remainder(parts: &[u64], target: u64) -> Vec<u64> {
    let total: u64 = parts.iter().sum();
    if total == 0 {
        return vec![0; parts.len()];
    }
    let mut out: Vec<u64> = Vec::with_capacity(parts.len());
    let mut remainders: Vec<(usize, u64)> = Vec::with_capacity(parts.len());
    for (i, p) in parts.iter().enumerate() {
        let scaled = p * target;
        out.push(scaled / total);
        remainders.push((i, scaled % total));
    }
    let assigned: u64 = out.iter().sum();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (i, _) in remainders.into_iter().take((target - assigned) as usize) {
        out[i] += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(d: &LevelDistribution) -> f64 {
        d.percentages.iter().sum::<f64>()
    }

    #[test]
    fn thirds_sum_to_exactly_one_hundred() {
        let d = from_counts([1, 1, 1, 0, 0, 0]);
        assert_eq!(d.percentages[0], 33.4);
        assert_eq!(d.percentages[1], 33.3);
        assert_eq!(d.percentages[2], 33.3);
        assert!((sum(&d) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sevenths_sum_to_exactly_one_hundred() {
        let d = from_counts([3, 1, 1, 1, 1, 0]);
        assert!((sum(&d) - 100.0).abs() < 1e-9);
        assert_eq!(d.total, 7);
        assert_eq!(d.count(BloomLevel::Remember), 3);
    }

    #[test]
    fn empty_distribution_is_all_zero() {
        let d = from_counts([0; 6]);
        assert_eq!(d.total, 0);
        assert!(d.percentages.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn largest_remainder_hits_target() {
        assert_eq!(largest_remainder(&[1, 1, 1], 100), vec![34, 33, 33]);
        assert_eq!(largest_remainder(&[0, 0], 10), vec![0, 0]);
        let split = largest_remainder(&[25, 20, 30, 15], 100);
        assert_eq!(split.iter().sum::<u64>(), 100);
    }
}
