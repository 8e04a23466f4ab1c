//! Descriptive statistics over interval multisets.
//!
//! Inputs are sorted before anything is computed, so results depend only on
//! the multiset and never on the order intervals were recorded in.

use trajectory_contracts::trajectory::IntervalStats;

/// Minimum sample size for a sample standard deviation.
pub const MIN_STD_DEV_COUNT: usize = 2;
/// Minimum sample size for quartiles.
pub const MIN_QUARTILE_COUNT: usize = 4;

/// Compute statistics for `intervals`. `None` for an empty slice.
pub fn compute(intervals: &[u32]) -> Option<IntervalStats> {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable();
    compute_sorted(&sorted)
}

/// Compute statistics for an already ascending slice.
pub fn compute_sorted(sorted: &[u32]) -> Option<IntervalStats> {
    let n = sorted.len();
    let (&min, &max) = (sorted.first()?, sorted.last()?);

    let sum: u64 = sorted.iter().map(|&v| u64::from(v)).sum();
    let mean = sum as f64 / n as f64;

    let std_dev = (n >= MIN_STD_DEV_COUNT).then(|| {
        let squares: f64 = sorted
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum();
        (squares / (n - 1) as f64).sqrt()
    });

    let (q1, q3) = if n >= MIN_QUARTILE_COUNT {
        (Some(quartile(sorted, 1)), Some(quartile(sorted, 3)))
    } else {
        (None, None)
    };

    Some(IntervalStats {
        count: n as u64,
        min,
        max,
        mean,
        median: median(sorted),
        std_dev,
        q1,
        q3,
    })
}

/// Median of a non-empty ascending slice: the middle value, or the mean of
/// the two middle values for an even count.
pub fn median(sorted: &[u32]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        f64::from(sorted[n / 2])
    } else {
        (f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0
    }
}

/// The `i`-th quartile (1 or 3) by the exclusive method: position
/// `i * (n + 1) / 4` in 1-based order, linearly interpolated.
///
/// Requires `sorted.len() >= MIN_QUARTILE_COUNT`.
fn quartile(sorted: &[u32], i: usize) -> f64 {
    let m = sorted.len() + 1;
    let j = i * m / 4;
    let delta = (i * m - j * 4) as f64;
    (f64::from(sorted[j - 1]) * (4.0 - delta) + f64::from(sorted[j]) * delta) / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_stats() {
        assert!(compute(&[]).is_none());
    }

    #[test]
    fn four_interval_scenario() {
        let stats = compute(&[1, 2, 3, 10]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 10);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q1, Some(1.25));
        assert_eq!(stats.q3, Some(8.25));
        // Sample std-dev of [1, 2, 3, 10]: sqrt(50 / 3).
        let expected = (50.0f64 / 3.0).sqrt();
        assert!((stats.std_dev.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn median_odd_is_middle_element() {
        assert_eq!(compute(&[9, 1, 5]).unwrap().median, 5.0);
        assert_eq!(compute(&[7]).unwrap().median, 7.0);
    }

    #[test]
    fn median_even_is_mean_of_middle_pair() {
        assert_eq!(compute(&[4, 1, 3, 2]).unwrap().median, 2.5);
        assert_eq!(compute(&[0, 1]).unwrap().median, 0.5);
    }

    #[test]
    fn small_samples_report_absent_fields() {
        let one = compute(&[3]).unwrap();
        assert_eq!(one.std_dev, None);
        assert_eq!(one.q1, None);
        assert_eq!(one.q3, None);

        let three = compute(&[1, 2, 3]).unwrap();
        assert_eq!(three.std_dev, Some(1.0));
        assert_eq!(three.q1, None);
        assert_eq!(three.q3, None);
    }

    #[test]
    fn zero_intervals_are_valid() {
        let stats = compute(&[0, 0, 0, 0]).unwrap();
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, Some(0.0));
        assert_eq!(stats.q1, Some(0.0));
        assert_eq!(stats.q3, Some(0.0));
    }

    #[test]
    fn order_does_not_change_results() {
        let a = compute(&[5, 1, 8, 2, 2, 13, 0]).unwrap();
        let b = compute(&[13, 2, 0, 8, 1, 2, 5]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quartiles_interpolate_for_larger_samples() {
        // n = 7, m = 8: q1 at position 2, q3 at position 6 (no interpolation).
        let stats = compute(&[1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(stats.q1, Some(2.0));
        assert_eq!(stats.q3, Some(6.0));
    }
}
