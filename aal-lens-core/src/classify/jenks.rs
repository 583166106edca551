//! Jenks natural breaks: exact optimal partition of 1-D data into contiguous
//! classes minimising the summed squared deviation from each class mean
//! (Fisher's dynamic program, O(n²·k) time, O(n·k) space).

use super::{check_class_count, sorted_observations, Breaks};
use aal_lens_common::Result;
use tracing::debug;

/// Natural breaks for `values` split into `k` classes.
///
/// Non-finite values are ignored. Empty input yields [`Breaks::empty`].
/// `k` is clamped to the number of distinct values, so a single-valued
/// dataset always yields `[v, v]`. `k == 0` is rejected.
///
/// Internal breaks are the smallest member of each class after the first, so
/// [`Breaks::bucket`] reproduces the optimal grouping exactly.
pub fn classify(values: &[f64], k: usize) -> Result<Breaks> {
    check_class_count(k)?;
    let sorted = sorted_observations(values);
    if sorted.is_empty() {
        return Ok(Breaks::empty());
    }
    let groups = group_distinct(&sorted);
    let classes = k.min(groups.len());
    if classes < k {
        debug!(requested = k, classes, distinct = groups.len(), "jenks class count clamped");
    }
    let starts = optimal_class_starts(&groups, classes);
    let mut breaks = Vec::with_capacity(classes + 1);
    breaks.push(sorted[0]);
    breaks.extend(starts.iter().map(|&s| groups[s].0));
    breaks.push(sorted[sorted.len() - 1]);
    Ok(Breaks::from_vec(breaks))
}

/// [`classify`] over sparse observations; `None` entries are missing data.
pub fn classify_optional(values: &[Option<f64>], k: usize) -> Result<Breaks> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    classify(&present, k)
}

/// Collapse an ascending slice into `(value, multiplicity)` runs.
fn group_distinct(sorted: &[f64]) -> Vec<(f64, f64)> {
    let mut groups: Vec<(f64, f64)> = Vec::new();
    for &v in sorted {
        match groups.last_mut() {
            Some((last, weight)) if *last == v => *weight += 1.0,
            _ => groups.push((v, 1.0)),
        }
    }
    groups
}

/// Zero-based indices into `groups` where classes `2..=k` begin.
///
/// Requires `1 <= k <= groups.len()`. Each distinct value is one weighted
/// observation, so runs of equal values never straddle a break.
fn optimal_class_starts(groups: &[(f64, f64)], k: usize) -> Vec<usize> {
    let n = groups.len();
    // centre on the midrange and scale into [-1, 1]; halves keep min/max
    // arithmetic finite even near f64::MAX
    let (lo, hi) = (groups[0].0, groups[n - 1].0);
    let shift = lo / 2.0 + hi / 2.0;
    let half_range = hi / 2.0 - lo / 2.0;
    let scale = if half_range > 0.0 { half_range } else { 1.0 };

    // lower_bound[l][c]: 1-based start of the last class in the best split of
    // the first l groups into c classes; variance[l][c]: its summed SSD
    let mut lower_bound = vec![vec![0usize; k + 1]; n + 1];
    let mut variance = vec![vec![f64::INFINITY; k + 1]; n + 1];
    for c in 1..=k {
        lower_bound[1][c] = 1;
        variance[1][c] = 0.0;
    }

    for l in 1..=n {
        let (mut sum, mut sum_sq, mut weight) = (0.0f64, 0.0f64, 0.0f64);
        for m in 1..=l {
            let start = l - m + 1;
            let (value, w) = groups[start - 1];
            let x = (value - shift) / scale;
            weight += w;
            sum += w * x;
            sum_sq += w * x * x;
            if start == 1 {
                continue;
            }
            let ssd = (sum_sq - sum * sum / weight).max(0.0);
            let prefix = start - 1;
            // the prefix must hold c-1 non-empty classes
            for c in 2..=k.min(prefix + 1) {
                let candidate = ssd + variance[prefix][c - 1];
                // strict: among equal optima the shortest last class wins
                if candidate < variance[l][c] {
                    variance[l][c] = candidate;
                    lower_bound[l][c] = start;
                }
            }
        }
        lower_bound[l][1] = 1;
        variance[l][1] = (sum_sq - sum * sum / weight).max(0.0);
    }

    let mut starts = vec![0usize; k.saturating_sub(1)];
    let mut idx = n;
    for c in (2..=k).rev() {
        let start = lower_bound[idx][c];
        starts[c - 2] = start - 1;
        idx = start - 1;
    }
    starts
}

#[cfg(test)]
mod tests_jenks {
    use super::*;
    use aal_lens_common::AalLensError;

    /// xorshift64*, enough to vary inputs deterministically
    fn pseudo_random(seed: u64, n: usize, scale: f64) -> Vec<f64> {
        let mut s = seed.max(1);
        (0..n)
            .map(|_| {
                s ^= s >> 12;
                s ^= s << 25;
                s ^= s >> 27;
                let r = s.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
                (r as f64 / (1u64 << 53) as f64 * scale).round()
            })
            .collect()
    }

    fn ssd(xs: &[f64]) -> f64 {
        if xs.is_empty() {
            return 0.0;
        }
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        xs.iter().map(|x| (x - mean).powi(2)).sum()
    }

    fn partition_cost(values: &[f64], breaks: &Breaks) -> f64 {
        let mut classes = vec![Vec::new(); breaks.class_count()];
        for &v in values {
            classes[breaks.bucket(v).unwrap()].push(v);
        }
        classes.iter().map(|c| ssd(c)).sum()
    }

    /// exhaustive minimum over every split of the sorted values into k runs
    fn brute_force_cost(sorted: &[f64], k: usize) -> f64 {
        fn go(xs: &[f64], k: usize) -> f64 {
            if k == 1 {
                return ssd(xs);
            }
            (1..=xs.len() - (k - 1))
                .map(|cut| ssd(&xs[..cut]) + go(&xs[cut..], k - 1))
                .fold(f64::INFINITY, f64::min)
        }
        go(sorted, k)
    }

    #[test]
    fn empty_input_yields_empty_breaks() {
        assert!(classify(&[], 3).unwrap().is_empty());
        assert!(classify(&[f64::NAN, f64::NAN], 2).unwrap().is_empty());
    }

    #[test]
    fn zero_classes_rejected() {
        assert!(matches!(classify(&[1.0, 2.0, 3.0], 0), Err(AalLensError::InvalidClassCount(0))));
    }

    #[test]
    fn one_class_is_min_max() {
        let b = classify(&[7.0, 3.0, 9.0, 4.0], 1).unwrap();
        assert_eq!(b.as_slice(), &[3.0, 9.0]);
    }

    #[test]
    fn single_value_any_k() {
        for k in 1..=5 {
            assert_eq!(classify(&[5.0], k).unwrap().as_slice(), &[5.0, 5.0]);
        }
    }

    #[test]
    fn all_equal_collapses() {
        let b = classify(&[2.0; 10], 4).unwrap();
        assert_eq!(b.as_slice(), &[2.0, 2.0]);
        assert_eq!(b.bucket(2.0), Some(0));
    }

    #[test]
    fn clamps_to_distinct_values() {
        let b = classify(&[1.0, 1.0, 2.0, 2.0, 3.0], 10).unwrap();
        assert_eq!(b.class_count(), 3);
        assert_eq!(b.as_slice(), &[1.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn three_clusters_separated() {
        let values = [1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 100.0, 100.0, 100.0];
        let b = classify(&values, 3).unwrap();
        assert_eq!(b.class_count(), 3);
        assert_eq!(b.min(), Some(1.0));
        assert_eq!(b.max(), Some(100.0));
        for (v, class) in [(1.0, 0), (10.0, 1), (100.0, 2)] {
            assert_eq!(b.bucket(v), Some(class), "value {v}");
        }
    }

    #[test]
    fn two_groups_split_at_gap() {
        let values = [10.0, 20.0, 20.0, 30.0, 100.0, 110.0, 105.0];
        let b = classify(&values, 2).unwrap();
        assert_eq!(b.as_slice(), &[10.0, 100.0, 110.0]);
        let cut = b.as_slice()[1];
        assert!([10.0, 20.0, 30.0].iter().all(|v| *v < cut));
        assert!([100.0, 105.0, 110.0].iter().all(|v| *v >= cut));
    }

    #[test]
    fn nan_entries_are_ignored() {
        let with_nan = [f64::NAN, 10.0, 20.0, f64::NAN, 100.0, 110.0];
        let clean = [10.0, 20.0, 100.0, 110.0];
        assert_eq!(classify(&with_nan, 2).unwrap(), classify(&clean, 2).unwrap());
    }

    #[test]
    fn optional_values_skip_missing() {
        let b = classify_optional(&[Some(1.0), None, Some(50.0), Some(2.0), None, Some(51.0)], 2).unwrap();
        assert_eq!(b.as_slice(), &[1.0, 50.0, 51.0]);
        assert!(classify_optional(&[None, None], 3).unwrap().is_empty());
    }

    #[test]
    fn negative_values_supported() {
        let b = classify(&[-50.0, -49.0, 0.0, 1.0, 60.0, 61.0], 3).unwrap();
        assert_eq!(b.as_slice(), &[-50.0, 0.0, 60.0, 61.0]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let values = pseudo_random(7, 60, 1000.0);
        let mut reversed = values.clone();
        reversed.reverse();
        assert_eq!(classify(&values, 5).unwrap(), classify(&reversed, 5).unwrap());
    }

    #[test]
    fn repeated_calls_identical() {
        let values = pseudo_random(11, 200, 1e12);
        let first = classify(&values, 6).unwrap();
        let second = classify(&values, 6).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn boundaries_count_and_monotonicity() {
        for seed in 1..20u64 {
            let values = pseudo_random(seed, 5 + seed as usize * 7, 500.0);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            for k in 1..=7 {
                let b = classify(&values, k).unwrap();
                let s = b.as_slice();
                assert_eq!(s[0], min);
                assert_eq!(s[s.len() - 1], max);
                assert_eq!(s.len(), b.class_count() + 1);
                assert!(b.class_count() <= k);
                assert!(s.windows(2).all(|w| w[0] <= w[1]));
                // internal breaks strictly increase: no empty classes after clamping
                assert!(s[..s.len() - 1].windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn matches_brute_force_optimum() {
        for seed in 1..12u64 {
            let values = pseudo_random(seed, 11, 40.0);
            let sorted = sorted_observations(&values);
            let distinct = super::super::distinct_count(&sorted);
            for k in 1..=4.min(distinct) {
                let b = classify(&values, k).unwrap();
                assert_eq!(b.class_count(), k);
                let got = partition_cost(&values, &b);
                let best = brute_force_cost(&sorted, k);
                assert!((got - best).abs() < 1e-6, "seed {seed} k {k}: got {got}, best {best}");
            }
        }
    }

    #[test]
    fn large_magnitudes_keep_clusters() {
        let values = [
            1.0e12, 1.1e12, 1.2e12, 5.0e12, 5.1e12, 9.0e12, 9.2e12, 9.1e12,
        ];
        let b = classify(&values, 3).unwrap();
        assert_eq!(b.as_slice(), &[1.0e12, 5.0e12, 9.0e12, 9.2e12]);
    }

    #[test]
    fn extreme_magnitudes_do_not_overflow() {
        let b = classify(&[-1.5e200, -1.0e200, 1.0e200, 1.5e200], 2).unwrap();
        assert_eq!(b.as_slice(), &[-1.5e200, 1.0e200, 1.5e200]);
        let b = classify(&[f64::MAX, f64::MAX / 2.0, -f64::MAX, -f64::MAX / 2.0], 2).unwrap();
        assert_eq!(b.as_slice(), &[-f64::MAX, f64::MAX / 2.0, f64::MAX]);
    }

    #[test]
    fn equal_cost_tie_prefers_shorter_last_class() {
        // {0},{1,2} and {0,1},{2} cost the same
        let b = classify(&[0.0, 1.0, 2.0], 2).unwrap();
        assert_eq!(b.as_slice(), &[0.0, 2.0, 2.0]);
    }
}
