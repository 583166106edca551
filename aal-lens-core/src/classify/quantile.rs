use super::{check_class_count, distinct_count, sorted_observations, Breaks};
use aal_lens_common::Result;
use tdigest::TDigest;
use tracing::debug;

/// Quantile breaks: each class holds roughly the same number of observations.
///
/// Interior breaks are `i/k` quantiles estimated with a t-digest, snapped up to
/// the next observed value above the previous break, so every class is
/// non-empty. Heavily tied data may therefore yield fewer than `k` classes.
/// The ends are the exact min and max. Same edge-case policy as
/// [`super::classify`].
pub fn quantile_breaks(values: &[f64], k: usize) -> Result<Breaks> {
    check_class_count(k)?;
    let sorted = sorted_observations(values);
    if sorted.is_empty() {
        return Ok(Breaks::empty());
    }
    let classes = k.min(distinct_count(&sorted));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mut distinct = sorted.clone();
    distinct.dedup();
    let digest = TDigest::new_with_size(100).merge_sorted(sorted);
    let mut breaks = Vec::with_capacity(classes + 1);
    breaks.push(min);
    for i in 1..classes {
        let q = digest.estimate_quantile(i as f64 / classes as f64);
        let prev = breaks[breaks.len() - 1];
        let target = if q.is_finite() { q } else { prev };
        // lower bound of the next class: an observed value strictly above prev
        let idx = distinct.partition_point(|d| *d < target || *d <= prev);
        match distinct.get(idx) {
            Some(&b) => breaks.push(b),
            None => break,
        }
    }
    if breaks.len() < classes {
        debug!(requested = classes, classes = breaks.len(), "quantile breaks merged on ties");
    }
    breaks.push(max);
    Ok(Breaks::from_vec(breaks))
}

#[cfg(test)]
mod tests_quantile {
    use super::*;

    #[test]
    fn quartiles_of_uniform_range() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let b = quantile_breaks(&values, 4).unwrap();
        let s = b.as_slice();
        assert_eq!(s.len(), 5);
        assert_eq!(s[0], 1.0);
        assert_eq!(s[4], 100.0);
        for (got, want) in s[1..4].iter().zip([25.0, 50.0, 75.0]) {
            assert!((got - want).abs() < 3.0, "got {got}, want ~{want}");
        }
    }

    #[test]
    fn edge_cases_follow_jenks_policy() {
        assert!(quantile_breaks(&[], 3).unwrap().is_empty());
        assert!(quantile_breaks(&[1.0], 0).is_err());
        assert_eq!(quantile_breaks(&[4.0, 4.0], 3).unwrap().as_slice(), &[4.0, 4.0]);
    }

    #[test]
    fn monotone_on_skewed_data() {
        let mut values = vec![0.0; 50];
        values.extend([1.0, 2.0, 1000.0, 5000.0]);
        let b = quantile_breaks(&values, 5).unwrap();
        assert!(b.as_slice().windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(b.max(), Some(5000.0));
    }

    #[test]
    fn tied_minimum_still_spreads_classes() {
        let mut values = vec![0.0; 50];
        values.extend([1.0, 2.0, 1000.0, 5000.0]);
        let b = quantile_breaks(&values, 5).unwrap();
        let s = b.as_slice();
        assert!(s[1..s.len() - 1].windows(2).all(|w| w[0] < w[1]), "{s:?}");
        assert!(s[1] > s[0]);
        let mut populated: Vec<usize> = values.iter().filter_map(|v| b.bucket(*v)).collect();
        populated.sort_unstable();
        populated.dedup();
        assert!(populated.len() > 1, "{s:?}");
        assert_eq!(b.bucket(0.0), Some(0));
        assert_eq!(b.bucket(5000.0), Some(b.class_count() - 1));
    }

    #[test]
    fn ties_in_the_middle_keep_classes_non_empty() {
        let mut values = vec![1.0];
        values.extend(vec![5.0; 40]);
        values.push(9.0);
        let b = quantile_breaks(&values, 3).unwrap();
        assert_eq!(b.as_slice(), &[1.0, 5.0, 9.0, 9.0]);
        assert_eq!(b.bucket(1.0), Some(0));
        assert_eq!(b.bucket(5.0), Some(1));
        assert_eq!(b.bucket(9.0), Some(2));
    }
}
