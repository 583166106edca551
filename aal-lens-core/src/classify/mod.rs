pub mod equal_interval;
pub mod jenks;
pub mod quantile;
pub mod summary;

pub use equal_interval::equal_interval_breaks;
pub use jenks::{classify, classify_optional};
pub use quantile::quantile_breaks;
pub use summary::{goodness_of_variance_fit, summarize, ClassSummary};

use aal_lens_common::{AalLensError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ascending class boundaries `[b0, b1, .., bk]` for `k` classes.
///
/// Class `i` covers `[b_i, b_{i+1})`, the last class is closed on both ends.
/// An empty value means there was nothing to classify, which callers should
/// render differently from a single class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breaks(Vec<f64>);

impl Breaks {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn from_vec(values: Vec<f64>) -> Self {
        debug_assert!(values.len() != 1);
        debug_assert!(values.windows(2).all(|w| w[0] <= w[1]));
        Self(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn min(&self) -> Option<f64> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.0.last().copied()
    }

    /// `(lower, upper)` of class `i`.
    pub fn class_range(&self, i: usize) -> Option<(f64, f64)> {
        if i >= self.class_count() {
            return None;
        }
        Some((self.0[i], self.0[i + 1]))
    }

    /// Class index of `v`: the largest `i` with `b_i <= v`.
    ///
    /// Values outside `[b0, bk]` clamp to the first or last class. With
    /// zero-width classes, equal values land in the highest matching class.
    /// Returns `None` for NaN or when there are no breaks.
    pub fn bucket(&self, v: f64) -> Option<usize> {
        if self.0.is_empty() || v.is_nan() {
            return None;
        }
        let k = self.class_count();
        Some(self.0[1..k].partition_point(|b| *b <= v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassMethod {
    Jenks,
    Quantile,
    EqualInterval,
}

impl ClassMethod {
    pub const ALL: [ClassMethod; 3] = [Self::Jenks, Self::Quantile, Self::EqualInterval];

    pub fn classify(&self, values: &[f64], k: usize) -> Result<Breaks> {
        match self {
            Self::Jenks => classify(values, k),
            Self::Quantile => quantile_breaks(values, k),
            Self::EqualInterval => equal_interval_breaks(values, k),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Jenks => Self::Quantile,
            Self::Quantile => Self::EqualInterval,
            Self::EqualInterval => Self::Jenks,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Jenks => "Natural breaks (Jenks)",
            Self::Quantile => "Quantile",
            Self::EqualInterval => "Equal interval",
        }
    }
}

impl fmt::Display for ClassMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Jenks => "jenks",
            Self::Quantile => "quantile",
            Self::EqualInterval => "equal-interval",
        };
        f.write_str(s)
    }
}

impl FromStr for ClassMethod {
    type Err = AalLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jenks" | "natural" | "natural-breaks" => Ok(Self::Jenks),
            "quantile" => Ok(Self::Quantile),
            "equal" | "equal-interval" => Ok(Self::EqualInterval),
            other => Err(AalLensError::Other(format!(
                "unknown classification method: {other} (use jenks, quantile or equal-interval)"
            ))),
        }
    }
}

pub(crate) fn check_class_count(k: usize) -> Result<()> {
    if k == 0 {
        return Err(AalLensError::InvalidClassCount(k));
    }
    Ok(())
}

/// Finite observations in ascending order. NaN and infinities count as missing.
pub(crate) fn sorted_observations(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Number of distinct values in an ascending slice.
pub(crate) fn distinct_count(sorted: &[f64]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| w[0] != w[1]).count()
}

#[cfg(test)]
mod tests_breaks {
    use super::*;

    #[test]
    fn bucket_half_open_with_closed_last_class() {
        let b = Breaks::from_vec(vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(b.class_count(), 3);
        assert_eq!(b.bucket(0.0), Some(0));
        assert_eq!(b.bucket(9.99), Some(0));
        assert_eq!(b.bucket(10.0), Some(1));
        assert_eq!(b.bucket(20.0), Some(2));
        assert_eq!(b.bucket(30.0), Some(2));
    }

    #[test]
    fn bucket_clamps_out_of_range() {
        let b = Breaks::from_vec(vec![0.0, 10.0, 20.0]);
        assert_eq!(b.bucket(-5.0), Some(0));
        assert_eq!(b.bucket(99.0), Some(1));
    }

    #[test]
    fn bucket_none_for_nan_and_empty() {
        let b = Breaks::from_vec(vec![0.0, 1.0]);
        assert_eq!(b.bucket(f64::NAN), None);
        assert_eq!(Breaks::empty().bucket(1.0), None);
    }

    #[test]
    fn zero_width_classes_go_to_highest() {
        let b = Breaks::from_vec(vec![5.0, 5.0, 5.0]);
        assert_eq!(b.bucket(5.0), Some(1));
        let single = Breaks::from_vec(vec![5.0, 5.0]);
        assert_eq!(single.bucket(5.0), Some(0));
    }

    #[test]
    fn serializes_as_plain_array() {
        let b = Breaks::from_vec(vec![1.0, 2.5]);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.5]");
    }

    #[test]
    fn method_parse_and_display() {
        assert_eq!("natural".parse::<ClassMethod>().unwrap(), ClassMethod::Jenks);
        assert_eq!("EQUAL".parse::<ClassMethod>().unwrap(), ClassMethod::EqualInterval);
        assert!("kmeans".parse::<ClassMethod>().is_err());
        for m in ClassMethod::ALL {
            assert_eq!(m.to_string().parse::<ClassMethod>().unwrap(), m);
        }
    }

    #[test]
    fn distinct_count_counts_runs() {
        assert_eq!(distinct_count(&[]), 0);
        assert_eq!(distinct_count(&[1.0, 1.0, 2.0, 3.0, 3.0]), 3);
    }

    #[test]
    fn sorted_observations_drops_non_finite() {
        let s = sorted_observations(&[3.0, f64::NAN, -1.0, f64::INFINITY, 2.0]);
        assert_eq!(s, vec![-1.0, 2.0, 3.0]);
    }
}
