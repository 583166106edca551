use super::Breaks;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
    pub mean: Option<f64>, // None for a class with no members
}

/// Per-class member count and mean of `values` under `breaks`.
pub fn summarize(values: &[f64], breaks: &Breaks) -> Vec<ClassSummary> {
    let k = breaks.class_count();
    let mut counts = vec![0u64; k];
    let mut sums = vec![0.0f64; k];
    for &v in values.iter().filter(|v| v.is_finite()) {
        if let Some(i) = breaks.bucket(v) {
            counts[i] += 1;
            sums[i] += v;
        }
    }
    (0..k)
        .filter_map(|i| {
            let (lower, upper) = breaks.class_range(i)?;
            Some(ClassSummary {
                index: i,
                lower,
                upper,
                count: counts[i],
                mean: (counts[i] > 0).then(|| sums[i] / counts[i] as f64),
            })
        })
        .collect()
}

/// Goodness of variance fit, `1 - SDCM / SDAM`, in `[0, 1]`.
///
/// 1.0 when the data has no variance; 0.0 when there is nothing classified.
pub fn goodness_of_variance_fit(values: &[f64], breaks: &Breaks) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || breaks.is_empty() {
        return 0.0;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let sdam: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
    if sdam == 0.0 {
        return 1.0;
    }
    let class_means: Vec<Option<f64>> = summarize(&finite, breaks).into_iter().map(|c| c.mean).collect();
    let sdcm: f64 = finite
        .iter()
        .filter_map(|&v| {
            let m = breaks.bucket(v).and_then(|i| class_means[i])?;
            Some((v - m).powi(2))
        })
        .sum();
    (1.0 - sdcm / sdam).clamp(0.0, 1.0)
}
