use super::{check_class_count, distinct_count, sorted_observations, Breaks};
use aal_lens_common::Result;

/// Equal-width breaks between the observed min and max.
pub fn equal_interval_breaks(values: &[f64], k: usize) -> Result<Breaks> {
    check_class_count(k)?;
    let sorted = sorted_observations(values);
    if sorted.is_empty() {
        return Ok(Breaks::empty());
    }
    let classes = k.min(distinct_count(&sorted));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let width = (max - min) / classes as f64;
    let mut breaks: Vec<f64> = (0..classes).map(|i| min + i as f64 * width).collect();
    breaks.push(max); // exact, no accumulated rounding
    Ok(Breaks::from_vec(breaks))
}

#[cfg(test)]
mod tests_equal_interval {
    use super::*;

    #[test]
    fn even_widths() {
        let b = equal_interval_breaks(&[0.0, 3.0, 7.0, 10.0], 2).unwrap();
        assert_eq!(b.as_slice(), &[0.0, 5.0, 10.0]);
        let b = equal_interval_breaks(&[0.0, 1.0, 2.0, 9.0], 3).unwrap();
        assert_eq!(b.as_slice(), &[0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn constant_input_is_one_class() {
        assert_eq!(equal_interval_breaks(&[3.0, 3.0, 3.0], 4).unwrap().as_slice(), &[3.0, 3.0]);
    }

    #[test]
    fn empty_and_zero() {
        assert!(equal_interval_breaks(&[], 4).unwrap().is_empty());
        assert!(equal_interval_breaks(&[1.0, 2.0], 0).is_err());
    }
}
