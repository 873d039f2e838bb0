//! Robust location/scale estimators used for outlier rejection.

/// Fraction of a normal distribution within one standard deviation.
pub const ONE_SIGMA_FRACTION: f64 = 0.682_689;

/// Median of `values`, averaging the two middle elements for even lengths.
///
/// Reorders the slice. Returns `None` for an empty slice or when any value is NaN.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let len = values.len();
    let mid = len / 2;
    let (left, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        return Some(upper);
    }
    let lower = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(0.5 * (lower + upper))
}

/// Linearly interpolated 68.27th percentile of `values`.
///
/// Applied to absolute deviations from the median this estimates one standard
/// deviation.
/// Sorts the slice. Returns `None` for an empty slice or when any value is NaN.
pub fn percentile_68_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);

    let pos = ONE_SIGMA_FRACTION * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(values.len() - 1);
    let frac = pos - lo as f64;
    Some(values[lo] + frac * (values[hi] - values[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median_mut(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_mut(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_mut(&mut [7.0]), Some(7.0));
    }

    #[test]
    fn test_median_rejects_empty_and_nan() {
        assert_eq!(median_mut(&mut []), None);
        assert_eq!(median_mut(&mut [1.0, f64::NAN]), None);
    }

    #[test]
    fn test_percentile_68_interpolates() {
        // 0..=100: position 0.682689 * 100 = 68.2689
        let mut values: Vec<f64> = (0..=100).rev().map(f64::from).collect();
        let p = percentile_68_mut(&mut values).unwrap();
        assert!((p - 68.2689).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_68_single_value() {
        assert_eq!(percentile_68_mut(&mut [0.25]), Some(0.25));
        assert_eq!(percentile_68_mut(&mut []), None);
    }
}
