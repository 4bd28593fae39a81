//! Numeric primitives over one device's ordered sequence of values.
//!
//! Stages sort their rows by (device, time), split them into per-device runs
//! with `slice::chunk_by` and hand each run's values to these helpers, so
//! every window here is already confined to a single device.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation with `n - 1` in the denominator; `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Value `n` positions earlier in the sequence.
pub fn shift(values: &[f64], n: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(n).map(|j| values[j]))
        .collect()
}

/// Mean and deviation over the `window` values strictly before each position.
///
/// The mean is `None` where nothing precedes; the deviation falls back to 0
/// wherever it is undefined.
pub fn trailing_stats_excluding(values: &[f64], window: usize) -> Vec<(Option<f64>, f64)> {
    (0..values.len())
        .map(|i| {
            let prior = &values[i.saturating_sub(window)..i];
            (mean(prior), sample_std(prior).unwrap_or(0.0))
        })
        .collect()
}

/// Mean over the last `window` values up to and including each position.
pub fn trailing_mean_including(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let span = &values[(i + 1).saturating_sub(window)..=i];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}

pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Cosine of the angle between two equal-length vectors; 0 if either is all zeros.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_std_matches_textbook_values() {
        assert_eq!(sample_std(&[1.0]), None);
        assert_eq!(sample_std(&[3.0, 3.0, 3.0]), Some(0.0));
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.138_089_935).abs() < 1e-9);
    }

    #[test]
    fn shift_leaves_leading_gaps() {
        assert_eq!(
            shift(&[1.0, 2.0, 3.0], 1),
            vec![None, Some(1.0), Some(2.0)]
        );
        assert_eq!(shift(&[1.0, 2.0], 24), vec![None, None]);
    }

    #[test]
    fn trailing_stats_exclude_current_value() {
        let stats = trailing_stats_excluding(&[1.0, 3.0, 5.0, 100.0], 2);
        assert_eq!(stats[0], (None, 0.0));
        assert_eq!(stats[1], (Some(1.0), 0.0));
        assert_eq!(stats[2].0, Some(2.0));
        assert!((stats[2].1 - 2.0_f64.sqrt()).abs() < 1e-12);
        // window of two: {3, 5}
        assert_eq!(stats[3].0, Some(4.0));
    }

    #[test]
    fn trailing_mean_includes_current_value() {
        assert_eq!(
            trailing_mean_including(&[2.0, 4.0, 6.0, 8.0], 3),
            vec![2.0, 3.0, 4.0, 6.0]
        );
    }

    #[test]
    fn cumulative_sum_runs_forward() {
        assert_eq!(cumulative_sum(&[1.0, 2.0, 3.5]), vec![1.0, 3.0, 6.5]);
    }

    #[test]
    fn cosine_of_identical_and_zero_vectors() {
        let v = [1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&v, &[0.0; 3]), 0.0);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn round6_drops_extra_digits() {
        assert_eq!(round6(1.234_567_89), 1.234_568);
        assert_eq!(round6(276.0), 276.0);
    }
}
