//! Statistical helpers shared by every analyzer
//!
//! All functions are total: empty or degenerate input yields 0.0 rather
//! than NaN, so callers can feed results straight into confidence formulas.

use std::cmp::Ordering;

/// Arithmetic mean
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / data.len() as f64
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Median without mutating the caller's data
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation from the median
pub fn median_absolute_deviation(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let med = median(data);
    let deviations: Vec<f64> = data.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Minimum and maximum, or None for an empty slice
pub fn min_max(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

/// Pearson correlation over the common prefix of `a` and `b`.
///
/// Returns 0.0 when either side has no variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        cov / denom
    }
}

/// Ordinary least squares fit of `values` against their index
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0.0 when the data has no variance
    pub r_squared: f64,
}

/// Fit y = slope·x + intercept with x = 0, 1, 2, ...
pub fn linear_regression(values: &[f64]) -> LinearFit {
    let n = values.len();
    if n < 2 {
        return LinearFit {
            intercept: values.first().copied().unwrap_or(0.0),
            ..Default::default()
        };
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = values.iter().map(|y| (y - mean_y) * (y - mean_y)).sum();
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let predicted = slope * i as f64 + intercept;
            (y - predicted) * (y - predicted)
        })
        .sum();

    let r_squared = if ss_tot < 1e-12 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    LinearFit { slope, intercept, r_squared }
}

/// Shannon entropy of a `bins`-bucket histogram, normalised by log2(bins).
///
/// A series with no spread falls into a single bucket and scores 0.0.
pub fn normalized_entropy(data: &[f64], bins: usize) -> f64 {
    if data.is_empty() || bins < 2 {
        return 0.0;
    }
    let Some((min, max)) = min_max(data) else {
        return 0.0;
    };
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return 0.0;
    }

    let mut histogram = vec![0usize; bins];
    for &v in data {
        let bucket = (((v - min) / range) * bins as f64) as usize;
        histogram[bucket.min(bins - 1)] += 1;
    }

    let n = data.len() as f64;
    let entropy: f64 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum();

    (entropy / (bins as f64).log2()).clamp(0.0, 1.0)
}

/// Curve-length fractal dimension estimate mapped to [0, 1].
///
/// For each scale k the mean absolute increment path length L(k) is
/// computed (Higuchi style); the dimension is the negated slope of
/// log L(k) against log k, which lies in [1, 2] for well-behaved series.
pub fn fractal_dimension(data: &[f64], scales: &[usize]) -> f64 {
    let n = data.len();
    let mut log_k = Vec::new();
    let mut log_l = Vec::new();

    for &k in scales {
        if k == 0 || k >= n {
            continue;
        }
        let mut total = 0.0;
        for offset in 0..k {
            let steps = (n - 1 - offset) / k;
            if steps == 0 {
                continue;
            }
            let length: f64 = (1..=steps)
                .map(|m| (data[offset + m * k] - data[offset + (m - 1) * k]).abs())
                .sum();
            let normalisation = (n - 1) as f64 / (steps * k) as f64;
            total += length * normalisation / k as f64;
        }
        let curve_length = total / k as f64;
        if curve_length <= 0.0 || !curve_length.is_finite() {
            return 0.0;
        }
        log_k.push((k as f64).ln());
        log_l.push(curve_length.ln());
    }

    if log_k.len() < 2 {
        return 0.0;
    }

    let mean_x = mean(&log_k);
    let mean_y = mean(&log_l);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in log_k.iter().zip(&log_l) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    if sxx <= 0.0 {
        return 0.0;
    }

    let dimension = -sxy / sxx;
    (dimension - 1.0).clamp(0.0, 1.0)
}

/// Standard deviation relative to magnitude: std / (|mean| + 1)
pub fn relative_variability(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    std_dev(data) / (mean(data).abs() + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_moments() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-12);
        assert!((std_dev(&data) - 2.0).abs() < 1e-12);
        assert!((median(&data) - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median_absolute_deviation(&[]), 0.0);
        assert_eq!(normalized_entropy(&[], 20), 0.0);
        assert!(min_max(&[]).is_none());
    }

    #[test]
    fn test_mad() {
        let data = [1.0, 1.0, 2.0, 2.0, 4.0, 6.0, 9.0];
        assert!((median_absolute_deviation(&data) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson_correlation(&a, &b) - 1.0).abs() < 1e-12);
        assert!((pearson_correlation(&a, &c) + 1.0).abs() < 1e-12);
        assert_eq!(pearson_correlation(&a, &[3.0; 4]), 0.0);
    }

    #[test]
    fn test_regression_perfect_line() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 * i as f64 + 1.0).collect();
        let fit = linear_regression(&values);
        assert!((fit.slope - 3.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_regression_flat_has_no_fit() {
        let fit = linear_regression(&[5.0; 8]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(normalized_entropy(&[3.0; 50], 20), 0.0);
        let uniform: Vec<f64> = (0..2000).map(|i| i as f64).collect();
        assert!(normalized_entropy(&uniform, 20) > 0.99);
    }

    #[test]
    fn test_fractal_dimension_range() {
        let line: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let smooth = fractal_dimension(&line, &[2, 4, 8, 16]);
        assert!(smooth < 0.1, "straight line should be ~1-D, got {}", smooth);

        let noise: Vec<f64> = (0..512)
            .map(|i| ((i as f64 * 12.9898).sin() * 43_758.545_3).fract())
            .collect();
        let rough = fractal_dimension(&noise, &[2, 4, 8, 16]);
        assert!(rough > 0.5, "white noise should be ~2-D, got {}", rough);

        assert_eq!(fractal_dimension(&[1.0; 64], &[2, 4, 8, 16]), 0.0);
    }
}
