// src/core/analysis/patterns.rs
//
// Pattern recognition over one scalar survey channel: periodicities,
// spikes, linear trends, value clusters, harmonics and an overall
// complexity score.

use std::cmp::Ordering;
use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use super::spectrum::{amplitude_spectrum, fundamental_bin};
use crate::core::stats;

/// Pattern recognizer thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Upper bound on candidate periods (also capped at n/3)
    pub max_period: usize,
    /// Mean adjacent-segment correlation required for a periodic pattern
    pub periodic_correlation_threshold: f64,
    /// Spike threshold = max(std_multiplier·std, mad_multiplier·MAD)
    pub spike_std_multiplier: f64,
    pub spike_mad_multiplier: f64,
    /// Minimum R² for a trend window to be reported
    pub trend_r_squared_threshold: f64,
    /// |slope| at or below this is a stable trend
    pub stable_slope: f64,
    /// Adjacent same-direction trends merge when their slopes differ by less
    pub trend_merge_tolerance: f64,
    /// Sorted-value gap (in std units) that still joins a value cluster
    pub cluster_gap_factor: f64,
    pub min_cluster_size: usize,
    pub harmonic_amplitude_threshold: f64,
    pub max_harmonic: usize,
    pub entropy_bins: usize,
    pub fractal_scales: Vec<usize>,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            max_period: 100,
            periodic_correlation_threshold: 0.6,
            spike_std_multiplier: 2.0,
            spike_mad_multiplier: 3.0,
            trend_r_squared_threshold: 0.7,
            stable_slope: 0.01,
            trend_merge_tolerance: 0.005,
            cluster_gap_factor: 0.5,
            min_cluster_size: 3,
            harmonic_amplitude_threshold: 0.1,
            max_harmonic: 5,
            entropy_bins: 20,
            fractal_scales: vec![2, 4, 8, 16],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicPattern {
    /// Period in samples
    pub period: usize,
    pub correlation: f64,
    /// Radians, from the best circular alignment of the first two segments
    pub phase: f64,
    /// Mean peak-to-peak per segment
    pub amplitude: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeDirection {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikePattern {
    /// First sample of the spike region; the region is [position, position + width)
    pub position: usize,
    pub peak_index: usize,
    pub width: usize,
    pub value: f64,
    pub direction: SpikeDirection,
    /// Deviation from the mean in threshold units
    pub intensity: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPattern {
    pub start: usize,
    /// Exclusive
    pub end: usize,
    pub slope: f64,
    /// Fitted value at `start`
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
}

/// Group of similar values in the series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCluster {
    pub center: f64,
    pub size: usize,
    /// Members per unit of value range; 0.0 when all members are equal
    pub density: f64,
    pub spread: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonicPattern {
    pub harmonic_number: usize,
    pub fundamental_bin: usize,
    pub bin: usize,
    /// Cycles per sample
    pub frequency: f64,
    pub amplitude: f64,
    pub phase: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecognitionResult {
    pub sample_count: usize,
    pub periodic_patterns: Vec<PeriodicPattern>,
    pub spikes: Vec<SpikePattern>,
    pub trends: Vec<TrendPattern>,
    pub clusters: Vec<ValueCluster>,
    pub harmonics: Vec<HarmonicPattern>,
    pub complexity_score: f64,
}

impl PatternRecognitionResult {
    /// Period of the most confident periodic pattern
    pub fn dominant_period(&self) -> Option<usize> {
        self.periodic_patterns.first().map(|p| p.period)
    }

    pub fn pattern_count(&self) -> usize {
        self.periodic_patterns.len()
            + self.spikes.len()
            + self.trends.len()
            + self.clusters.len()
            + self.harmonics.len()
    }
}

/// Scalar time-series pattern recognizer
#[derive(Debug, Clone, Default)]
pub struct PatternRecognizer {
    params: PatternParams,
}

impl PatternRecognizer {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    pub fn recognize(&self, series: &[f64]) -> PatternRecognitionResult {
        if series.is_empty() {
            return PatternRecognitionResult::default();
        }

        let result = PatternRecognitionResult {
            sample_count: series.len(),
            periodic_patterns: self.detect_periodic(series),
            spikes: self.detect_spikes(series),
            trends: self.detect_trends(series),
            clusters: self.detect_value_clusters(series),
            harmonics: self.detect_harmonics(series),
            complexity_score: self.complexity(series),
        };

        debug!(
            "Patterns over {} samples: {} periodic, {} spikes, {} trends, {} clusters, {} harmonics, complexity {:.3}",
            series.len(),
            result.periodic_patterns.len(),
            result.spikes.len(),
            result.trends.len(),
            result.clusters.len(),
            result.harmonics.len(),
            result.complexity_score
        );

        result
    }

    pub fn detect_periodic(&self, series: &[f64]) -> Vec<PeriodicPattern> {
        let n = series.len();
        let max_period = (n / 3).min(self.params.max_period);
        let mut patterns = Vec::new();

        for period in 2..=max_period {
            let segments: Vec<&[f64]> = series.chunks_exact(period).collect();
            if segments.len() < 2 {
                continue;
            }

            let correlation = segments
                .windows(2)
                .map(|pair| stats::pearson_correlation(pair[0], pair[1]))
                .sum::<f64>()
                / (segments.len() - 1) as f64;

            if correlation <= self.params.periodic_correlation_threshold {
                continue;
            }

            let amplitude = segments
                .iter()
                .map(|s| stats::min_max(s).map(|(lo, hi)| hi - lo).unwrap_or(0.0))
                .sum::<f64>()
                / segments.len() as f64;

            let shift = best_circular_shift(segments[0], segments[1]);
            let phase = 2.0 * PI * shift as f64 / period as f64;

            let confidence = 0.7 * correlation + 0.3 * (amplitude / 100.0).clamp(0.0, 1.0);

            patterns.push(PeriodicPattern {
                period,
                correlation,
                phase,
                amplitude,
                confidence,
            });
        }

        patterns.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
        patterns
    }

    pub fn detect_spikes(&self, series: &[f64]) -> Vec<SpikePattern> {
        let n = series.len();
        if n < 3 {
            return Vec::new();
        }

        let mean = stats::mean(series);
        let threshold = (self.params.spike_std_multiplier * stats::std_dev(series))
            .max(self.params.spike_mad_multiplier * stats::median_absolute_deviation(series));
        if threshold <= 0.0 || !threshold.is_finite() {
            return Vec::new();
        }
        let shoulder = 0.5 * threshold;

        let mut spikes = Vec::new();
        let mut i = 1;
        while i + 1 < n {
            let value = series[i];
            let deviation = value - mean;
            let is_peak = deviation > threshold && value >= series[i - 1] && value >= series[i + 1];
            let is_trough = deviation < -threshold && value <= series[i - 1] && value <= series[i + 1];

            if !is_peak && !is_trough {
                i += 1;
                continue;
            }

            let mut start = i;
            while start > 0 && (series[start - 1] - mean).abs() > shoulder {
                start -= 1;
            }
            let mut end = i;
            while end + 1 < n && (series[end + 1] - mean).abs() > shoulder {
                end += 1;
            }
            let width = end - start + 1;

            let intensity = deviation.abs() / threshold;
            let confidence = 0.8 * (intensity / 5.0).clamp(0.0, 1.0)
                + 0.2 * (width as f64 / 10.0).clamp(0.0, 1.0);

            spikes.push(SpikePattern {
                position: start,
                peak_index: i,
                width,
                value,
                direction: if is_peak {
                    SpikeDirection::Positive
                } else {
                    SpikeDirection::Negative
                },
                intensity,
                confidence,
            });

            // Resume past the spike region so it is counted once
            i = end + 1;
        }

        spikes
    }

    pub fn detect_trends(&self, series: &[f64]) -> Vec<TrendPattern> {
        let n = series.len();
        let window = (n / 10).max(5);
        if n < window {
            return Vec::new();
        }
        let step = (window / 2).max(1);

        let mut candidates = Vec::new();
        let mut start = 0;
        while start + window <= n {
            let fit = stats::linear_regression(&series[start..start + window]);
            if fit.r_squared > self.params.trend_r_squared_threshold {
                candidates.push(TrendPattern {
                    start,
                    end: start + window,
                    slope: fit.slope,
                    intercept: fit.intercept,
                    r_squared: fit.r_squared,
                    direction: self.trend_direction(fit.slope),
                });
            }
            start += step;
        }

        let mut merged: Vec<TrendPattern> = Vec::new();
        for trend in candidates {
            if let Some(last) = merged.last_mut() {
                if last.direction == trend.direction
                    && trend.start <= last.end
                    && (trend.slope - last.slope).abs() < self.params.trend_merge_tolerance
                {
                    if let Some(refit) = self.refit_trend(series, last.start, last.end.max(trend.end)) {
                        if refit.direction == last.direction {
                            *last = refit;
                            continue;
                        }
                    }
                }
            }
            merged.push(trend);
        }

        merged
    }

    /// Fit `[start, end)` as one trend; None when the line fails the R² gate
    fn refit_trend(&self, series: &[f64], start: usize, end: usize) -> Option<TrendPattern> {
        let fit = stats::linear_regression(&series[start..end]);
        (fit.r_squared > self.params.trend_r_squared_threshold).then(|| TrendPattern {
            start,
            end,
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            direction: self.trend_direction(fit.slope),
        })
    }

    fn trend_direction(&self, slope: f64) -> TrendDirection {
        if slope.abs() <= self.params.stable_slope {
            TrendDirection::Stable
        } else if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }

    pub fn detect_value_clusters(&self, series: &[f64]) -> Vec<ValueCluster> {
        if series.len() < self.params.min_cluster_size {
            return Vec::new();
        }

        let mut sorted = series.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let gap = self.params.cluster_gap_factor * stats::std_dev(series);

        let mut groups: Vec<Vec<f64>> = Vec::new();
        let mut current = vec![sorted[0]];
        for pair in sorted.windows(2) {
            if pair[1] - pair[0] <= gap {
                current.push(pair[1]);
            } else {
                groups.push(std::mem::replace(&mut current, vec![pair[1]]));
            }
        }
        groups.push(current);

        let mut clusters: Vec<ValueCluster> = groups
            .into_iter()
            .filter(|g| g.len() >= self.params.min_cluster_size)
            .map(|g| {
                let (min, max) = stats::min_max(&g).unwrap_or((0.0, 0.0));
                let range = max - min;
                ValueCluster {
                    center: stats::mean(&g),
                    size: g.len(),
                    density: if range > 0.0 { g.len() as f64 / range } else { 0.0 },
                    spread: stats::std_dev(&g),
                    min,
                    max,
                }
            })
            .collect();

        clusters.sort_by(|a, b| b.density.partial_cmp(&a.density).unwrap_or(Ordering::Equal));
        clusters
    }

    pub fn detect_harmonics(&self, series: &[f64]) -> Vec<HarmonicPattern> {
        let spectrum = amplitude_spectrum(series);
        let Some(fundamental) = fundamental_bin(&spectrum) else {
            return Vec::new();
        };

        (2..=self.params.max_harmonic)
            .filter_map(|h| {
                let bin = spectrum.get(fundamental.index * h)?;
                (bin.amplitude > self.params.harmonic_amplitude_threshold).then(|| HarmonicPattern {
                    harmonic_number: h,
                    fundamental_bin: fundamental.index,
                    bin: bin.index,
                    frequency: bin.frequency,
                    amplitude: bin.amplitude,
                    phase: bin.phase,
                })
            })
            .collect()
    }

    /// 0.4·entropy + 0.3·fractal + 0.3·variability, clamped to [0, 1]
    pub fn complexity(&self, series: &[f64]) -> f64 {
        if series.is_empty() {
            return 0.0;
        }
        let entropy = stats::normalized_entropy(series, self.params.entropy_bins);
        let fractal = stats::fractal_dimension(series, &self.params.fractal_scales);
        let variability = stats::relative_variability(series).clamp(0.0, 1.0);

        (0.4 * entropy + 0.3 * fractal + 0.3 * variability).clamp(0.0, 1.0)
    }
}

/// Recognize patterns with default thresholds
pub fn recognize_patterns(series: &[f64]) -> PatternRecognitionResult {
    PatternRecognizer::default().recognize(series)
}

/// Rotation of `segment` that best matches `reference`
fn best_circular_shift(segment: &[f64], reference: &[f64]) -> usize {
    let len = segment.len();
    let mut best_shift = 0;
    let mut best_corr = f64::NEG_INFINITY;
    let mut rotated = segment.to_vec();

    for shift in 0..len {
        let corr = stats::pearson_correlation(&rotated, reference);
        if corr > best_corr {
            best_corr = corr;
            best_shift = shift;
        }
        rotated.rotate_left(1);
    }

    best_shift
}
