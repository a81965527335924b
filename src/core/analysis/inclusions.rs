// src/core/analysis/inclusions.rs
//
// Sub-surface inclusion detection: statistical anomaly flagging over the
// reading stream, greedy spatial merging of nearby anomalies, geometric
// estimation and threshold-based type classification.

use std::f64::consts::PI;
use std::fmt;
use std::time::Instant;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::reading::EmfReading;
use crate::core::stats;

/// Speed of light in vacuum, m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Inclusion detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InclusionParams {
    /// Normalised deviation (|v - mean| / std) above which a reading is anomalous
    pub anomaly_threshold: f64,
    /// Anomalies closer than this (metres) are merged
    pub merge_radius: f64,
    pub min_inclusion_size: f64,
    pub max_inclusion_size: f64,
    /// Wave propagation speed used for the wavelength estimate, m/s
    pub propagation_speed: f64,
    /// Fraction of wavelength × anomaly score taken as the size estimate
    pub size_factor: f64,
}

impl Default for InclusionParams {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.2,
            merge_radius: 1.0,
            min_inclusion_size: 0.1,
            max_inclusion_size: 10.0,
            propagation_speed: SPEED_OF_LIGHT,
            size_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InclusionType {
    Metallic,
    NonMetallic,
    Void,
    Crack,
    ForeignMaterial,
    Corrosion,
    Unknown,
}

impl InclusionType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Metallic => "metallic",
            Self::NonMetallic => "non-metallic",
            Self::Void => "void",
            Self::Crack => "crack",
            Self::ForeignMaterial => "foreign material",
            Self::Corrosion => "corrosion",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InclusionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InclusionShape {
    Spherical,
    Cylindrical,
    Planar,
    Irregular,
    Linear,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
    Diagonal,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
            Orientation::Diagonal => write!(f, "diagonal"),
        }
    }
}

/// Axis-aligned box around an inclusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Cube of side `size` centred on `center`
    pub fn cube(center: [f64; 3], size: f64) -> Self {
        let half = size / 2.0;
        Self {
            min: [center[0] - half, center[1] - half, center[2] - half],
            max: [center[0] + half, center[1] + half, center[2] + half],
        }
    }

    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// A detected sub-surface feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inclusion {
    pub id: usize,
    pub inclusion_type: InclusionType,
    pub position: [f64; 3],
    /// Estimated extent in metres
    pub size: f64,
    /// Cubic metres
    pub volume: f64,
    pub signal_strength: f64,
    pub confidence: f64,
    pub shape: InclusionShape,
    pub material_type: String,
    pub depth: f64,
    pub orientation: Orientation,
    pub bounding_box: BoundingBox,
    /// Index of the representative reading
    pub reading_index: usize,
}

/// Anomalous reading found by the statistical pass
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SignalAnomaly {
    pub index: usize,
    pub reading: EmfReading,
    pub signal_deviation: f64,
    pub phase_deviation: f64,
    pub anomaly_score: f64,
}

/// Inclusion detection output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionDetectionResult {
    pub inclusion_count: usize,
    pub inclusions: Vec<Inclusion>,
    pub total_volume: f64,
    pub average_size: f64,
    pub detection_confidence: f64,
    pub analysis_quality: f64,
    pub processing_time_ms: f64,
    /// Anomalies before merging and geometric filtering
    pub anomaly_count: usize,
    pub evidence: Vec<String>,
}

/// Anomaly-driven inclusion detector
#[derive(Debug, Clone, Default)]
pub struct InclusionDetector {
    params: InclusionParams,
}

impl InclusionDetector {
    pub fn new(params: InclusionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &InclusionParams {
        &self.params
    }

    /// Run the full detection pipeline
    pub fn detect(&self, readings: &[EmfReading]) -> InclusionDetectionResult {
        let started = Instant::now();

        if readings.is_empty() {
            return InclusionDetectionResult::default();
        }

        let anomalies = self.identify_anomalies(readings);
        let anomaly_count = anomalies.len();
        let merged = self.merge_nearby(anomalies);

        let inclusions: Vec<Inclusion> = merged
            .iter()
            .filter_map(|anomaly| self.extract_geometry(anomaly))
            .enumerate()
            .map(|(i, inclusion)| classify_inclusion(Inclusion { id: i + 1, ..inclusion }))
            .collect();

        let count = inclusions.len();
        let total_volume: f64 = inclusions.iter().map(|i| i.volume).sum();
        let (average_size, detection_confidence) = if count > 0 {
            (
                inclusions.iter().map(|i| i.size).sum::<f64>() / count as f64,
                inclusions.iter().map(|i| i.confidence).sum::<f64>() / count as f64,
            )
        } else {
            (0.0, 0.0)
        };

        // More detections per reading means more false-positive risk
        let mean_quality = readings.iter().map(|r| r.quality_score).sum::<f64>() / readings.len() as f64;
        let detection_rate = (count as f64 / readings.len() as f64).clamp(0.0, 1.0);
        let analysis_quality = mean_quality * (1.0 - 0.1 * detection_rate);

        let mut evidence = Vec::new();
        if anomaly_count > 0 {
            evidence.push(format!(
                "{} anomalous readings merged into {} candidates, {} within size bounds",
                anomaly_count,
                merged.len(),
                count
            ));
        }
        for inclusion in &inclusions {
            evidence.push(format!(
                "#{} {} ({}) at ({:.2}, {:.2}, {:.2}), size {:.2} m, {:.0}% confidence",
                inclusion.id,
                inclusion.inclusion_type,
                inclusion.material_type,
                inclusion.position[0],
                inclusion.position[1],
                inclusion.position[2],
                inclusion.size,
                inclusion.confidence * 100.0
            ));
        }

        debug!(
            "Inclusion detection: {} readings, {} anomalies, {} inclusions",
            readings.len(),
            anomaly_count,
            count
        );

        InclusionDetectionResult {
            inclusion_count: count,
            inclusions,
            total_volume,
            average_size,
            detection_confidence,
            analysis_quality,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            anomaly_count,
            evidence,
        }
    }

    /// Flag readings whose signal or phase deviates from the stream mean.
    /// A channel without spread is skipped rather than divided by zero.
    pub(crate) fn identify_anomalies(&self, readings: &[EmfReading]) -> Vec<SignalAnomaly> {
        let signals: Vec<f64> = readings.iter().map(|r| r.signal_strength).collect();
        let phases: Vec<f64> = readings.iter().map(|r| r.phase).collect();

        let signal_mean = stats::mean(&signals);
        let signal_std = stats::std_dev(&signals);
        let phase_mean = stats::mean(&phases);
        let phase_std = stats::std_dev(&phases);

        let normalised = |value: f64, mean: f64, std: f64| {
            if std > 0.0 {
                (value - mean).abs() / std
            } else {
                0.0
            }
        };

        readings
            .iter()
            .enumerate()
            .filter_map(|(index, reading)| {
                let signal_deviation = normalised(reading.signal_strength, signal_mean, signal_std);
                let phase_deviation = normalised(reading.phase, phase_mean, phase_std);

                let threshold = self.params.anomaly_threshold;
                if signal_deviation > threshold || phase_deviation > threshold {
                    Some(SignalAnomaly {
                        index,
                        reading: reading.clone(),
                        signal_deviation,
                        phase_deviation,
                        anomaly_score: signal_deviation.max(phase_deviation),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Greedy single-pass grouping of anomalies within `merge_radius`.
    ///
    /// A merged group keeps its first member's index and reading (and so its
    /// position) and averages the deviation fields; it is not a spatial
    /// centroid.
    pub(crate) fn merge_nearby(&self, anomalies: Vec<SignalAnomaly>) -> Vec<SignalAnomaly> {
        let mut processed = vec![false; anomalies.len()];
        let mut merged = Vec::new();

        for i in 0..anomalies.len() {
            if processed[i] {
                continue;
            }
            processed[i] = true;

            let mut group = vec![i];
            for j in i + 1..anomalies.len() {
                if !processed[j]
                    && anomalies[i].reading.spatial_distance(&anomalies[j].reading)
                        < self.params.merge_radius
                {
                    processed[j] = true;
                    group.push(j);
                }
            }

            if group.len() >= 2 {
                let n = group.len() as f64;
                let avg = |f: fn(&SignalAnomaly) -> f64| {
                    group.iter().map(|&g| f(&anomalies[g])).sum::<f64>() / n
                };
                merged.push(SignalAnomaly {
                    index: anomalies[i].index,
                    reading: anomalies[i].reading.clone(),
                    signal_deviation: avg(|a| a.signal_deviation),
                    phase_deviation: avg(|a| a.phase_deviation),
                    anomaly_score: avg(|a| a.anomaly_score),
                });
            } else {
                merged.push(anomalies[i].clone());
            }
        }

        merged
    }

    /// Size, volume, shape, orientation and bounding box for one anomaly;
    /// None when the size estimate falls outside the accepted bounds
    pub(crate) fn extract_geometry(&self, anomaly: &SignalAnomaly) -> Option<Inclusion> {
        let reading = &anomaly.reading;
        if reading.frequency <= 0.0 {
            return None;
        }

        let wavelength = self.params.propagation_speed / reading.frequency;
        let size = wavelength * anomaly.anomaly_score * self.params.size_factor;
        if !(self.params.min_inclusion_size..=self.params.max_inclusion_size).contains(&size) {
            return None;
        }

        let radius = size / 2.0;
        let volume = 4.0 / 3.0 * PI * radius.powi(3);
        let position = reading.position();
        let confidence = (0.7 * (anomaly.anomaly_score / 3.0).min(1.0)
            + 0.3 * reading.quality_score.clamp(0.0, 1.0))
        .clamp(0.0, 1.0);

        Some(Inclusion {
            id: 0,
            inclusion_type: InclusionType::Unknown,
            position,
            size,
            volume,
            signal_strength: reading.signal_strength,
            confidence,
            shape: estimate_shape(reading),
            material_type: "unknown".to_string(),
            depth: reading.depth,
            orientation: estimate_orientation(reading.phase),
            bounding_box: BoundingBox::cube(position, size),
            reading_index: anomaly.index,
        })
    }
}

/// Detect inclusions with default parameters
pub fn detect_inclusions(readings: &[EmfReading]) -> InclusionDetectionResult {
    InclusionDetector::default().detect(readings)
}

/// Shape from the depth / signal aspect heuristic
fn estimate_shape(reading: &EmfReading) -> InclusionShape {
    if reading.signal_strength == 0.0 {
        return InclusionShape::Unknown;
    }
    let aspect_ratio = reading.depth / reading.signal_strength * 1000.0;

    match aspect_ratio {
        r if r.is_nan() => InclusionShape::Unknown,
        r if r > 5.0 => InclusionShape::Linear,
        r if r > 2.0 => InclusionShape::Cylindrical,
        r if r < 0.5 => InclusionShape::Planar,
        r if (0.8..=1.2).contains(&r) => InclusionShape::Spherical,
        _ => InclusionShape::Irregular,
    }
}

/// Orientation from the phase angle (degrees, any winding)
fn estimate_orientation(phase: f64) -> Orientation {
    let angle = phase.rem_euclid(360.0);
    match angle {
        a if a < 90.0 || a > 270.0 => Orientation::Horizontal,
        a if (90.0..=270.0).contains(&a) => Orientation::Vertical,
        _ => Orientation::Diagonal,
    }
}

/// Assign type and material label; first matching rule wins
fn classify_inclusion(inclusion: Inclusion) -> Inclusion {
    let strength = inclusion.signal_strength;

    let inclusion_type = match (strength, inclusion.depth, inclusion.shape) {
        (s, _, _) if s > 800.0 => InclusionType::Metallic,
        (s, d, _) if s < 200.0 && d > 5.0 => InclusionType::Void,
        (s, _, _) if s < 300.0 => InclusionType::NonMetallic,
        (_, _, InclusionShape::Linear) => InclusionType::Crack,
        (s, _, _) if (300.0..=500.0).contains(&s) => InclusionType::ForeignMaterial,
        _ => InclusionType::Unknown,
    };

    let material_type = match inclusion_type {
        InclusionType::Metallic if strength > 950.0 => "iron",
        InclusionType::Metallic if strength > 870.0 => "steel",
        InclusionType::Metallic => "aluminum",
        InclusionType::NonMetallic if inclusion.depth > 2.0 => "stone",
        InclusionType::NonMetallic => "plastic",
        InclusionType::Void => "air",
        InclusionType::Crack => "fracture",
        InclusionType::ForeignMaterial if strength > 400.0 => "ceramic",
        InclusionType::ForeignMaterial => "wood",
        InclusionType::Corrosion => "oxide",
        InclusionType::Unknown => "unknown",
    };

    Inclusion {
        inclusion_type,
        material_type: material_type.to_string(),
        ..inclusion
    }
}
