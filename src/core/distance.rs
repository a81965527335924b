// src/core/distance.rs
//
// Clustering-space projection of readings and the composite distance used
// for DBSCAN neighbourhoods and cluster quality indices.

use serde::{Deserialize, Serialize};

use super::reading::EmfReading;

/// A reading projected into clustering space.
///
/// `original_index` points back into the caller's reading slice; it is
/// `None` for synthetic points such as cluster centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub signal_strength: f64,
    pub frequency: f64,
    pub phase: f64,
    pub original_index: Option<usize>,
}

impl DataPoint {
    pub fn from_reading(index: usize, reading: &EmfReading) -> Self {
        Self {
            x: reading.x,
            y: reading.y,
            z: reading.z,
            signal_strength: reading.signal_strength,
            frequency: reading.frequency,
            phase: reading.phase,
            original_index: Some(index),
        }
    }

    pub fn spatial_distance(&self, other: &DataPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Distance between two clustering points
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &DataPoint, b: &DataPoint) -> f64;
}

/// Weighted sum of pre-scaled spatial and signal differences.
///
/// The scaling (signal and frequency per 1000, phase per 360 degrees) keeps
/// the spatial term dominant for typical survey values. The result mixes
/// units and is only meaningful relative to the `eps` it is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEmfDistance {
    pub spatial_weight: f64,
    pub signal_weight: f64,
    pub frequency_weight: f64,
    pub phase_weight: f64,
}

impl Default for WeightedEmfDistance {
    fn default() -> Self {
        Self {
            spatial_weight: 0.4,
            signal_weight: 0.3,
            frequency_weight: 0.2,
            phase_weight: 0.1,
        }
    }
}

impl DistanceMetric for WeightedEmfDistance {
    fn distance(&self, a: &DataPoint, b: &DataPoint) -> f64 {
        let spatial = a.spatial_distance(b);
        let signal = (a.signal_strength - b.signal_strength).abs() / 1000.0;
        let frequency = (a.frequency - b.frequency).abs() / 1000.0;
        let phase = (a.phase - b.phase).abs() / 360.0;

        self.spatial_weight * spatial
            + self.signal_weight * signal
            + self.frequency_weight * frequency
            + self.phase_weight * phase
    }
}
