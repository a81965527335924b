// src/core/analysis/clustering.rs
//
// DBSCAN spatial clustering of EMF readings using the weighted composite
// distance, with per-cluster geometry and global quality indices
// (silhouette, Davies-Bouldin).

use std::collections::VecDeque;
use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::distance::{DataPoint, DistanceMetric, WeightedEmfDistance};
use crate::core::reading::EmfReading;

/// DBSCAN parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringParams {
    /// Neighbourhood radius in weighted-distance units
    pub eps: f64,
    /// Neighbours (self included) required for a core point
    pub min_points: usize,
    pub metric: WeightedEmfDistance,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_points: 3,
            metric: WeightedEmfDistance::default(),
        }
    }
}

/// Per-call DBSCAN label; lives in a side table, never on the points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Unclassified,
    Noise,
    Cluster(usize),
}

/// One density-connected group of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// 1-based cluster id
    pub id: usize,
    pub points: Vec<DataPoint>,
    /// Signal-strength weighted centroid (`original_index` is None)
    pub centroid: DataPoint,
    /// Largest spatial distance from a member to the centroid
    pub radius: f64,
    /// Members per unit sphere volume; 0.0 for a zero-radius cluster
    pub density: f64,
    /// 1 - mean/max member distance to the centroid
    pub coherence: f64,
}

impl Cluster {
    fn new(id: usize, points: Vec<DataPoint>) -> Self {
        let centroid = weighted_centroid(&points);

        let distances: Vec<f64> = points
            .iter()
            .map(|p| p.spatial_distance(&centroid))
            .collect();
        let radius = distances.iter().copied().fold(0.0f64, f64::max);
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };

        let volume = 4.0 / 3.0 * PI * radius.powi(3);
        let density = if volume > 0.0 {
            points.len() as f64 / volume
        } else {
            0.0
        };

        // A zero-extent cluster is perfectly coherent
        let coherence = if radius > 0.0 {
            1.0 - avg_distance / radius
        } else {
            1.0
        };

        Self {
            id,
            points,
            centroid,
            radius,
            density,
            coherence,
        }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Indices of the member readings in the caller's input slice
    pub fn reading_indices(&self) -> Vec<usize> {
        self.points.iter().filter_map(|p| p.original_index).collect()
    }
}

/// Clustering output for one reading set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    pub cluster_count: usize,
    pub average_density: f64,
    /// Mean pairwise centroid distance
    pub average_separation: f64,
    pub average_coherence: f64,
    pub clusters: Vec<Cluster>,
    pub noise_points: Vec<DataPoint>,
    pub silhouette_score: f64,
    pub davies_bouldin_index: f64,
}

impl ClusterResult {
    pub fn noise_ratio(&self) -> f64 {
        let clustered: usize = self.clusters.iter().map(Cluster::size).sum();
        let total = clustered + self.noise_points.len();
        if total == 0 {
            0.0
        } else {
            self.noise_points.len() as f64 / total as f64
        }
    }

    /// Cluster id for each input reading (None = noise)
    pub fn assignments(&self, reading_count: usize) -> Vec<Option<usize>> {
        let mut assignments = vec![None; reading_count];
        for cluster in &self.clusters {
            for index in cluster.reading_indices() {
                if index < reading_count {
                    assignments[index] = Some(cluster.id);
                }
            }
        }
        assignments
    }
}

/// DBSCAN analyzer
#[derive(Debug, Clone, Default)]
pub struct ClusterAnalyzer {
    params: ClusteringParams,
}

impl ClusterAnalyzer {
    pub fn new(params: ClusteringParams) -> Self {
        Self { params }
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.params.eps = eps;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.params.min_points = min_points;
        self
    }

    pub fn params(&self) -> &ClusteringParams {
        &self.params
    }

    /// Cluster the readings with the configured parameters
    pub fn analyze(&self, readings: &[EmfReading]) -> ClusterResult {
        perform_clustering_with(
            readings,
            self.params.eps,
            self.params.min_points,
            &self.params.metric,
        )
    }
}

/// Cluster readings with the default weighted metric
pub fn perform_clustering(readings: &[EmfReading], eps: f64, min_points: usize) -> ClusterResult {
    perform_clustering_with(readings, eps, min_points, &WeightedEmfDistance::default())
}

/// Cluster readings with an explicit distance metric
pub fn perform_clustering_with(
    readings: &[EmfReading],
    eps: f64,
    min_points: usize,
    metric: &dyn DistanceMetric,
) -> ClusterResult {
    if readings.is_empty() {
        return ClusterResult::default();
    }

    let points: Vec<DataPoint> = readings
        .iter()
        .enumerate()
        .map(|(i, r)| DataPoint::from_reading(i, r))
        .collect();

    let labels = dbscan(&points, eps, min_points, metric);

    let cluster_count = labels
        .iter()
        .filter_map(|l| match l {
            Label::Cluster(id) => Some(*id),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut members: Vec<Vec<DataPoint>> = vec![Vec::new(); cluster_count];
    let mut noise_points = Vec::new();
    for (point, label) in points.into_iter().zip(&labels) {
        match label {
            Label::Cluster(id) => members[id - 1].push(point),
            // Unclassified cannot survive the pass
            Label::Noise | Label::Unclassified => noise_points.push(point),
        }
    }

    let clusters: Vec<Cluster> = members
        .into_iter()
        .enumerate()
        .filter(|(_, pts)| !pts.is_empty())
        .map(|(i, pts)| Cluster::new(i + 1, pts))
        .collect();

    let result = summarize(clusters, noise_points, metric);
    debug!(
        "DBSCAN eps={} min_points={}: {} clusters, {} noise, silhouette {:.3}",
        eps,
        min_points,
        result.cluster_count,
        result.noise_points.len(),
        result.silhouette_score
    );
    result
}

fn region_query(
    points: &[DataPoint],
    index: usize,
    eps: f64,
    metric: &dyn DistanceMetric,
) -> Vec<usize> {
    let origin = &points[index];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| metric.distance(origin, p) <= eps)
        .map(|(i, _)| i)
        .collect()
}

fn dbscan(
    points: &[DataPoint],
    eps: f64,
    min_points: usize,
    metric: &dyn DistanceMetric,
) -> Vec<Label> {
    let n = points.len();
    let mut visited = vec![false; n];
    let mut labels = vec![Label::Unclassified; n];
    let mut cluster_id = 1;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors = region_query(points, i, eps, metric);
        if neighbors.len() < min_points {
            labels[i] = Label::Noise;
            continue;
        }

        labels[i] = Label::Cluster(cluster_id);
        let mut queued = vec![false; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for &j in &neighbors {
            if !queued[j] {
                queued[j] = true;
                queue.push_back(j);
            }
        }

        let mut cluster_size = 1;
        while let Some(j) = queue.pop_front() {
            if !visited[j] {
                visited[j] = true;
                let expansion = region_query(points, j, eps, metric);
                if expansion.len() >= min_points {
                    for k in expansion {
                        if !queued[k] {
                            queued[k] = true;
                            queue.push_back(k);
                        }
                    }
                }
            }
            if matches!(labels[j], Label::Unclassified | Label::Noise) {
                labels[j] = Label::Cluster(cluster_id);
                cluster_size += 1;
            }
        }

        if cluster_size > 0 {
            cluster_id += 1;
        }
    }

    labels
}

/// Signal-strength weighted average; falls back to the plain mean when the
/// weights sum to zero
fn weighted_centroid(points: &[DataPoint]) -> DataPoint {
    let total_weight: f64 = points.iter().map(|p| p.signal_strength.abs()).sum();
    let uniform = total_weight <= 0.0 || !total_weight.is_finite();
    let norm = if uniform { points.len().max(1) as f64 } else { total_weight };

    let weight = |p: &DataPoint| if uniform { 1.0 } else { p.signal_strength.abs() };
    let avg = |f: fn(&DataPoint) -> f64| points.iter().map(|p| weight(p) * f(p)).sum::<f64>() / norm;

    DataPoint {
        x: avg(|p| p.x),
        y: avg(|p| p.y),
        z: avg(|p| p.z),
        signal_strength: avg(|p| p.signal_strength),
        frequency: avg(|p| p.frequency),
        phase: avg(|p| p.phase),
        original_index: None,
    }
}

fn summarize(
    clusters: Vec<Cluster>,
    noise_points: Vec<DataPoint>,
    metric: &dyn DistanceMetric,
) -> ClusterResult {
    let cluster_count = clusters.len();
    if cluster_count == 0 {
        return ClusterResult {
            noise_points,
            ..Default::default()
        };
    }

    let average_density = clusters.iter().map(|c| c.density).sum::<f64>() / cluster_count as f64;
    let average_coherence = clusters.iter().map(|c| c.coherence).sum::<f64>() / cluster_count as f64;

    let mut separation_sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..cluster_count {
        for j in i + 1..cluster_count {
            separation_sum += metric.distance(&clusters[i].centroid, &clusters[j].centroid);
            pairs += 1;
        }
    }
    let average_separation = if pairs > 0 {
        separation_sum / pairs as f64
    } else {
        0.0
    };

    let silhouette_score = silhouette(&clusters, metric);
    let davies_bouldin_index = davies_bouldin(&clusters, metric);

    ClusterResult {
        cluster_count,
        average_density,
        average_separation,
        average_coherence,
        clusters,
        noise_points,
        silhouette_score,
        davies_bouldin_index,
    }
}

fn mean_distance_to(point: &DataPoint, others: &[DataPoint], metric: &dyn DistanceMetric) -> f64 {
    if others.is_empty() {
        return 0.0;
    }
    others.iter().map(|o| metric.distance(point, o)).sum::<f64>() / others.len() as f64
}

/// Mean silhouette over clustered points. Members of single-point clusters
/// are skipped; fewer than two clusters gives 0.0.
fn silhouette(clusters: &[Cluster], metric: &dyn DistanceMetric) -> f64 {
    if clusters.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut counted = 0usize;

    for (ci, cluster) in clusters.iter().enumerate() {
        if cluster.size() < 2 {
            continue;
        }
        for (pi, point) in cluster.points.iter().enumerate() {
            let a = cluster
                .points
                .iter()
                .enumerate()
                .filter(|(qi, _)| *qi != pi)
                .map(|(_, q)| metric.distance(point, q))
                .sum::<f64>()
                / (cluster.size() - 1) as f64;

            let b = clusters
                .iter()
                .enumerate()
                .filter(|(cj, _)| *cj != ci)
                .map(|(_, other)| mean_distance_to(point, &other.points, metric))
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            let s = if denom > 0.0 && denom.is_finite() {
                (b - a) / denom
            } else {
                0.0
            };
            total += s;
            counted += 1;
        }
    }

    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

/// Davies-Bouldin index; pairs with coincident centroids are skipped
fn davies_bouldin(clusters: &[Cluster], metric: &dyn DistanceMetric) -> f64 {
    let k = clusters.len();
    if k < 2 {
        return 0.0;
    }

    let scatter: Vec<f64> = clusters
        .iter()
        .map(|c| mean_distance_to(&c.centroid, &c.points, metric))
        .collect();

    let mut total = 0.0;
    for i in 0..k {
        let mut worst = 0.0f64;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = metric.distance(&clusters[i].centroid, &clusters[j].centroid);
            if separation > 0.0 {
                worst = worst.max((scatter[i] + scatter[j]) / separation);
            }
        }
        total += worst;
    }

    total / k as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(x: f64, y: f64) -> EmfReading {
        EmfReading::at(x, y, 0.0, 500.0)
    }

    #[test]
    fn test_three_collinear_points_single_cluster() {
        let readings = vec![reading(0.0, 0.0), reading(0.1, 0.0), reading(0.2, 0.0)];
        let result = perform_clustering(&readings, 0.5, 2);

        assert_eq!(result.cluster_count, 1);
        assert_eq!(result.clusters[0].size(), 3);
        assert!(result.noise_points.is_empty());
        assert!((result.clusters[0].radius - 0.1).abs() < 1e-9);
        assert!((result.clusters[0].centroid.x - 0.1).abs() < 1e-9);
        assert_eq!(result.clusters[0].centroid.original_index, None);
    }

    #[test]
    fn test_empty_input() {
        let result = perform_clustering(&[], 0.5, 3);
        assert_eq!(result, ClusterResult::default());
    }

    #[test]
    fn test_isolated_point_is_noise() {
        let readings = vec![
            reading(0.0, 0.0),
            reading(0.1, 0.0),
            reading(0.0, 0.1),
            reading(50.0, 50.0),
        ];
        let result = perform_clustering(&readings, 0.5, 3);
        assert_eq!(result.cluster_count, 1);
        assert_eq!(result.noise_points.len(), 1);
        assert_eq!(result.noise_points[0].original_index, Some(3));
    }

    #[test]
    fn test_border_point_absorbed_from_noise() {
        // Index 0 is visited first and lacks density on its own, so it is
        // provisionally noise; the core points later reach it.
        let readings = vec![
            reading(-1.05, 0.0),
            reading(0.0, 0.0),
            reading(0.1, 0.0),
            reading(0.2, 0.0),
        ];
        let result = perform_clustering(&readings, 0.45, 3);
        assert_eq!(result.cluster_count, 1);
        assert!(result.noise_points.is_empty());
        assert_eq!(result.clusters[0].size(), 4);
    }

    #[test]
    fn test_single_cluster_has_no_quality_indices() {
        let readings = vec![reading(0.0, 0.0), reading(0.1, 0.0), reading(0.2, 0.0)];
        let result = perform_clustering(&readings, 0.5, 2);
        assert_eq!(result.average_separation, 0.0);
        assert_eq!(result.silhouette_score, 0.0);
        assert_eq!(result.davies_bouldin_index, 0.0);
    }

    #[test]
    fn test_two_blobs_are_separated() {
        let mut readings = Vec::new();
        for i in 0..5 {
            readings.push(reading(i as f64 * 0.1, 0.0));
            readings.push(reading(20.0 + i as f64 * 0.1, 0.0));
        }
        let result = perform_clustering(&readings, 0.5, 3);
        assert_eq!(result.cluster_count, 2);
        assert!(result.silhouette_score > 0.9);
        assert!(result.davies_bouldin_index < 0.1);
        assert!(result.average_separation > 7.0);
    }

    #[test]
    fn test_coincident_points_are_coherent() {
        let readings = vec![reading(1.0, 1.0); 4];
        let result = perform_clustering(&readings, 0.5, 3);
        assert_eq!(result.cluster_count, 1);
        assert_eq!(result.clusters[0].radius, 0.0);
        assert_eq!(result.clusters[0].density, 0.0);
        assert_eq!(result.clusters[0].coherence, 1.0);
    }
}
