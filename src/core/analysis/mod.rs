//! Survey analysis algorithms
//!
//! - Spatial clustering (DBSCAN over a weighted EMF distance)
//! - Sub-surface inclusion detection from signal anomalies
//! - Pattern recognition over a single scalar channel
//! - Direct DFT used by the harmonic search

pub mod clustering;
pub mod inclusions;
pub mod patterns;
pub mod spectrum;

pub use clustering::{
    perform_clustering, perform_clustering_with, Cluster, ClusterAnalyzer, ClusterResult,
    ClusteringParams,
};
pub use inclusions::{
    detect_inclusions, BoundingBox, Inclusion, InclusionDetectionResult, InclusionDetector,
    InclusionParams, InclusionShape, InclusionType, Orientation, SPEED_OF_LIGHT,
};
pub use patterns::{
    recognize_patterns, HarmonicPattern, PatternParams, PatternRecognitionResult,
    PatternRecognizer, PeriodicPattern, SpikeDirection, SpikePattern, TrendDirection,
    TrendPattern, ValueCluster,
};
pub use spectrum::{amplitude_spectrum, fundamental_bin, SpectralBin};
