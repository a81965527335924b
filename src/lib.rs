//! EmfCheckr - Analyze electromagnetic field survey readings
//!
//! Takes readings captured by an EMF survey device (position, signal
//! strength, phase, frequency, depth) and finds structure in them:
//! spatial clusters, buried inclusions, temporal patterns and the most
//! likely target material.
//!
//! ## Features
//!
//! - **Density clustering**: DBSCAN over a weighted spatial + signal metric,
//!   with silhouette and Davies-Bouldin quality scores
//! - **Inclusion detection**: Deviation-based anomalies, merged and
//!   classified by shape, orientation and material
//! - **Pattern recognition**: Periodicity, spikes, trends, value clusters,
//!   harmonics and a complexity score for any reading channel
//! - **Material classification**: Calibrated EMFAD formula, optional
//!   pluggable inference engine, and a structural rule classifier
//! - **Survey profiles**: Presets with per-analyzer confidence modifiers
//!
//! ## Module Structure
//!
//! - `core` - Readings, distance metrics and the analysis algorithms
//! - `cli` - Command-line interface
//! - `config` - Survey profiles and configuration
//! - `detection` - Findings and survey verdicts
//! - `testgen` - Synthetic survey generation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use emfcheckr::core::{load_survey, SurveyAnalyzer};
//! use emfcheckr::config::{ProfileConfig, ProfilePreset};
//! use emfcheckr::detection::SurveyAssessment;
//!
//! let profile = ProfileConfig::from_preset(ProfilePreset::Deep);
//! let survey = load_survey(path)?;
//!
//! let report = SurveyAnalyzer::new(profile.clone()).analyze(&survey.readings);
//! let assessment = SurveyAssessment::from_report(survey.source, &report, &profile);
//!
//! println!("{}", assessment.verdict.description());
//! ```
//!
//! ## Survey Profiles
//!
//! | Profile          | Use Case                      | Key Adjustments                    |
//! |------------------|-------------------------------|------------------------------------|
//! | Standard         | General surveys               | Balanced defaults                  |
//! | Shallow          | Near-surface, small objects   | Tight clusters, small merge radius |
//! | Deep             | Deep, weak targets            | Wide clusters, stricter confidence |
//! | HighSensitivity  | Low-contrast sites            | Lower thresholds everywhere        |

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and profiles
pub mod config;

// Findings and verdicts
pub mod detection;

// Synthetic surveys
pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{AnalyzerType, ConfidenceModifier, ProfileBuilder, ProfileConfig, ProfilePreset};
pub use core::{
    AnalyzerBuilder, DataPoint, EmfError, EmfReading, EmfResult, SignalChannel, SurveyAnalyzer,
    SurveyData, SurveyReport,
};
pub use core::analysis::{
    ClusterAnalyzer, ClusterResult, InclusionDetectionResult, InclusionDetector,
    PatternRecognitionResult, PatternRecognizer,
};
pub use core::material::{
    EmfadClassifier, EmfadMaterial, InferenceEngine, MaterialAnalysis, MaterialClassifier,
};
pub use detection::{Finding, RawDetection, Severity, SurveyAssessment, SurveyVerdict};
