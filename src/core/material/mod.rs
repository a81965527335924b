// src/core/material/mod.rs
//
// Material classification: calibrated EMFAD formulas, pluggable model
// inference and the structural rule cascade.

pub mod analysis;
pub mod classifier;
pub mod emfad;
pub mod features;
pub mod model;
pub mod rules;

pub use analysis::MaterialAnalysis;
pub use classifier::{
    session_material, ClassificationOutcome, ClassificationSource, MaterialClassifier, MaterialParams,
    SessionMaterial,
};
pub use emfad::{EmfadCalibration, EmfadClassifier, EmfadMaterial, PhysicsFeatures};
pub use features::{FeatureVector, FEATURE_COUNT};
pub use model::{InferenceEngine, ModelClassification, ModelClassifier};
pub use rules::{MaterialClassificationResult, MaterialType, PhysicsAnalysisRecord, RuleClassifier};
