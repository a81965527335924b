// src/core/material/classifier.rs
//
// Material classification facade: model-first when an inference engine is
// attached, calibrated formulas otherwise or as fallback, with the rule
// cascade attached as a structural second opinion.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::analysis::MaterialAnalysis;
use super::emfad::{EmfadCalibration, EmfadClassifier, EmfadMaterial};
use super::features::FeatureVector;
use super::model::{InferenceEngine, ModelClassification, ModelClassifier};
use super::rules::{MaterialClassificationResult, MaterialType, PhysicsAnalysisRecord, RuleClassifier};
use crate::core::reading::EmfReading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialParams {
    pub calibration: EmfadCalibration,
    /// Minimum top-class score for a model verdict
    pub confidence_threshold: f64,
    pub inference_timeout_ms: u64,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            calibration: EmfadCalibration::default(),
            confidence_threshold: 0.7,
            inference_timeout_ms: 2000,
        }
    }
}

/// Which path produced the material verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    Physics,
    /// Model attached but failed or was below threshold
    PhysicsFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub analysis: MaterialAnalysis,
    pub source: ClassificationSource,
    pub model: Option<ModelClassification>,
    pub structure: MaterialClassificationResult,
}

/// Confidence-weighted material vote over a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMaterial {
    pub material: EmfadMaterial,
    /// Winner's share of the total vote weight
    pub confidence: f64,
    pub votes: usize,
    pub classified: usize,
}

pub struct MaterialClassifier {
    params: MaterialParams,
    physics: EmfadClassifier,
    model: Option<ModelClassifier>,
    rules: RuleClassifier,
}

impl MaterialClassifier {
    pub fn new(params: MaterialParams) -> Self {
        Self {
            physics: EmfadClassifier::new(params.calibration.clone()),
            model: None,
            rules: RuleClassifier::new(),
            params,
        }
    }

    /// Attach an inference engine and load `model` into it
    pub fn with_model(mut self, engine: Box<dyn InferenceEngine>, model: &[u8]) -> Self {
        self.model = Some(ModelClassifier::new(
            engine,
            model,
            self.params.confidence_threshold,
            Duration::from_millis(self.params.inference_timeout_ms),
        ));
        self
    }

    pub fn params(&self) -> &MaterialParams {
        &self.params
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Classify one reading. None when the reading cannot be evaluated at
    /// all (non-finite fields, non-positive frequency).
    pub fn classify(&self, reading: &EmfReading) -> Option<ClassificationOutcome> {
        let features = self.physics.derive(reading)?;
        let physics = self.physics.classify_material(reading)?;

        let (mut analysis, source, model) = match &self.model {
            None => (physics, ClassificationSource::Physics, None),
            Some(model) => {
                let verdict = model.classify(&FeatureVector::build(reading, &features));
                let (analysis, source) = merge_model_verdict(physics, &verdict);
                (analysis, source, Some(verdict))
            }
        };

        let structure = self.rules.classify(&PhysicsAnalysisRecord::from_analysis(&analysis));
        if structure.material_type != MaterialType::Unknown
            && structure.material_type.is_metallic() != analysis.material.is_metallic()
        {
            analysis.recommendations.push(format!(
                "Structure reads as {} while the material is {}; check for a hollow or layered target",
                structure.material_type, analysis.material
            ));
        }

        Some(ClassificationOutcome {
            analysis,
            source,
            model,
            structure,
        })
    }

    /// Classify a batch in parallel; order matches the input
    pub fn classify_batch(&self, readings: &[EmfReading]) -> Vec<Option<ClassificationOutcome>> {
        let outcomes: Vec<_> = readings.par_iter().map(|r| self.classify(r)).collect();

        let classified = outcomes.iter().flatten().count();
        info!(
            "Material classification: {}/{} readings classified{}",
            classified,
            readings.len(),
            if self.has_model() { " (model attached)" } else { "" }
        );

        outcomes
    }
}

impl std::fmt::Debug for MaterialClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialClassifier")
            .field("params", &self.params)
            .field("model", &self.model)
            .finish()
    }
}

fn merge_model_verdict(
    physics: MaterialAnalysis,
    verdict: &ModelClassification,
) -> (MaterialAnalysis, ClassificationSource) {
    if let Some(error) = &verdict.error {
        debug!("Model unavailable, using formula result: {}", error);
        let mut analysis = physics;
        analysis
            .recommendations
            .push(format!("Model inference unavailable ({}); calibrated formula result used", error));
        return (analysis, ClassificationSource::PhysicsFallback);
    }

    if verdict.material == EmfadMaterial::Unknown {
        let mut analysis = physics;
        analysis.recommendations.push(format!(
            "Model confidence {:.2} below threshold; calibrated formula result used",
            verdict.confidence
        ));
        return (analysis, ClassificationSource::PhysicsFallback);
    }

    let formula_material = physics.material;
    let mut analysis = MaterialAnalysis {
        material: verdict.material,
        confidence: verdict.confidence.clamp(0.0, 1.0),
        ..physics
    };
    if formula_material != verdict.material {
        analysis.recommendations.push(format!(
            "Model ({}) and calibrated formula ({}) disagree; verify on site",
            verdict.material, formula_material
        ));
    }
    (analysis, ClassificationSource::Model)
}

/// Confidence-weighted vote across classified readings. Unknown verdicts
/// are counted as classified but cast no vote.
pub fn session_material(outcomes: &[Option<ClassificationOutcome>]) -> Option<SessionMaterial> {
    let classified: Vec<&ClassificationOutcome> = outcomes.iter().flatten().collect();

    let mut weights: HashMap<EmfadMaterial, (f64, usize)> = HashMap::new();
    for outcome in &classified {
        let material = outcome.analysis.material;
        if material == EmfadMaterial::Unknown {
            continue;
        }
        let entry = weights.entry(material).or_insert((0.0, 0));
        entry.0 += outcome.analysis.confidence;
        entry.1 += 1;
    }

    let total: f64 = weights.values().map(|(w, _)| w).sum();
    let (material, (weight, votes)) = weights
        .into_iter()
        .max_by(|a, b| {
            a.1 .0
                .partial_cmp(&b.1 .0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1 .1.cmp(&b.1 .1))
        })?;

    Some(SessionMaterial {
        material,
        confidence: if total > 0.0 { weight / total } else { 0.0 },
        votes,
        classified: classified.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{EmfError, EmfResult};

    struct ScoreEngine(Vec<f32>);

    impl InferenceEngine for ScoreEngine {
        fn initialize(&mut self, model: &[u8]) -> bool {
            !model.is_empty()
        }

        fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn cleanup(&mut self) {}
    }

    struct FailingEngine;

    impl InferenceEngine for FailingEngine {
        fn initialize(&mut self, _model: &[u8]) -> bool {
            true
        }

        fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
            Err(EmfError::Inference("backend crashed".to_string()))
        }

        fn cleanup(&mut self) {}
    }

    fn iron_reading() -> EmfReading {
        EmfReading::at(0.0, 0.0, 0.0, 900.0)
            .with_frequency(20_000.0)
            .with_phase(30.0)
            .with_complex(720.0, 540.0)
    }

    #[test]
    fn test_physics_only() {
        let classifier = MaterialClassifier::new(MaterialParams::default());
        let outcome = classifier.classify(&iron_reading()).unwrap();
        assert_eq!(outcome.source, ClassificationSource::Physics);
        assert_eq!(outcome.analysis.material, EmfadMaterial::Iron);
        assert!(outcome.model.is_none());
        assert!(outcome.structure.material_type.is_metallic());
    }

    #[test]
    fn test_structure_agrees_with_ferrous_verdict() {
        let classifier = MaterialClassifier::new(MaterialParams::default());
        let flat_phase = EmfReading::at(0.0, 0.0, 0.0, 900.0)
            .with_frequency(20_000.0)
            .with_phase(0.0)
            .with_complex(900.0, 0.0);

        let outcome = classifier.classify(&flat_phase).unwrap();
        assert_eq!(outcome.analysis.material, EmfadMaterial::Iron);
        assert_eq!(outcome.structure.material_type, MaterialType::FerrousMetal);
        assert!(outcome.structure.record.conductivity >= crate::core::material::rules::METAL_CONDUCTIVITY);
    }

    #[test]
    fn test_model_verdict_wins() {
        let mut scores = vec![0.0; 15];
        scores[5] = 0.95;
        let classifier = MaterialClassifier::new(MaterialParams::default())
            .with_model(Box::new(ScoreEngine(scores)), b"weights");

        let outcome = classifier.classify(&iron_reading()).unwrap();
        assert_eq!(outcome.source, ClassificationSource::Model);
        assert_eq!(outcome.analysis.material, EmfadMaterial::Gold);
        assert!((outcome.analysis.confidence - 0.95).abs() < 1e-6);
        assert!(outcome
            .analysis
            .recommendations
            .iter()
            .any(|r| r.contains("disagree")));
    }

    #[test]
    fn test_model_failure_falls_back() {
        let classifier =
            MaterialClassifier::new(MaterialParams::default()).with_model(Box::new(FailingEngine), b"m");

        let outcome = classifier.classify(&iron_reading()).unwrap();
        assert_eq!(outcome.source, ClassificationSource::PhysicsFallback);
        assert_eq!(outcome.analysis.material, EmfadMaterial::Iron);
        assert!(outcome.model.unwrap().is_failure());
    }

    #[test]
    fn test_rejected_model_falls_back() {
        let classifier = MaterialClassifier::new(MaterialParams::default())
            .with_model(Box::new(ScoreEngine(vec![1.0; 15])), b"");

        let outcome = classifier.classify(&iron_reading()).unwrap();
        assert_eq!(outcome.source, ClassificationSource::PhysicsFallback);
    }

    #[test]
    fn test_session_vote() {
        let classifier = MaterialClassifier::new(MaterialParams::default());
        let mut readings = vec![iron_reading(); 3];
        readings.push(EmfReading::at(1.0, 0.0, 0.0, f64::NAN));

        let outcomes = classifier.classify_batch(&readings);
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[3].is_none());

        let verdict = session_material(&outcomes).unwrap();
        assert_eq!(verdict.material, EmfadMaterial::Iron);
        assert_eq!(verdict.votes, 3);
        assert!((verdict.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_session_vote_empty() {
        assert!(session_material(&[]).is_none());
    }
}
