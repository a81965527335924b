// tests/material_test.rs
// Material classification: calibrated formula, model path and rule cascade

mod test_utils;

use std::time::Duration;

use emfcheckr::core::material::{
    ClassificationSource, EmfadCalibration, EmfadClassifier, EmfadMaterial, FeatureVector,
    MaterialClassifier, MaterialParams, MaterialType, ModelClassifier, PhysicsAnalysisRecord,
    RuleClassifier,
};
use emfcheckr::core::{EmfError, EmfResult};
use emfcheckr::{EmfReading, InferenceEngine};
use test_utils::{assert_close, FixedEngine};

struct BrokenEngine;

impl InferenceEngine for BrokenEngine {
    fn initialize(&mut self, _model: &[u8]) -> bool {
        true
    }

    fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
        Err(EmfError::Inference("device disconnected".to_string()))
    }

    fn cleanup(&mut self) {}
}

fn survey_reading() -> EmfReading {
    EmfReading::at(0.0, 0.0, 0.0, 900.0)
        .with_depth(1.0)
        .with_frequency(20_000.0)
}

fn features(reading: &EmfReading) -> FeatureVector {
    let physics = EmfadClassifier::default().derive(reading).unwrap();
    FeatureVector::build(reading, &physics)
}

#[test]
fn test_formula_classifies_iron_band() {
    let analysis = EmfadClassifier::new(EmfadCalibration::default())
        .classify_material(&survey_reading())
        .unwrap();

    assert_eq!(analysis.material, EmfadMaterial::Iron);
    assert!(analysis.is_metallic());
    assert!(analysis.confidence > 0.6 && analysis.confidence <= 1.0);
    assert!(analysis.emfad_depth >= 0.0);
    assert!(!analysis.recommendations.is_empty());
}

#[test]
fn test_low_model_score_is_unknown_with_that_score() {
    let reading = survey_reading();
    let model = ModelClassifier::new(
        Box::new(FixedEngine::scoring(4, 0.5)),
        b"weights",
        0.7,
        Duration::from_secs(1),
    );

    let verdict = model.classify(&features(&reading));
    assert_eq!(verdict.material, EmfadMaterial::Unknown);
    assert_close(verdict.confidence, 0.5, 1e-6);
    assert!(!verdict.is_failure());
}

#[test]
fn test_engine_error_is_unknown_with_zero_confidence() {
    let reading = survey_reading();
    let model = ModelClassifier::new(Box::new(BrokenEngine), b"weights", 0.7, Duration::from_secs(1));

    let verdict = model.classify(&features(&reading));
    assert_eq!(verdict.material, EmfadMaterial::Unknown);
    assert_eq!(verdict.confidence, 0.0);
    assert!(verdict.error.unwrap().contains("device disconnected"));
}

#[test]
fn test_classifier_keeps_formula_when_model_unsure() {
    let classifier = MaterialClassifier::new(MaterialParams::default())
        .with_model(Box::new(FixedEngine::scoring(4, 0.5)), b"weights");
    assert!(classifier.has_model());

    let outcome = classifier.classify(&survey_reading()).unwrap();
    assert_eq!(outcome.source, ClassificationSource::PhysicsFallback);
    assert_eq!(outcome.analysis.material, EmfadMaterial::Iron);

    let model = outcome.model.unwrap();
    assert_eq!(model.material, EmfadMaterial::Unknown);
    assert_close(model.confidence, 0.5, 1e-6);
}

#[test]
fn test_confident_model_overrides_formula() {
    let index = EmfadMaterial::MODEL_CLASSES
        .iter()
        .position(|m| *m == EmfadMaterial::Copper)
        .unwrap();
    let classifier = MaterialClassifier::new(MaterialParams::default())
        .with_model(Box::new(FixedEngine::scoring(index, 0.9)), b"weights");

    let outcome = classifier.classify(&survey_reading()).unwrap();
    assert_eq!(outcome.source, ClassificationSource::Model);
    assert_eq!(outcome.analysis.material, EmfadMaterial::Copper);
}

#[test]
fn test_rule_cascade_order() {
    let rules = RuleClassifier::new();
    let base = PhysicsAnalysisRecord {
        signal_strength: 800.0,
        depth: 1.0,
        ..Default::default()
    };

    let crystalline = PhysicsAnalysisRecord {
        symmetry_score: 0.9,
        hollowness_score: 0.1,
        conductivity: 5.0e7,
        ..base
    };
    assert_eq!(rules.classify(&crystalline).material_type, MaterialType::CrystallineMetal);

    // Hollowness outranks conductivity
    let cavity = PhysicsAnalysisRecord {
        symmetry_score: 0.6,
        hollowness_score: 0.8,
        conductivity: 5.0e7,
        ..base
    };
    assert_eq!(rules.classify(&cavity).material_type, MaterialType::Cavity);

    let ferrous = PhysicsAnalysisRecord {
        conductivity: 1.0e7,
        magnetic_permeability: 200.0,
        ..base
    };
    assert_eq!(rules.classify(&ferrous).material_type, MaterialType::FerrousMetal);

    let conductive = PhysicsAnalysisRecord {
        conductivity: 500.0,
        magnetic_permeability: 1.0,
        ..base
    };
    assert_eq!(rules.classify(&conductive).material_type, MaterialType::ConductiveNonMetal);

    let insulator = PhysicsAnalysisRecord {
        magnetic_permeability: 1.0,
        ..base
    };
    let result = rules.classify(&insulator);
    assert_eq!(result.material_type, MaterialType::Insulator);
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[test]
fn test_rule_classifier_on_formula_output() {
    let analysis = EmfadClassifier::default()
        .classify_material(&survey_reading())
        .unwrap();
    assert_eq!(analysis.material, EmfadMaterial::Iron);
    let result = RuleClassifier::new().classify(&PhysicsAnalysisRecord::from_analysis(&analysis));

    assert_eq!(result.material_type, MaterialType::FerrousMetal);
    assert!(result.record.size > 0.0);
    assert!(!result.recommendations.is_empty());
}

#[test]
fn test_iron_verdict_never_reads_as_non_metal() {
    let classifier = MaterialClassifier::new(MaterialParams::default());

    for (phase, re, im) in [(0.0, 900.0, 0.0), (30.0, 720.0, 540.0), (10.0, 886.0, 156.0)] {
        let reading = survey_reading().with_phase(phase).with_complex(re, im);
        let outcome = classifier.classify(&reading).unwrap();

        assert_eq!(outcome.analysis.material, EmfadMaterial::Iron);
        assert!(
            matches!(
                outcome.structure.material_type,
                MaterialType::FerrousMetal | MaterialType::CrystallineMetal
            ),
            "phase {}: {:?}",
            phase,
            outcome.structure.material_type
        );
    }
}
