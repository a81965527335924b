// src/core/material/rules.rs
//
// Rule-based structural classification from a physics analysis record:
// crystalline → cavity/void → metal vs conductive non-metal → particle
// composite → insulator.

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use super::analysis::MaterialAnalysis;

/// Conductivity at or above which a target is treated as metallic, S/m
pub const METAL_CONDUCTIVITY: f64 = 1.0e6;

/// Conductivity floor for a conductive non-metal, S/m
pub const CONDUCTIVE_FLOOR: f64 = 1.0e2;

/// Relative permeability above which a metal is ferrous
pub const FERROUS_PERMEABILITY: f64 = 10.0;

/// Diameter below which a target gets a resolution hint, metres
const SMALL_TARGET: f64 = 0.05;

const SIGNAL_WEIGHT: f64 = 0.3;
const CONSISTENCY_WEIGHT: f64 = 0.3;
const TYPE_WEIGHT: f64 = 0.2;
const DEPTH_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialType {
    FerrousMetal,
    NonFerrousMetal,
    CrystallineMetal,
    CrystallineNonMetal,
    Cavity,
    Void,
    ConductiveNonMetal,
    ParticleComposite,
    Insulator,
    Unknown,
}

impl MaterialType {
    pub fn is_metallic(&self) -> bool {
        matches!(self, Self::FerrousMetal | Self::NonFerrousMetal | Self::CrystallineMetal)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FerrousMetal => "Ferrous metal",
            Self::NonFerrousMetal => "Non-ferrous metal",
            Self::CrystallineMetal => "Crystalline metal",
            Self::CrystallineNonMetal => "Crystalline non-metal",
            Self::Cavity => "Cavity",
            Self::Void => "Void",
            Self::ConductiveNonMetal => "Conductive non-metal",
            Self::ParticleComposite => "Particle composite",
            Self::Insulator => "Insulator",
            Self::Unknown => "Unknown",
        }
    }

    /// Prior reliability of each class, used as the type bonus in confidence
    fn reliability(&self) -> f64 {
        match self {
            Self::FerrousMetal => 1.0,
            Self::NonFerrousMetal => 0.9,
            Self::CrystallineMetal | Self::Cavity => 0.8,
            Self::CrystallineNonMetal | Self::Void => 0.7,
            Self::ConductiveNonMetal | Self::ParticleComposite => 0.6,
            Self::Insulator => 0.5,
            Self::Unknown => 0.0,
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Physical measurements the rule cascade reads
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsAnalysisRecord {
    pub signal_strength: f64,
    pub depth: f64,
    pub conductivity: f64,
    pub magnetic_permeability: f64,
    pub symmetry_score: f64,
    pub hollowness_score: f64,
    /// Equivalent spherical diameter of the target, metres
    pub size: f64,
    pub particle_density: f64,
}

impl PhysicsAnalysisRecord {
    /// Build the record from a material verdict. A known material brings its
    /// handbook conductivity and permeability; the calibrated inversion is
    /// only used for Unknown.
    pub fn from_analysis(analysis: &MaterialAnalysis) -> Self {
        let material = analysis.material;
        Self {
            signal_strength: analysis.calibrated_signal,
            depth: analysis.emfad_depth,
            conductivity: material.nominal_conductivity().unwrap_or(analysis.conductivity),
            magnetic_permeability: material
                .nominal_permeability()
                .unwrap_or(analysis.magnetic_permeability),
            symmetry_score: analysis.symmetry_score,
            hollowness_score: analysis.hollowness_score,
            size: (6.0 * analysis.estimated_volume.max(0.0) / PI).cbrt(),
            particle_density: analysis.particle_density,
        }
    }

    /// Sphere volume implied by `size`, cubic metres
    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * (self.size / 2.0).powi(3)
    }

    fn is_finite(&self) -> bool {
        [
            self.signal_strength,
            self.depth,
            self.conductivity,
            self.magnetic_permeability,
            self.symmetry_score,
            self.hollowness_score,
            self.size,
            self.particle_density,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Measurements mapped to [0, 1] for the consistency term
    fn normalized(&self) -> [f64; 4] {
        [
            self.symmetry_score.clamp(0.0, 1.0),
            self.hollowness_score.clamp(0.0, 1.0),
            ((self.conductivity.max(0.0) + 1.0).log10() / 8.0).clamp(0.0, 1.0),
            (self.magnetic_permeability.max(1.0).log10() / 4.0).clamp(0.0, 1.0),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialClassificationResult {
    pub material_type: MaterialType,
    pub confidence: f64,
    pub record: PhysicsAnalysisRecord,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, record: &PhysicsAnalysisRecord) -> MaterialClassificationResult {
        let material_type = classify_type(record);
        let confidence = match material_type {
            MaterialType::Unknown => 0.0,
            t => rule_confidence(record, t),
        };

        debug!("Rule cascade: {} ({:.0}%)", material_type, confidence * 100.0);

        MaterialClassificationResult {
            material_type,
            confidence,
            record: *record,
            recommendations: recommendations(material_type, confidence, record),
        }
    }
}

fn classify_type(record: &PhysicsAnalysisRecord) -> MaterialType {
    if !record.is_finite() || record.signal_strength <= 0.0 {
        return MaterialType::Unknown;
    }

    let metallic = record.conductivity >= METAL_CONDUCTIVITY;

    if record.symmetry_score >= 0.85 && record.hollowness_score < 0.3 {
        return if metallic {
            MaterialType::CrystallineMetal
        } else {
            MaterialType::CrystallineNonMetal
        };
    }

    if record.hollowness_score > 0.7 {
        return if record.symmetry_score >= 0.5 {
            MaterialType::Cavity
        } else {
            MaterialType::Void
        };
    }

    if metallic {
        return if record.magnetic_permeability > FERROUS_PERMEABILITY {
            MaterialType::FerrousMetal
        } else {
            MaterialType::NonFerrousMetal
        };
    }

    if record.conductivity >= CONDUCTIVE_FLOOR {
        return MaterialType::ConductiveNonMetal;
    }

    if record.particle_density > 0.5 {
        return MaterialType::ParticleComposite;
    }

    MaterialType::Insulator
}

/// Weighted average of the contributing factors, clamped to [0, 1]
fn rule_confidence(record: &PhysicsAnalysisRecord, material_type: MaterialType) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    if record.signal_strength > 0.0 {
        weighted += SIGNAL_WEIGHT * (record.signal_strength / 1000.0).clamp(0.0, 1.0);
        total_weight += SIGNAL_WEIGHT;
    }

    let measurements = record.normalized();
    let consistency = 1.0 / (1.0 + crate::core::stats::std_dev(&measurements));
    weighted += CONSISTENCY_WEIGHT * consistency;
    total_weight += CONSISTENCY_WEIGHT;

    weighted += TYPE_WEIGHT * material_type.reliability();
    total_weight += TYPE_WEIGHT;

    if record.depth > 0.0 {
        weighted += DEPTH_WEIGHT * (1.0 / (1.0 + record.depth / 5.0));
        total_weight += DEPTH_WEIGHT;
    }

    if total_weight == 0.0 {
        0.0
    } else {
        (weighted / total_weight).clamp(0.0, 1.0)
    }
}

fn recommendations(
    material_type: MaterialType,
    confidence: f64,
    record: &PhysicsAnalysisRecord,
) -> Vec<String> {
    let mut out = Vec::new();

    match material_type {
        MaterialType::FerrousMetal => {
            out.push("Ferrous metal: magnetometer follow-up recommended".to_string())
        }
        MaterialType::NonFerrousMetal => {
            out.push("Non-ferrous metal: verify with a multi-frequency sweep".to_string())
        }
        MaterialType::CrystallineMetal | MaterialType::CrystallineNonMetal => {
            out.push("Regular structure detected: scan at finer grid spacing".to_string())
        }
        MaterialType::Cavity | MaterialType::Void => out.push(format!(
            "Low-response region at ~{:.2} m: confirm with ground-penetrating radar",
            record.depth
        )),
        MaterialType::ConductiveNonMetal => {
            out.push("Conductive non-metal: check for moisture or mineralization".to_string())
        }
        MaterialType::ParticleComposite => {
            out.push("Scattered response: likely mixed fill or debris".to_string())
        }
        MaterialType::Insulator => {
            out.push("Insulating material: EM contrast is weak here".to_string())
        }
        MaterialType::Unknown => {
            out.push("Insufficient or invalid measurements; repeat the scan".to_string());
            return out;
        }
    }

    if record.size > 0.0 && record.size < SMALL_TARGET {
        out.push(format!(
            "Small target (~{:.3} m, {:.2e} m³): tighten line spacing to resolve it",
            record.size,
            record.volume()
        ));
    }

    if confidence >= 0.8 {
        out.push("High confidence classification".to_string());
    } else if confidence >= 0.5 {
        out.push("Moderate confidence: repeat the pass to confirm".to_string());
    } else {
        out.push("Low confidence: recalibrate and re-survey".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PhysicsAnalysisRecord {
        PhysicsAnalysisRecord {
            signal_strength: 800.0,
            depth: 1.0,
            conductivity: 5.0e7,
            magnetic_permeability: 200.0,
            symmetry_score: 0.4,
            hollowness_score: 0.1,
            size: 0.5,
            particle_density: 0.1,
        }
    }

    #[test]
    fn test_ferrous_and_non_ferrous() {
        let classifier = RuleClassifier::new();
        assert_eq!(classifier.classify(&record()).material_type, MaterialType::FerrousMetal);

        let copper = PhysicsAnalysisRecord {
            magnetic_permeability: 1.0,
            ..record()
        };
        assert_eq!(classifier.classify(&copper).material_type, MaterialType::NonFerrousMetal);
    }

    #[test]
    fn test_crystalline_checked_first() {
        let r = PhysicsAnalysisRecord {
            symmetry_score: 0.9,
            ..record()
        };
        assert_eq!(RuleClassifier::new().classify(&r).material_type, MaterialType::CrystallineMetal);

        let quartz = PhysicsAnalysisRecord {
            conductivity: 1e-3,
            ..r
        };
        assert_eq!(
            RuleClassifier::new().classify(&quartz).material_type,
            MaterialType::CrystallineNonMetal
        );
    }

    #[test]
    fn test_cavity_and_void() {
        let hollow = PhysicsAnalysisRecord {
            hollowness_score: 0.9,
            symmetry_score: 0.6,
            ..record()
        };
        assert_eq!(RuleClassifier::new().classify(&hollow).material_type, MaterialType::Cavity);

        let irregular = PhysicsAnalysisRecord {
            symmetry_score: 0.2,
            ..hollow
        };
        assert_eq!(RuleClassifier::new().classify(&irregular).material_type, MaterialType::Void);
    }

    #[test]
    fn test_non_metal_fallbacks() {
        let classifier = RuleClassifier::new();
        let conductive = PhysicsAnalysisRecord {
            conductivity: 1.0e3,
            ..record()
        };
        assert_eq!(classifier.classify(&conductive).material_type, MaterialType::ConductiveNonMetal);

        let particles = PhysicsAnalysisRecord {
            conductivity: 1.0,
            particle_density: 0.8,
            ..record()
        };
        assert_eq!(classifier.classify(&particles).material_type, MaterialType::ParticleComposite);

        let insulator = PhysicsAnalysisRecord {
            conductivity: 1.0,
            ..record()
        };
        assert_eq!(classifier.classify(&insulator).material_type, MaterialType::Insulator);
    }

    #[test]
    fn test_unknown_for_invalid_record() {
        let classifier = RuleClassifier::new();
        let dead = PhysicsAnalysisRecord {
            signal_strength: 0.0,
            ..record()
        };
        let result = classifier.classify(&dead);
        assert_eq!(result.material_type, MaterialType::Unknown);
        assert_eq!(result.confidence, 0.0);

        let nan = PhysicsAnalysisRecord {
            conductivity: f64::NAN,
            ..record()
        };
        assert_eq!(classifier.classify(&nan).material_type, MaterialType::Unknown);
    }

    #[test]
    fn test_small_target_hint() {
        let coin = PhysicsAnalysisRecord {
            size: 0.02,
            ..record()
        };
        assert!((coin.volume() - 4.0 / 3.0 * PI * 0.01f64.powi(3)).abs() < 1e-12);

        let result = RuleClassifier::new().classify(&coin);
        assert!(result.recommendations.iter().any(|r| r.starts_with("Small target")));
        assert!(!RuleClassifier::new()
            .classify(&record())
            .recommendations
            .iter()
            .any(|r| r.starts_with("Small target")));
    }

    #[test]
    fn test_confidence_bounded_with_recommendations() {
        let result = RuleClassifier::new().classify(&record());
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        assert!(result.recommendations.len() >= 2);
    }
}
