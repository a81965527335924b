// src/core/material/analysis.rs
//
// Per-reading (or per-session) material verdict with the derived physical
// and structural properties.

use serde::{Deserialize, Serialize};

use super::emfad::EmfadMaterial;

/// Material verdict plus derived properties.
///
/// Written once by a classifier; `validated` is the only field a reviewer
/// is expected to change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialAnalysis {
    pub session_id: u64,
    pub timestamp: i64,
    pub material: EmfadMaterial,
    pub confidence: f64,

    // Calibration
    pub calibrated_signal: f64,
    pub signal_ratio: f64,
    pub emfad_depth: f64,
    pub temperature_compensation: f64,
    pub calibration_deviation: f64,

    // Electromagnetic properties
    /// S/m
    pub conductivity: f64,
    /// Relative permeability
    pub magnetic_permeability: f64,
    /// Metres
    pub skin_depth: f64,
    pub impedance_real: f64,
    pub impedance_imaginary: f64,
    /// Degrees
    pub phase_shift: f64,
    pub attenuation_db: f64,
    pub reflection_coefficient: f64,
    pub frequency_response: f64,
    pub resonance_frequency: f64,
    pub quality_factor: f64,
    pub bandwidth: f64,

    // Structure
    pub symmetry_score: f64,
    pub hollowness_score: f64,
    pub surface_roughness: f64,
    pub estimated_volume: f64,
    pub crystalline_structure: bool,
    pub crystal_symmetry: f64,
    pub cavity_detected: bool,
    pub cavity_volume: f64,
    pub cavity_depth: f64,
    pub layer_count: u32,
    pub inclusion_count: u32,
    pub particle_density: f64,

    // Quality
    pub analysis_quality: f64,
    pub noise_level: f64,

    pub recommendations: Vec<String>,
    pub validated: bool,
}

impl MaterialAnalysis {
    pub fn is_metallic(&self) -> bool {
        self.material.is_metallic()
    }

    /// Copy with the survey-level inclusion count filled in
    pub fn with_inclusion_count(self, inclusion_count: u32) -> Self {
        Self {
            inclusion_count,
            ..self
        }
    }

    /// Copy marked as reviewed
    pub fn mark_validated(self) -> Self {
        Self {
            validated: true,
            ..self
        }
    }
}
