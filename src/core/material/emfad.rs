// src/core/material/emfad.rs
//
// Formula-driven material classification from the EMFAD device
// calibration: temperature-compensated signal, attenuation depth, derived
// electromagnetic properties and signal-ratio material bands.

use std::f64::consts::PI;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::analysis::MaterialAnalysis;
use crate::core::reading::EmfReading;

/// Permeability of free space, H/m
const MU0: f64 = 4.0 * PI * 1e-7;

/// Skin depth floor for the conductivity inversion, metres
const MIN_SKIN_DEPTH: f64 = 1e-3;

/// Span of relative permeability mapped from the phase cosine
const PERMEABILITY_SPAN: f64 = 999.0;

/// EMFAD calibration constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmfadCalibration {
    pub calibration_constant: f64,
    /// Depth attenuation factor in the -ln(signal/1000)/factor law
    pub attenuation_factor: f64,
    /// Fractional gain per degree away from the reference temperature
    pub temperature_coefficient: f64,
    pub reference_temperature: f64,
}

impl Default for EmfadCalibration {
    fn default() -> Self {
        Self {
            calibration_constant: 3333.0,
            attenuation_factor: 0.417,
            temperature_coefficient: 0.002,
            reference_temperature: 25.0,
        }
    }
}

/// Material classes. The first fifteen are the inference model's output
/// classes in output order; the formula path only produces the seven
/// calibrated metals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmfadMaterial {
    Iron,
    Steel,
    Aluminum,
    Copper,
    Bronze,
    Gold,
    Silver,
    Brass,
    Lead,
    Zinc,
    Nickel,
    Titanium,
    Stone,
    Cavity,
    Water,
    Unknown,
}

impl EmfadMaterial {
    /// Model output classes, index-aligned with the output vector
    pub const MODEL_CLASSES: [EmfadMaterial; 15] = [
        Self::Iron,
        Self::Steel,
        Self::Aluminum,
        Self::Copper,
        Self::Bronze,
        Self::Gold,
        Self::Silver,
        Self::Brass,
        Self::Lead,
        Self::Zinc,
        Self::Nickel,
        Self::Titanium,
        Self::Stone,
        Self::Cavity,
        Self::Water,
    ];

    pub fn from_model_index(index: usize) -> Self {
        Self::MODEL_CLASSES.get(index).copied().unwrap_or(Self::Unknown)
    }

    pub fn is_metallic(&self) -> bool {
        !matches!(self, Self::Stone | Self::Cavity | Self::Water | Self::Unknown)
    }

    pub fn is_ferrous(&self) -> bool {
        matches!(self, Self::Iron | Self::Steel | Self::Nickel)
    }

    /// Handbook conductivity in S/m; None for Unknown
    pub fn nominal_conductivity(&self) -> Option<f64> {
        let sigma = match self {
            Self::Iron => 1.0e7,
            Self::Steel => 6.99e6,
            Self::Aluminum => 3.77e7,
            Self::Copper => 5.96e7,
            Self::Bronze => 7.4e6,
            Self::Gold => 4.1e7,
            Self::Silver => 6.3e7,
            Self::Brass => 1.5e7,
            Self::Lead => 4.55e6,
            Self::Zinc => 1.69e7,
            Self::Nickel => 1.43e7,
            Self::Titanium => 2.38e6,
            Self::Stone => 1.0e-3,
            Self::Cavity => 0.0,
            Self::Water => 5.0e-2,
            Self::Unknown => return None,
        };
        Some(sigma)
    }

    /// Handbook relative permeability; None for Unknown
    pub fn nominal_permeability(&self) -> Option<f64> {
        match self {
            Self::Iron => Some(5000.0),
            Self::Steel => Some(100.0),
            Self::Nickel => Some(600.0),
            Self::Unknown => None,
            _ => Some(1.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Iron => "Iron",
            Self::Steel => "Steel",
            Self::Aluminum => "Aluminum",
            Self::Copper => "Copper",
            Self::Bronze => "Bronze",
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Brass => "Brass",
            Self::Lead => "Lead",
            Self::Zinc => "Zinc",
            Self::Nickel => "Nickel",
            Self::Titanium => "Titanium",
            Self::Stone => "Stone",
            Self::Cavity => "Cavity",
            Self::Water => "Water",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EmfadMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Properties derived from one reading through the calibration formulas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsFeatures {
    pub temperature_compensation: f64,
    pub calibrated_signal: f64,
    pub signal_ratio: f64,
    pub emfad_depth: f64,
    pub conductivity: f64,
    pub magnetic_permeability: f64,
    pub skin_depth: f64,
    pub impedance_real: f64,
    pub impedance_imaginary: f64,
    pub phase_shift: f64,
    pub attenuation_db: f64,
    pub reflection_coefficient: f64,
    pub frequency_response: f64,
    pub resonance_frequency: f64,
    pub quality_factor: f64,
    pub bandwidth: f64,
    pub symmetry_score: f64,
    pub hollowness_score: f64,
    pub surface_roughness: f64,
    pub estimated_volume: f64,
}

impl PhysicsFeatures {
    /// Derive all calibrated properties. Returns None for readings the
    /// formulas cannot handle (non-finite fields, non-positive frequency).
    pub fn derive(reading: &EmfReading, calibration: &EmfadCalibration) -> Option<Self> {
        let inputs = [
            reading.signal_strength,
            reading.frequency,
            reading.phase,
            reading.amplitude,
            reading.real_part,
            reading.imaginary_part,
            reading.magnitude,
            reading.depth,
            reading.temperature,
            reading.noise_level,
        ];
        if inputs.iter().any(|v| !v.is_finite()) || reading.frequency <= 0.0 {
            return None;
        }

        let temperature_compensation = 1.0
            + (reading.temperature - calibration.reference_temperature)
                * calibration.temperature_coefficient;
        let calibrated_signal = reading.signal_strength
            * (calibration.calibration_constant / 1000.0)
            * temperature_compensation;
        let signal_ratio = calibrated_signal / reading.frequency;

        let emfad_depth = if calibrated_signal > 0.0 {
            (-(calibrated_signal / 1000.0).ln() / calibration.attenuation_factor).max(0.0)
        } else {
            reading.depth.max(0.0)
        };

        let omega = 2.0 * PI * reading.frequency;
        let cos_phase = reading.phase.to_radians().cos().abs();
        let magnetic_permeability = 1.0 + PERMEABILITY_SPAN * (1.0 - cos_phase);

        // Invert δ = sqrt(2 / (ω μ σ)) with the attenuation depth standing in for δ
        let delta = emfad_depth.max(MIN_SKIN_DEPTH);
        let mu = MU0 * magnetic_permeability;
        let conductivity = 2.0 / (omega * mu * delta * delta);
        let skin_depth = (2.0 / (omega * mu * conductivity)).sqrt();

        let (impedance_real, impedance_imaginary) = if reading.magnitude > 0.0 {
            (
                reading.real_part / reading.magnitude,
                reading.imaginary_part / reading.magnitude,
            )
        } else {
            (0.0, 0.0)
        };

        let phase_shift = if reading.real_part == 0.0 && reading.imaginary_part == 0.0 {
            reading.phase
        } else {
            reading.imaginary_part.atan2(reading.real_part).to_degrees()
        };

        let attenuation_db = if calibrated_signal > 0.0 {
            20.0 * (1000.0 / calibrated_signal).log10()
        } else {
            0.0
        };
        let reflection_coefficient = (magnetic_permeability - 1.0) / (magnetic_permeability + 1.0);
        let frequency_response = if reading.amplitude != 0.0 {
            reading.magnitude / reading.amplitude
        } else {
            0.0
        };
        let resonance_frequency = reading.frequency / magnetic_permeability.sqrt();
        let quality_factor = if impedance_real != 0.0 {
            (impedance_imaginary / impedance_real).abs()
        } else {
            0.0
        };
        let bandwidth = if quality_factor > 0.0 {
            resonance_frequency / quality_factor
        } else {
            0.0
        };

        let re = reading.real_part.abs();
        let im = reading.imaginary_part.abs();
        let symmetry_score = if re + im > 0.0 {
            1.0 - (re - im).abs() / (re + im)
        } else {
            0.0
        };
        let hollowness_score = (1.0 - calibrated_signal / 1000.0).clamp(0.0, 1.0);
        let surface_roughness = (reading.noise_level / (reading.signal_strength.abs() + 1.0)).clamp(0.0, 1.0);
        let estimated_volume = 4.0 / 3.0 * PI * (skin_depth / 2.0).powi(3);

        Some(Self {
            temperature_compensation,
            calibrated_signal,
            signal_ratio,
            emfad_depth,
            conductivity,
            magnetic_permeability,
            skin_depth,
            impedance_real,
            impedance_imaginary,
            phase_shift,
            attenuation_db,
            reflection_coefficient,
            frequency_response,
            resonance_frequency,
            quality_factor,
            bandwidth,
            symmetry_score,
            hollowness_score,
            surface_roughness,
            estimated_volume,
        })
    }

    fn calibration_deviation_exceeds(&self, limit: f64) -> bool {
        (self.temperature_compensation - 1.0).abs() > limit
    }
}

/// Calibrated-formula material classifier
#[derive(Debug, Clone, Default)]
pub struct EmfadClassifier {
    calibration: EmfadCalibration,
}

impl EmfadClassifier {
    pub fn new(calibration: EmfadCalibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &EmfadCalibration {
        &self.calibration
    }

    pub fn derive(&self, reading: &EmfReading) -> Option<PhysicsFeatures> {
        PhysicsFeatures::derive(reading, &self.calibration)
    }

    /// Classify one reading; None when the formulas cannot be applied
    pub fn classify_material(&self, reading: &EmfReading) -> Option<MaterialAnalysis> {
        let Some(features) = self.derive(reading) else {
            debug!("EMFAD path skipped reading: non-finite input or non-positive frequency");
            return None;
        };

        let material = refine_by_phase(
            material_from_ratio(features.signal_ratio, features.emfad_depth),
            reading.phase,
        );

        let quality = reading.quality_score.clamp(0.0, 1.0);
        let confidence = match material {
            EmfadMaterial::Unknown => 0.25 * quality,
            _ => 0.6 + 0.25 * quality + 0.15 * (1.0 - features.surface_roughness),
        }
        .clamp(0.0, 1.0);

        let mut analysis = build_analysis(reading, &features, material, confidence);
        analysis.recommendations = physics_recommendations(material, &features, confidence);

        debug!(
            "EMFAD: ratio {:.4}, depth {:.2} m → {} ({:.0}%)",
            features.signal_ratio,
            features.emfad_depth,
            material,
            confidence * 100.0
        );

        Some(analysis)
    }
}

/// Signal-ratio bands, strongest first
fn material_from_ratio(ratio: f64, depth: f64) -> EmfadMaterial {
    match ratio {
        r if r >= 0.25 => EmfadMaterial::Steel,
        r if r >= 0.12 => EmfadMaterial::Iron,
        r if r >= 0.08 => EmfadMaterial::Aluminum,
        r if r >= 0.05 => EmfadMaterial::Copper,
        r if r >= 0.035 => EmfadMaterial::Bronze,
        r if r >= 0.02 => EmfadMaterial::Silver,
        r if r >= 0.01 && depth < 3.0 => EmfadMaterial::Gold,
        _ => EmfadMaterial::Unknown,
    }
}

/// Phase lag separates hardened ferrous from plain iron and alloyed from
/// pure copper
fn refine_by_phase(material: EmfadMaterial, phase: f64) -> EmfadMaterial {
    match material {
        EmfadMaterial::Iron if phase > 45.0 => EmfadMaterial::Steel,
        EmfadMaterial::Copper if phase < 20.0 => EmfadMaterial::Bronze,
        other => other,
    }
}

/// Assemble a MaterialAnalysis from derived features
pub(crate) fn build_analysis(
    reading: &EmfReading,
    features: &PhysicsFeatures,
    material: EmfadMaterial,
    confidence: f64,
) -> MaterialAnalysis {
    let crystalline_structure = features.symmetry_score >= 0.85 && features.hollowness_score < 0.3;
    let cavity_detected = features.hollowness_score > 0.7;

    MaterialAnalysis {
        session_id: reading.session_id,
        timestamp: reading.timestamp,
        material,
        confidence,
        calibrated_signal: features.calibrated_signal,
        signal_ratio: features.signal_ratio,
        emfad_depth: features.emfad_depth,
        temperature_compensation: features.temperature_compensation,
        calibration_deviation: (features.temperature_compensation - 1.0).abs(),
        conductivity: features.conductivity,
        magnetic_permeability: features.magnetic_permeability,
        skin_depth: features.skin_depth,
        impedance_real: features.impedance_real,
        impedance_imaginary: features.impedance_imaginary,
        phase_shift: features.phase_shift,
        attenuation_db: features.attenuation_db,
        reflection_coefficient: features.reflection_coefficient,
        frequency_response: features.frequency_response,
        resonance_frequency: features.resonance_frequency,
        quality_factor: features.quality_factor,
        bandwidth: features.bandwidth,
        symmetry_score: features.symmetry_score,
        hollowness_score: features.hollowness_score,
        surface_roughness: features.surface_roughness,
        estimated_volume: features.estimated_volume,
        crystalline_structure,
        crystal_symmetry: if crystalline_structure { features.symmetry_score } else { 0.0 },
        cavity_detected,
        cavity_volume: if cavity_detected { features.estimated_volume } else { 0.0 },
        cavity_depth: if cavity_detected { features.emfad_depth } else { 0.0 },
        layer_count: 1,
        inclusion_count: 0,
        particle_density: features.surface_roughness,
        analysis_quality: reading.quality_score.clamp(0.0, 1.0) * (1.0 - features.surface_roughness),
        noise_level: reading.noise_level,
        recommendations: Vec::new(),
        validated: false,
    }
}

fn physics_recommendations(
    material: EmfadMaterial,
    features: &PhysicsFeatures,
    confidence: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match material {
        EmfadMaterial::Unknown => recommendations.push(format!(
            "Signal ratio {:.4} matches no calibrated band; rescan at a second frequency",
            features.signal_ratio
        )),
        m if m.is_ferrous() => recommendations.push(format!(
            "Ferrous target ({}) at ~{:.2} m; expect strong phase lag on follow-up passes",
            m, features.emfad_depth
        )),
        m => recommendations.push(format!(
            "Non-ferrous target ({}) at ~{:.2} m; confirm with a perpendicular pass",
            m, features.emfad_depth
        )),
    }

    if features.calibration_deviation_exceeds(0.02) {
        recommendations.push(format!(
            "Temperature compensation {:.3}: recalibrate near 25 °C for best accuracy",
            features.temperature_compensation
        ));
    }
    if confidence < 0.5 {
        recommendations.push("Low confidence: repeat the measurement with a slower sweep".to_string());
    }

    recommendations
}
