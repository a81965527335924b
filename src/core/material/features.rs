// src/core/material/features.rs
//
// Fixed-length feature vector fed to the inference model.

use super::emfad::PhysicsFeatures;
use crate::core::reading::EmfReading;

pub const FEATURE_COUNT: usize = 32;

/// Normalized model input. Layout is fixed; the model was trained on this
/// exact ordering:
///
/// | Index  | Features                                                   |
/// |--------|------------------------------------------------------------|
/// | 0-7    | frequency, calibrated signal, phase, amplitude, re, im, magnitude, EMFAD depth |
/// | 8-19   | σ, μr, skin depth, impedance re/im, phase shift, attenuation, reflection, frequency response, resonance, Q, bandwidth |
/// | 20-23  | symmetry, hollowness, roughness, volume                    |
/// | 24-27  | temperature, humidity, pressure, noise                     |
/// | 28-30  | normalized signal, signal ratio, reading depth             |
/// | 31     | quality score                                              |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn build(reading: &EmfReading, physics: &PhysicsFeatures) -> Self {
        let log_scale = |v: f64, decades: f64| ((v.abs() + 1.0).log10() / decades).clamp(0.0, 1.0);
        let unit = |v: f64| v.clamp(0.0, 1.0);
        let signed = |v: f64| v.clamp(-1.0, 1.0);

        let raw: [f64; FEATURE_COUNT] = [
            // Measurement
            reading.frequency / 100_000.0,
            physics.calibrated_signal / 3333.0,
            reading.phase / 360.0,
            reading.amplitude / 1000.0,
            reading.real_part / 1000.0,
            reading.imaginary_part / 1000.0,
            reading.magnitude / 1000.0,
            physics.emfad_depth / 10.0,
            // Electromagnetic
            log_scale(physics.conductivity, 8.0),
            log_scale(physics.magnetic_permeability, 4.0),
            unit(physics.skin_depth),
            signed(physics.impedance_real),
            signed(physics.impedance_imaginary),
            physics.phase_shift / 180.0,
            physics.attenuation_db / 100.0,
            signed(physics.reflection_coefficient),
            unit(physics.frequency_response),
            physics.resonance_frequency / 100_000.0,
            log_scale(physics.quality_factor, 3.0),
            physics.bandwidth / 100_000.0,
            // Structure
            unit(physics.symmetry_score),
            unit(physics.hollowness_score),
            unit(physics.surface_roughness),
            log_scale(physics.estimated_volume, 3.0),
            // Environment
            reading.temperature / 50.0,
            reading.humidity / 100.0,
            reading.pressure / 1100.0,
            reading.noise_level / 100.0,
            // Normalized
            unit(reading.signal_strength / 1000.0),
            unit(physics.signal_ratio),
            unit(reading.depth / 10.0),
            unit(reading.quality_score),
        ];

        let mut features = [0.0f32; FEATURE_COUNT];
        for (slot, value) in features.iter_mut().zip(raw) {
            *slot = if value.is_finite() { value as f32 } else { 0.0 };
        }
        Self(features)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::material::emfad::EmfadCalibration;

    #[test]
    fn test_layout() {
        let mut reading = EmfReading::at(0.0, 0.0, 0.0, 500.0)
            .with_frequency(50_000.0)
            .with_phase(90.0)
            .with_complex(300.0, 400.0)
            .with_depth(2.0);
        reading.amplitude = 250.0;
        reading.temperature = 25.0;
        reading.humidity = 40.0;
        reading.pressure = 1012.0;
        reading.noise_level = 5.0;
        reading.quality_score = 0.8;

        let physics = PhysicsFeatures::derive(&reading, &EmfadCalibration::default()).unwrap();
        let v = FeatureVector::build(&reading, &physics);
        let at = |i: usize| v.0[i] as f64;
        let close = |i: usize, expected: f64| {
            assert!((at(i) - expected).abs() < 1e-5, "index {}: {} vs {}", i, at(i), expected)
        };

        close(0, 0.5);
        close(1, physics.calibrated_signal / 3333.0);
        close(2, 0.25);
        close(3, 0.25);
        close(4, 0.3);
        close(5, 0.4);
        close(6, 0.5);
        close(7, physics.emfad_depth / 10.0);
        close(8, ((physics.conductivity + 1.0).log10() / 8.0).clamp(0.0, 1.0));
        close(9, ((physics.magnetic_permeability + 1.0).log10() / 4.0).clamp(0.0, 1.0));
        close(10, physics.skin_depth.clamp(0.0, 1.0));
        close(11, 0.6);
        close(12, 0.8);
        close(13, physics.phase_shift / 180.0);
        close(14, physics.attenuation_db / 100.0);
        close(15, physics.reflection_coefficient);
        close(16, 1.0);
        close(17, physics.resonance_frequency / 100_000.0);
        close(18, ((physics.quality_factor + 1.0).log10() / 3.0).clamp(0.0, 1.0));
        close(19, physics.bandwidth / 100_000.0);
        close(20, physics.symmetry_score);
        close(21, physics.hollowness_score);
        close(22, physics.surface_roughness);
        close(23, ((physics.estimated_volume + 1.0).log10() / 3.0).clamp(0.0, 1.0));
        close(24, 0.5);
        close(25, 0.4);
        close(26, 1012.0 / 1100.0);
        close(27, 0.05);
        close(28, 0.5);
        close(29, physics.signal_ratio.clamp(0.0, 1.0));
        close(30, 0.2);
        close(31, 0.8);
    }

    #[test]
    fn test_non_finite_physics_zeroed() {
        let reading = EmfReading::at(0.0, 0.0, 0.0, 500.0).with_frequency(50_000.0);
        let physics = PhysicsFeatures {
            bandwidth: f64::INFINITY,
            ..PhysicsFeatures::derive(&reading, &EmfadCalibration::default()).unwrap()
        };
        let v = FeatureVector::build(&reading, &physics);
        assert_eq!(v.0[19], 0.0);
        assert!(v.0.iter().all(|f| f.is_finite()));
    }
}
