// src/testgen/mod.rs
//
// Synthetic survey generation for tests and the CLI demo mode.
// Produces reading grids with buried targets, clustered blobs and scalar
// series (sine, ramp, spikes, square wave) with deterministic noise.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

use crate::core::reading::EmfReading;

/// Timestamp of the first generated reading (2024-01-01T00:00:00Z)
const BASE_TIMESTAMP_MS: i64 = 1_704_067_200_000;

/// Milliseconds between generated readings
const SAMPLE_INTERVAL_MS: i64 = 100;

/// Deterministic noise (splitmix64)
#[derive(Debug, Clone)]
pub struct NoiseSource {
    state: u64,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1)
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [-1, 1)
    pub fn next_signed(&mut self) -> f64 {
        self.next_unit() * 2.0 - 1.0
    }
}

/// Sub-surface object imprinted on a generated survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuriedTarget {
    /// Surface position (x, y) the anomaly is centred on
    pub position: [f64; 2],
    /// Metres
    pub depth: f64,
    /// Gaussian footprint radius, metres
    pub radius: f64,
    /// Peak signal added at the centre
    pub strength: f64,
    /// Peak phase added at the centre, degrees
    pub phase_shift: f64,
}

impl BuriedTarget {
    pub fn new(x: f64, y: f64, depth: f64) -> Self {
        Self {
            position: [x, y],
            depth,
            radius: 0.75,
            strength: 600.0,
            phase_shift: 40.0,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_phase_shift(mut self, phase_shift: f64) -> Self {
        self.phase_shift = phase_shift;
        self
    }

    /// Footprint weight at a surface point, 1 at the centre
    fn falloff(&self, x: f64, y: f64) -> f64 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        let d = (x - self.position[0]).hypot(y - self.position[1]);
        (-(d / self.radius).powi(2)).exp()
    }
}

/// Survey generator settings
#[derive(Debug, Clone)]
pub struct SurveyGenerator {
    pub frequency: f64,
    pub background_signal: f64,
    pub background_phase: f64,
    /// Peak noise amplitude added to the signal
    pub noise: f64,
    /// Grid spacing, metres
    pub spacing: f64,
    pub session_id: u64,
    pub seed: u64,
}

impl Default for SurveyGenerator {
    fn default() -> Self {
        Self {
            frequency: 19_000.0,
            background_signal: 200.0,
            background_phase: 10.0,
            noise: 2.0,
            spacing: 0.5,
            session_id: 1,
            seed: 42,
        }
    }
}

impl SurveyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_background(mut self, signal: f64) -> Self {
        self.background_signal = signal;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn reading(&self, index: usize, position: [f64; 3], signal: f64, phase: f64, depth: f64) -> EmfReading {
        let phase_rad = phase.to_radians();
        let mut reading = EmfReading::at(position[0], position[1], position[2], signal)
            .with_frequency(self.frequency)
            .with_phase(phase)
            .with_depth(depth)
            .with_complex(signal * phase_rad.cos(), signal * phase_rad.sin());
        reading.noise_level = self.noise;
        reading.session_id = self.session_id;
        reading.timestamp = BASE_TIMESTAMP_MS + index as i64 * SAMPLE_INTERVAL_MS;
        reading
    }

    /// Serpentine `nx` × `ny` surface grid with targets imprinted
    pub fn grid(&self, nx: usize, ny: usize, targets: &[BuriedTarget]) -> Vec<EmfReading> {
        let mut noise = NoiseSource::new(self.seed);
        let mut readings = Vec::with_capacity(nx * ny);

        for j in 0..ny {
            for step in 0..nx {
                // Walk back and forth like an operator would
                let i = if j % 2 == 0 { step } else { nx - 1 - step };
                let (x, y) = (i as f64 * self.spacing, j as f64 * self.spacing);

                let mut signal = self.background_signal + self.noise * noise.next_signed();
                let mut phase = self.background_phase;
                let mut depth = 0.0f64;
                for target in targets {
                    let w = target.falloff(x, y);
                    signal += target.strength * w;
                    phase += target.phase_shift * w;
                    if w > 0.1 {
                        depth = depth.max(target.depth);
                    }
                }

                readings.push(self.reading(readings.len(), [x, y, 0.0], signal, phase, depth));
            }
        }

        readings
    }

    /// `count` readings scattered around `center` within `spread` metres
    pub fn blob(&self, center: [f64; 3], count: usize, spread: f64, signal: f64) -> Vec<EmfReading> {
        let mut noise = NoiseSource::new(self.seed);
        (0..count)
            .map(|i| {
                let position = [
                    center[0] + spread * noise.next_signed(),
                    center[1] + spread * noise.next_signed(),
                    center[2],
                ];
                let s = signal + self.noise * noise.next_signed();
                self.reading(i, position, s, self.background_phase, 0.0)
            })
            .collect()
    }

    /// Straight transect along x with targets imprinted
    pub fn transect(&self, n: usize, targets: &[BuriedTarget]) -> Vec<EmfReading> {
        self.grid(n, 1, targets)
    }
}

pub fn sine_series(n: usize, period: f64, amplitude: f64, offset: f64) -> Vec<f64> {
    (0..n)
        .map(|i| offset + amplitude * (2.0 * PI * i as f64 / period).sin())
        .collect()
}

pub fn ramp_series(n: usize, slope: f64, intercept: f64) -> Vec<f64> {
    (0..n).map(|i| intercept + slope * i as f64).collect()
}

/// Flat baseline with single-sample spikes at the given (index, height)
pub fn spike_series(n: usize, baseline: f64, spikes: &[(usize, f64)]) -> Vec<f64> {
    let mut series = vec![baseline; n];
    for &(index, height) in spikes {
        if let Some(v) = series.get_mut(index) {
            *v = baseline + height;
        }
    }
    series
}

/// ±amplitude square wave, high for the first half of each period
pub fn square_series(n: usize, period: usize, amplitude: f64) -> Vec<f64> {
    let period = period.max(2);
    (0..n)
        .map(|i| if i % period < period / 2 { amplitude } else { -amplitude })
        .collect()
}

/// Add uniform noise of peak `amplitude`
pub fn with_noise(series: &[f64], amplitude: f64, seed: u64) -> Vec<f64> {
    let mut noise = NoiseSource::new(seed);
    series.iter().map(|v| v + amplitude * noise.next_signed()).collect()
}

/// A generated survey with its ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticSurvey {
    pub name: String,
    pub description: String,
    pub targets: Vec<BuriedTarget>,
    pub readings: Vec<EmfReading>,
}

impl SyntheticSurvey {
    /// Save as a survey file the CLI can read back
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Surveys used by `--demo`: a low-frequency material sweep over two
/// metallic targets and a high-frequency grid for inclusion sizing
pub fn demo_surveys() -> Vec<SyntheticSurvey> {
    let targets = vec![
        BuriedTarget::new(2.0, 2.0, 0.8).with_strength(700.0),
        BuriedTarget::new(6.5, 3.5, 1.5)
            .with_strength(450.0)
            .with_phase_shift(60.0),
    ];

    let sweep = SurveyGenerator::new().with_background(150.0);
    let radar = SurveyGenerator::new()
        .with_frequency(1.0e8)
        .with_background(150.0)
        .with_seed(7);

    vec![
        SyntheticSurvey {
            name: "material-sweep".to_string(),
            description: "19 kHz grid over two metallic targets".to_string(),
            readings: sweep.grid(18, 12, &targets),
            targets: targets.clone(),
        },
        SyntheticSurvey {
            name: "inclusion-grid".to_string(),
            description: "100 MHz grid over the same targets".to_string(),
            readings: radar.grid(18, 12, &targets),
            targets,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let mut a = NoiseSource::new(1);
        let mut b = NoiseSource::new(1);
        for _ in 0..1000 {
            let v = a.next_signed();
            assert_eq!(v, b.next_signed());
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_grid_imprints_target() {
        let target = BuriedTarget::new(1.0, 1.0, 1.2);
        let readings = SurveyGenerator::new().grid(5, 5, &[target]);
        assert_eq!(readings.len(), 25);

        let peak = readings
            .iter()
            .max_by(|a, b| a.signal_strength.partial_cmp(&b.signal_strength).unwrap())
            .unwrap();
        assert_eq!(peak.position(), [1.0, 1.0, 0.0]);
        assert_eq!(peak.depth, 1.2);
        assert!(readings.iter().all(|r| r.is_valid()));
    }

    #[test]
    fn test_grid_timestamps_increase() {
        let readings = SurveyGenerator::new().grid(4, 3, &[]);
        assert!(readings.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
    }

    #[test]
    fn test_series_shapes() {
        assert_eq!(ramp_series(3, 2.0, 1.0), vec![1.0, 3.0, 5.0]);
        assert_eq!(spike_series(4, 0.0, &[(2, 5.0), (9, 1.0)]), vec![0.0, 0.0, 5.0, 0.0]);
        assert_eq!(square_series(4, 2, 1.0), vec![1.0, -1.0, 1.0, -1.0]);
        assert!(sine_series(8, 4.0, 1.0, 0.0)[1] > 0.99);
    }

    #[test]
    fn test_demo_surveys() {
        let surveys = demo_surveys();
        assert_eq!(surveys.len(), 2);
        assert!(surveys.iter().all(|s| s.readings.len() == 18 * 12));
    }
}
