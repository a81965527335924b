// src/core/reading.rs
//
// EMF survey sample as delivered by the acquisition pipeline, plus the
// scalar channel projections consumed by the pattern recognizer.

use serde::{Deserialize, Serialize};

/// Tolerance for the |real + j·imag| vs magnitude consistency check
const MAGNITUDE_TOLERANCE: f64 = 0.05;

/// One EMF sample.
///
/// Readings are validated upstream and treated as immutable by every
/// analyzer in this crate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmfReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub signal_strength: f64,
    /// Excitation frequency in Hz
    pub frequency: f64,
    /// Phase in degrees
    pub phase: f64,
    pub amplitude: f64,
    pub real_part: f64,
    pub imaginary_part: f64,
    pub magnitude: f64,
    /// Depth below the probe in metres
    pub depth: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    pub noise_level: f64,
    /// 0.0 - 1.0
    pub quality_score: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub session_id: u64,
}

impl EmfReading {
    /// Reading at a position with the given signal strength; remaining
    /// fields take neutral survey defaults.
    pub fn at(x: f64, y: f64, z: f64, signal_strength: f64) -> Self {
        Self {
            x,
            y,
            z,
            signal_strength,
            frequency: 19_000.0,
            amplitude: signal_strength,
            magnitude: signal_strength,
            real_part: signal_strength,
            temperature: 25.0,
            humidity: 50.0,
            pressure: 1013.25,
            quality_score: 1.0,
            ..Default::default()
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_quality(mut self, quality_score: f64) -> Self {
        self.quality_score = quality_score;
        self
    }

    /// Set real/imaginary parts and recompute the magnitude
    pub fn with_complex(mut self, real_part: f64, imaginary_part: f64) -> Self {
        self.real_part = real_part;
        self.imaginary_part = imaginary_part;
        self.magnitude = real_part.hypot(imaginary_part);
        self
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance between the two sample positions
    pub fn spatial_distance(&self, other: &EmfReading) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 16] {
        [
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
            ("signalStrength", self.signal_strength),
            ("frequency", self.frequency),
            ("phase", self.phase),
            ("amplitude", self.amplitude),
            ("realPart", self.real_part),
            ("imaginaryPart", self.imaginary_part),
            ("magnitude", self.magnitude),
            ("depth", self.depth),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("noiseLevel", self.noise_level),
            ("qualityScore", self.quality_score),
        ]
    }

    /// Physical-consistency issues with this reading, empty when clean.
    ///
    /// Individual analyzers never reject readings; the survey analyzer and
    /// the loader only report these issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                issues.push(format!("{} is not finite", name));
            }
        }
        if !issues.is_empty() {
            return issues;
        }

        let expected = self.real_part.hypot(self.imaginary_part);
        let scale = expected.max(self.magnitude).max(1.0);
        if (expected - self.magnitude).abs() / scale > MAGNITUDE_TOLERANCE {
            issues.push(format!(
                "magnitude {:.3} inconsistent with |{:.3} + j{:.3}| = {:.3}",
                self.magnitude, self.real_part, self.imaginary_part, expected
            ));
        }
        if !(0.0..=1.0).contains(&self.quality_score) {
            issues.push(format!("quality score {:.3} outside [0, 1]", self.quality_score));
        }
        if self.frequency <= 0.0 {
            issues.push(format!("frequency {:.1} Hz is not positive", self.frequency));
        }
        if self.depth < 0.0 {
            issues.push(format!("depth {:.3} m is negative", self.depth));
        }

        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Scalar channel extracted from a reading stream for pattern recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalChannel {
    #[default]
    SignalStrength,
    Magnitude,
    Amplitude,
    Phase,
    Depth,
    RealPart,
    ImaginaryPart,
}

impl SignalChannel {
    pub fn all() -> Vec<Self> {
        vec![
            Self::SignalStrength,
            Self::Magnitude,
            Self::Amplitude,
            Self::Phase,
            Self::Depth,
            Self::RealPart,
            Self::ImaginaryPart,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignalStrength => "signal",
            Self::Magnitude => "magnitude",
            Self::Amplitude => "amplitude",
            Self::Phase => "phase",
            Self::Depth => "depth",
            Self::RealPart => "real",
            Self::ImaginaryPart => "imaginary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        Self::all().into_iter().find(|c| c.name() == lowered)
    }

    pub fn value(&self, reading: &EmfReading) -> f64 {
        match self {
            Self::SignalStrength => reading.signal_strength,
            Self::Magnitude => reading.magnitude,
            Self::Amplitude => reading.amplitude,
            Self::Phase => reading.phase,
            Self::Depth => reading.depth,
            Self::RealPart => reading.real_part,
            Self::ImaginaryPart => reading.imaginary_part,
        }
    }

    /// Project a reading stream onto this channel, preserving order
    pub fn extract(&self, readings: &[EmfReading]) -> Vec<f64> {
        readings.iter().map(|r| self.value(r)).collect()
    }
}

impl std::fmt::Display for SignalChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
