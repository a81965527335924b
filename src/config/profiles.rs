// src/config/profiles.rs
//
// Survey profiles: analyzer parameters tuned per survey scenario, plus
// per-analyzer confidence modifiers for reported findings.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::analysis::{ClusteringParams, InclusionParams, PatternParams};
use crate::core::error::{EmfError, EmfResult};
use crate::core::material::MaterialParams;
use crate::core::reading::SignalChannel;

/// Analysis stages that can be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzerType {
    Clustering,
    Inclusions,
    Patterns,
    Material,
}

impl AnalyzerType {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Clustering,
            Self::Inclusions,
            Self::Patterns,
            Self::Material,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clustering => "clustering",
            Self::Inclusions => "inclusions",
            Self::Patterns => "patterns",
            Self::Material => "material",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        Self::all().into_iter().find(|a| a.name() == lowered)
    }
}

/// Preset profiles for common survey scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfilePreset {
    /// Balanced defaults for general surveys
    Standard,
    /// Near-surface work: tight clustering, small targets
    Shallow,
    /// Deep targets: wide neighbourhoods, stricter anomaly gate
    Deep,
    /// Low thresholds everywhere; expect more findings
    HighSensitivity,
    /// User-defined settings
    Custom,
}

impl ProfilePreset {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Standard,
            Self::Shallow,
            Self::Deep,
            Self::HighSensitivity,
        ]
    }
}

/// Confidence modifier for an analyzer's findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceModifier {
    /// Multiplier for analyzer confidence (0.0-2.0, where 1.0 is neutral)
    pub multiplier: f32,
    /// If true, findings are shown but don't affect the verdict
    pub suppress_from_verdict: bool,
    /// Custom reporting threshold (None uses the profile's min_confidence)
    pub threshold_override: Option<f32>,
}

impl Default for ConfidenceModifier {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            suppress_from_verdict: false,
            threshold_override: None,
        }
    }
}

impl ConfidenceModifier {
    pub fn with_multiplier(multiplier: f32) -> Self {
        Self {
            multiplier,
            ..Default::default()
        }
    }

    pub fn suppressed() -> Self {
        Self {
            suppress_from_verdict: true,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            multiplier: 0.0,
            suppress_from_verdict: true,
            ..Default::default()
        }
    }
}

/// Complete profile configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub name: String,
    pub description: String,
    /// Base preset this was derived from
    pub base_preset: ProfilePreset,
    pub clustering: ClusteringParams,
    pub inclusions: InclusionParams,
    pub patterns: PatternParams,
    pub material: MaterialParams,
    /// Channel fed to the pattern recognizer
    pub pattern_channel: SignalChannel,
    /// Per-analyzer confidence modifiers
    pub analyzer_modifiers: HashMap<AnalyzerType, ConfidenceModifier>,
    /// Global sensitivity adjustment (0.0-2.0)
    pub global_sensitivity: f32,
    /// Minimum adjusted confidence to report a finding
    pub min_confidence: f32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self::from_preset(ProfilePreset::Standard)
    }
}

impl ProfileConfig {
    pub fn from_preset(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::Standard => Self::standard(),
            ProfilePreset::Shallow => Self::shallow(),
            ProfilePreset::Deep => Self::deep(),
            ProfilePreset::HighSensitivity => Self::high_sensitivity(),
            ProfilePreset::Custom => Self::standard(),
        }
    }

    fn standard() -> Self {
        Self {
            name: "Standard".to_string(),
            description: "Balanced defaults for general surveys".to_string(),
            base_preset: ProfilePreset::Standard,
            clustering: ClusteringParams::default(),
            inclusions: InclusionParams::default(),
            patterns: PatternParams::default(),
            material: MaterialParams::default(),
            pattern_channel: SignalChannel::SignalStrength,
            analyzer_modifiers: HashMap::new(),
            global_sensitivity: 1.0,
            min_confidence: 0.4,
        }
    }

    fn shallow() -> Self {
        let mut modifiers = HashMap::new();

        // Shallow targets give crisp anomalies
        modifiers.insert(AnalyzerType::Inclusions, ConfidenceModifier::with_multiplier(1.1));

        Self {
            name: "Shallow".to_string(),
            description: "Near-surface surveys with small, closely spaced targets".to_string(),
            base_preset: ProfilePreset::Shallow,
            clustering: ClusteringParams {
                eps: 0.3,
                ..ClusteringParams::default()
            },
            inclusions: InclusionParams {
                merge_radius: 0.5,
                max_inclusion_size: 2.0,
                ..InclusionParams::default()
            },
            analyzer_modifiers: modifiers,
            ..Self::standard()
        }
    }

    fn deep() -> Self {
        let mut modifiers = HashMap::new();

        // Depth smears the channel; periodicity is less trustworthy
        modifiers.insert(AnalyzerType::Patterns, ConfidenceModifier::with_multiplier(0.8));
        modifiers.insert(AnalyzerType::Material, ConfidenceModifier::with_multiplier(0.9));

        Self {
            name: "Deep".to_string(),
            description: "Deep targets with broad, weak anomalies".to_string(),
            base_preset: ProfilePreset::Deep,
            clustering: ClusteringParams {
                eps: 1.0,
                min_points: 4,
                ..ClusteringParams::default()
            },
            inclusions: InclusionParams {
                anomaly_threshold: 0.3,
                merge_radius: 2.0,
                ..InclusionParams::default()
            },
            analyzer_modifiers: modifiers,
            global_sensitivity: 0.9,
            min_confidence: 0.5,
            ..Self::standard()
        }
    }

    fn high_sensitivity() -> Self {
        Self {
            name: "HighSensitivity".to_string(),
            description: "Low thresholds for exploratory surveys".to_string(),
            base_preset: ProfilePreset::HighSensitivity,
            clustering: ClusteringParams {
                min_points: 2,
                ..ClusteringParams::default()
            },
            inclusions: InclusionParams {
                anomaly_threshold: 0.1,
                ..InclusionParams::default()
            },
            patterns: PatternParams {
                periodic_correlation_threshold: 0.5,
                spike_std_multiplier: 1.5,
                spike_mad_multiplier: 2.5,
                ..PatternParams::default()
            },
            global_sensitivity: 1.2,
            min_confidence: 0.3,
            ..Self::standard()
        }
    }

    /// Get modifier for a specific analyzer
    pub fn get_modifier(&self, analyzer: AnalyzerType) -> ConfidenceModifier {
        self.analyzer_modifiers
            .get(&analyzer)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_analyzer_enabled(&self, analyzer: AnalyzerType) -> bool {
        self.get_modifier(analyzer).multiplier > 0.0
    }

    /// Profile-adjusted confidence, or None when the finding should be
    /// suppressed (analyzer disabled or suppressed, or below threshold)
    pub fn adjust_confidence(&self, analyzer: AnalyzerType, raw_confidence: f32) -> Option<f32> {
        let modifier = self.get_modifier(analyzer);
        if modifier.suppress_from_verdict || modifier.multiplier <= 0.0 {
            return None;
        }

        let adjusted = (raw_confidence * modifier.multiplier * self.global_sensitivity).clamp(0.0, 1.0);
        let threshold = modifier.threshold_override.unwrap_or(self.min_confidence);

        (adjusted >= threshold).then_some(adjusted)
    }

    /// Reject parameter combinations the analyzers cannot run with
    pub fn validate(&self) -> EmfResult<()> {
        if !(self.clustering.eps > 0.0) {
            return Err(EmfError::Config(format!("eps must be positive, got {}", self.clustering.eps)));
        }
        if self.clustering.min_points == 0 {
            return Err(EmfError::Config("min_points must be at least 1".to_string()));
        }
        if self.inclusions.min_inclusion_size > self.inclusions.max_inclusion_size {
            return Err(EmfError::Config(format!(
                "inclusion size bounds inverted: {} > {}",
                self.inclusions.min_inclusion_size, self.inclusions.max_inclusion_size
            )));
        }
        if !(0.0..=1.0).contains(&self.material.confidence_threshold) {
            return Err(EmfError::Config(format!(
                "model confidence threshold {} outside [0, 1]",
                self.material.confidence_threshold
            )));
        }
        if self.patterns.fractal_scales.iter().any(|&k| k == 0) {
            return Err(EmfError::Config("fractal scales must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Default profile location under the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("emfcheckr").join("profile.json"))
    }

    /// Load and validate a profile from JSON
    pub fn load(path: &Path) -> EmfResult<Self> {
        let text = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&text)?;
        profile.validate()?;
        debug!("Loaded profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> EmfResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved profile '{}' to {}", self.name, path.display());
        Ok(())
    }
}

/// Builder for custom profiles
pub struct ProfileBuilder {
    config: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self {
            config: ProfileConfig::default(),
        }
    }

    pub fn from_preset(preset: ProfilePreset) -> Self {
        Self {
            config: ProfileConfig::from_preset(preset),
        }
    }

    /// Start from an existing (e.g. loaded) profile
    pub fn from_config(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.config.description = desc.into();
        self
    }

    pub fn global_sensitivity(mut self, sensitivity: f32) -> Self {
        self.config.global_sensitivity = sensitivity.clamp(0.0, 2.0);
        self
    }

    pub fn min_confidence(mut self, threshold: f32) -> Self {
        self.config.min_confidence = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.config.clustering.eps = eps;
        self
    }

    pub fn min_points(mut self, min_points: usize) -> Self {
        self.config.clustering.min_points = min_points;
        self
    }

    pub fn anomaly_threshold(mut self, threshold: f64) -> Self {
        self.config.inclusions.anomaly_threshold = threshold;
        self
    }

    pub fn merge_radius(mut self, radius: f64) -> Self {
        self.config.inclusions.merge_radius = radius;
        self
    }

    pub fn pattern_channel(mut self, channel: SignalChannel) -> Self {
        self.config.pattern_channel = channel;
        self
    }

    pub fn model_confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.material.confidence_threshold = threshold;
        self
    }

    pub fn analyzer_multiplier(mut self, analyzer: AnalyzerType, multiplier: f32) -> Self {
        self.config
            .analyzer_modifiers
            .insert(analyzer, ConfidenceModifier::with_multiplier(multiplier));
        self
    }

    pub fn disable_analyzer(mut self, analyzer: AnalyzerType) -> Self {
        self.config
            .analyzer_modifiers
            .insert(analyzer, ConfidenceModifier::disabled());
        self
    }

    pub fn suppress_analyzer(mut self, analyzer: AnalyzerType) -> Self {
        self.config
            .analyzer_modifiers
            .insert(analyzer, ConfidenceModifier::suppressed());
        self
    }

    pub fn build(mut self) -> ProfileConfig {
        self.config.base_preset = ProfilePreset::Custom;
        self.config
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
