// src/core/analyzer.rs
//
// High-level survey analysis API with builder pattern.

use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{
    ClusterAnalyzer, ClusterResult, InclusionDetectionResult, InclusionDetector,
    PatternRecognitionResult, PatternRecognizer,
};
use super::material::{
    session_material, ClassificationOutcome, InferenceEngine, MaterialClassifier, SessionMaterial,
};
use super::reading::{EmfReading, SignalChannel};
use crate::config::{AnalyzerType, ProfileConfig};

/// Cap on validation messages carried in a report
const MAX_VALIDATION_ISSUES: usize = 10;

/// Everything one analysis pass produced. Stages disabled by the profile
/// are None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub profile_name: String,
    pub reading_count: usize,
    pub invalid_readings: usize,
    pub validation_issues: Vec<String>,
    pub clusters: Option<ClusterResult>,
    pub inclusions: Option<InclusionDetectionResult>,
    pub pattern_channel: SignalChannel,
    pub patterns: Option<PatternRecognitionResult>,
    /// Per-reading outcomes, index-aligned with the input
    pub materials: Vec<Option<ClassificationOutcome>>,
    pub session_material: Option<SessionMaterial>,
    pub processing_time_ms: f64,
}

impl SurveyReport {
    pub fn classified_count(&self) -> usize {
        self.materials.iter().flatten().count()
    }
}

/// Builder for SurveyAnalyzer configuration
pub struct AnalyzerBuilder {
    profile: ProfileConfig,
    engine: Option<(Box<dyn InferenceEngine>, Vec<u8>)>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            profile: ProfileConfig::default(),
            engine: None,
        }
    }

    pub fn profile(mut self, profile: ProfileConfig) -> Self {
        self.profile = profile;
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.profile.clustering.eps = eps;
        self
    }

    pub fn min_points(mut self, min_points: usize) -> Self {
        self.profile.clustering.min_points = min_points;
        self
    }

    pub fn anomaly_threshold(mut self, threshold: f64) -> Self {
        self.profile.inclusions.anomaly_threshold = threshold;
        self
    }

    pub fn pattern_channel(mut self, channel: SignalChannel) -> Self {
        self.profile.pattern_channel = channel;
        self
    }

    /// Attach an inference engine; the model is loaded at build time
    pub fn inference_engine(mut self, engine: Box<dyn InferenceEngine>, model: Vec<u8>) -> Self {
        self.engine = Some((engine, model));
        self
    }

    pub fn build(self) -> SurveyAnalyzer {
        let mut material = MaterialClassifier::new(self.profile.material.clone());
        if let Some((engine, model)) = self.engine {
            material = material.with_model(engine, &model);
        }

        SurveyAnalyzer {
            clusters: ClusterAnalyzer::new(self.profile.clustering.clone()),
            inclusions: InclusionDetector::new(self.profile.inclusions.clone()),
            patterns: PatternRecognizer::new(self.profile.patterns.clone()),
            material,
            profile: self.profile,
        }
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs every enabled analysis stage over a reading set
#[derive(Debug)]
pub struct SurveyAnalyzer {
    profile: ProfileConfig,
    clusters: ClusterAnalyzer,
    inclusions: InclusionDetector,
    patterns: PatternRecognizer,
    material: MaterialClassifier,
}

impl SurveyAnalyzer {
    /// Analyzer with the given profile and no inference engine
    pub fn new(profile: ProfileConfig) -> Self {
        AnalyzerBuilder::new().profile(profile).build()
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn profile(&self) -> &ProfileConfig {
        &self.profile
    }

    pub fn analyze(&self, readings: &[EmfReading]) -> SurveyReport {
        let started = Instant::now();
        let enabled = |a: AnalyzerType| self.profile.is_analyzer_enabled(a);

        let mut invalid_readings = 0;
        let mut validation_issues = Vec::new();
        for (i, reading) in readings.iter().enumerate() {
            let issues = reading.validate();
            if issues.is_empty() {
                continue;
            }
            invalid_readings += 1;
            if validation_issues.len() < MAX_VALIDATION_ISSUES {
                validation_issues.push(format!("reading #{}: {}", i, issues.join("; ")));
            }
        }
        if invalid_readings > 0 {
            debug!("{} of {} readings failed validation", invalid_readings, readings.len());
        }

        // Clustering and inclusion detection are independent passes
        let (clusters, inclusions) = rayon::join(
            || enabled(AnalyzerType::Clustering).then(|| self.clusters.analyze(readings)),
            || enabled(AnalyzerType::Inclusions).then(|| self.inclusions.detect(readings)),
        );

        let channel = self.profile.pattern_channel;
        let patterns = enabled(AnalyzerType::Patterns)
            .then(|| self.patterns.recognize(&channel.extract(readings)));

        let (materials, session) = if enabled(AnalyzerType::Material) {
            let mut outcomes = self.material.classify_batch(readings);
            if let Some(count) = inclusions.as_ref().map(|r| r.inclusion_count as u32) {
                for outcome in outcomes.iter_mut().flatten() {
                    outcome.analysis = outcome.analysis.clone().with_inclusion_count(count);
                }
            }
            let session = session_material(&outcomes);
            (outcomes, session)
        } else {
            (Vec::new(), None)
        };

        let report = SurveyReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            profile_name: self.profile.name.clone(),
            reading_count: readings.len(),
            invalid_readings,
            validation_issues,
            clusters,
            inclusions,
            pattern_channel: channel,
            patterns,
            materials,
            session_material: session,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            "Survey analyzed: {} readings, {} clusters, {} inclusions, {} patterns in {:.1} ms",
            report.reading_count,
            report.clusters.as_ref().map_or(0, |c| c.cluster_count),
            report.inclusions.as_ref().map_or(0, |i| i.inclusion_count),
            report.patterns.as_ref().map_or(0, |p| p.pattern_count()),
            report.processing_time_ms
        );

        report
    }
}
