//! Survey findings with profile-aware confidence scoring

use serde::{Deserialize, Serialize};

use crate::config::{AnalyzerType, ProfileConfig};
use crate::core::analyzer::SurveyReport;

/// Severity level for a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - expected survey structure
    Info,
    /// Low confidence - possible target
    Low,
    /// Medium confidence - likely target
    Medium,
    /// High confidence - definite target
    High,
}

impl Severity {
    pub fn from_confidence(confidence: f32) -> Self {
        match confidence {
            c if c >= 0.85 => Severity::High,
            c if c >= 0.65 => Severity::Medium,
            c if c >= 0.40 => Severity::Low,
            _ => Severity::Info,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Low => "⚠",
            Severity::Medium => "⚠",
            Severity::High => "✗",
        }
    }
}

/// Raw finding from an analyzer (before profile adjustment)
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub analyzer: AnalyzerType,
    pub confidence: f32,
    pub description: String,
    pub details: Option<String>,
}

impl RawDetection {
    pub fn new(analyzer: AnalyzerType, confidence: f32, description: impl Into<String>) -> Self {
        Self {
            analyzer,
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Profile-adjusted finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub analyzer: AnalyzerType,
    pub raw_confidence: f32,
    pub adjusted_confidence: f32,
    pub severity: Severity,
    pub description: String,
    pub details: Option<String>,
    /// Whether this finding was suppressed by profile (for verbose output)
    pub suppressed: bool,
}

impl Finding {
    pub fn from_raw(raw: RawDetection, profile: &ProfileConfig) -> Self {
        match profile.adjust_confidence(raw.analyzer, raw.confidence) {
            Some(conf) => Self {
                analyzer: raw.analyzer,
                raw_confidence: raw.confidence,
                adjusted_confidence: conf,
                severity: Severity::from_confidence(conf),
                description: raw.description,
                details: raw.details,
                suppressed: false,
            },
            None => Self {
                analyzer: raw.analyzer,
                raw_confidence: raw.confidence,
                adjusted_confidence: 0.0,
                severity: Severity::Info,
                description: raw.description,
                details: raw.details,
                suppressed: true,
            },
        }
    }
}

/// Overall verdict for a survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyVerdict {
    /// Strong, consistent sub-surface targets
    TargetsDetected,
    /// Some flags but not definitive
    PossibleTargets,
    /// Nothing beyond background
    Clear,
    /// No usable readings
    Insufficient,
}

impl SurveyVerdict {
    pub fn symbol(&self) -> &'static str {
        match self {
            SurveyVerdict::TargetsDetected => "✗",
            SurveyVerdict::PossibleTargets => "?",
            SurveyVerdict::Clear => "✓",
            SurveyVerdict::Insufficient => "-",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SurveyVerdict::TargetsDetected => "Targets detected",
            SurveyVerdict::PossibleTargets => "Possible targets",
            SurveyVerdict::Clear => "No significant targets",
            SurveyVerdict::Insufficient => "Insufficient data",
        }
    }
}

/// Findings and verdict for one survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAssessment {
    pub source: String,
    pub profile_name: String,
    pub reading_count: usize,
    pub verdict: SurveyVerdict,
    pub findings: Vec<Finding>,
    pub overall_confidence: f32,
}

impl SurveyAssessment {
    pub fn new(source: impl Into<String>, reading_count: usize, profile: &ProfileConfig) -> Self {
        Self {
            source: source.into(),
            profile_name: profile.name.clone(),
            reading_count,
            verdict: SurveyVerdict::Insufficient,
            findings: Vec::new(),
            overall_confidence: 0.0,
        }
    }

    /// Assess a full report
    pub fn from_report(source: impl Into<String>, report: &SurveyReport, profile: &ProfileConfig) -> Self {
        let mut assessment = Self::new(source, report.reading_count, profile);
        assessment.add_detections(raw_detections(report), profile);
        assessment
    }

    pub fn add_detections(&mut self, raws: Vec<RawDetection>, profile: &ProfileConfig) {
        for raw in raws {
            self.findings.push(Finding::from_raw(raw, profile));
        }
        self.compute_verdict();
    }

    fn compute_verdict(&mut self) {
        if self.reading_count == 0 {
            self.verdict = SurveyVerdict::Insufficient;
            self.overall_confidence = 0.0;
            return;
        }

        let active: Vec<_> = self.active_findings().collect();
        if active.is_empty() {
            self.verdict = SurveyVerdict::Clear;
            self.overall_confidence = 0.0;
            return;
        }

        let total: f32 = active.iter().map(|f| f.adjusted_confidence).sum();
        let avg_confidence = total / active.len() as f32;
        let high_count = active.iter().filter(|f| f.severity == Severity::High).count();

        self.overall_confidence = avg_confidence;
        self.verdict = match (high_count, avg_confidence) {
            (h, _) if h >= 2 => SurveyVerdict::TargetsDetected,
            (1, c) if c >= 0.7 => SurveyVerdict::TargetsDetected,
            (_, c) if c >= 0.5 => SurveyVerdict::PossibleTargets,
            (_, c) if c < 0.3 => SurveyVerdict::Clear,
            _ => SurveyVerdict::PossibleTargets,
        };
    }

    pub fn active_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.suppressed)
    }

    pub fn suppressed_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.suppressed)
    }
}

/// Turn analyzer output into raw findings
pub fn raw_detections(report: &SurveyReport) -> Vec<RawDetection> {
    let mut raws = Vec::new();

    if let Some(clusters) = &report.clusters {
        let clean = 1.0 - clusters.noise_ratio();
        for cluster in &clusters.clusters {
            raws.push(
                RawDetection::new(
                    AnalyzerType::Clustering,
                    (cluster.coherence * clean) as f32,
                    format!(
                        "Cluster #{}: {} readings around ({:.2}, {:.2}, {:.2})",
                        cluster.id,
                        cluster.size(),
                        cluster.centroid.x,
                        cluster.centroid.y,
                        cluster.centroid.z
                    ),
                )
                .with_details(format!(
                    "radius {:.2} m, density {:.2}, coherence {:.2}",
                    cluster.radius, cluster.density, cluster.coherence
                )),
            );
        }
    }

    if let Some(inclusions) = &report.inclusions {
        for inclusion in &inclusions.inclusions {
            raws.push(
                RawDetection::new(
                    AnalyzerType::Inclusions,
                    inclusion.confidence as f32,
                    format!(
                        "{} inclusion ({}) at depth {:.2} m",
                        inclusion.inclusion_type, inclusion.material_type, inclusion.depth
                    ),
                )
                .with_details(format!(
                    "size {:.2} m, {:?} shape, {} orientation",
                    inclusion.size, inclusion.shape, inclusion.orientation
                )),
            );
        }
    }

    if let Some(patterns) = &report.patterns {
        for periodic in &patterns.periodic_patterns {
            raws.push(RawDetection::new(
                AnalyzerType::Patterns,
                periodic.confidence as f32,
                format!(
                    "Periodic {} signal, period {} samples",
                    report.pattern_channel, periodic.period
                ),
            ));
        }
        for spike in &patterns.spikes {
            raws.push(RawDetection::new(
                AnalyzerType::Patterns,
                spike.confidence as f32,
                format!(
                    "{:?} spike at sample {} (width {})",
                    spike.direction, spike.peak_index, spike.width
                ),
            ));
        }
        for trend in &patterns.trends {
            raws.push(RawDetection::new(
                AnalyzerType::Patterns,
                trend.r_squared as f32,
                format!(
                    "{:?} trend over samples {}..{} (slope {:.3})",
                    trend.direction, trend.start, trend.end, trend.slope
                ),
            ));
        }
    }

    if let Some(material) = &report.session_material {
        raws.push(RawDetection::new(
            AnalyzerType::Material,
            material.confidence as f32,
            format!(
                "Dominant material: {} ({} of {} readings)",
                material.material, material.votes, material.classified
            ),
        ));
    }

    raws
}
