//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;

use crate::core::analyzer::SurveyReport;
use crate::detection::{Finding, Severity, SurveyAssessment, SurveyVerdict};

/// One analyzed survey as emitted by `--json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOutput<'a> {
    pub assessment: &'a SurveyAssessment,
    pub report: &'a SurveyReport,
}

fn paint_verdict(verdict: SurveyVerdict, text: &str) -> String {
    match verdict {
        SurveyVerdict::TargetsDetected => text.red().to_string(),
        SurveyVerdict::PossibleTargets => text.yellow().to_string(),
        SurveyVerdict::Clear => text.green().to_string(),
        SurveyVerdict::Insufficient => text.dim().to_string(),
    }
}

fn paint_severity(severity: Severity, text: &str) -> String {
    match severity {
        Severity::High => text.red().to_string(),
        Severity::Medium | Severity::Low => text.yellow().to_string(),
        Severity::Info => text.cyan().to_string(),
    }
}

/// Format an assessment (and the report behind it) for the terminal
pub fn format_result(
    assessment: &SurveyAssessment,
    report: &SurveyReport,
    verbose: bool,
    show_suppressed: bool,
) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {} {}\n",
        paint_verdict(assessment.verdict, assessment.verdict.symbol()),
        assessment.source.as_str().bold(),
        format!("[{}]", assessment.profile_name).dim()
    ));

    output.push_str(&format!(
        "  {} (confidence: {:.0}%, {} readings)\n",
        assessment.verdict.description(),
        assessment.overall_confidence * 100.0,
        assessment.reading_count
    ));

    if report.invalid_readings > 0 {
        output.push_str(&format!(
            "  {}\n",
            format!("{} readings failed validation", report.invalid_readings).yellow()
        ));
    }

    if let Some(material) = &report.session_material {
        output.push_str(&format!(
            "  Material: {} ({:.0}% of vote, {} readings)\n",
            material.material.name().bold(),
            material.confidence * 100.0,
            material.votes
        ));
    }

    let active: Vec<_> = assessment.active_findings().collect();
    if !active.is_empty() {
        output.push_str("\n  Findings:\n");
        for finding in active {
            output.push_str(&format_finding(finding, verbose));
        }
    }

    if show_suppressed {
        let suppressed: Vec<_> = assessment.suppressed_findings().collect();
        if !suppressed.is_empty() {
            output.push_str(&format!("\n  {}\n", "Suppressed by profile:".dim()));
            for finding in suppressed {
                output.push_str(&format_suppressed_finding(finding));
            }
        }
    }

    if verbose {
        output.push_str(&format_technical(report));
    }

    output
}

fn format_finding(finding: &Finding, verbose: bool) -> String {
    let mut output = format!(
        "    {} {} {}\n",
        paint_severity(finding.severity, finding.severity.symbol()),
        finding.description,
        format!("({:.0}%)", finding.adjusted_confidence * 100.0).dim()
    );

    if verbose {
        output.push_str(&format!(
            "      {}\n",
            format!(
                "Analyzer: {} | Raw: {:.0}% | Adjusted: {:.0}%",
                finding.analyzer.name(),
                finding.raw_confidence * 100.0,
                finding.adjusted_confidence * 100.0
            )
            .dim()
        ));
        if let Some(details) = &finding.details {
            output.push_str(&format!("      {}\n", details.as_str().dim()));
        }
    }

    output
}

fn format_suppressed_finding(finding: &Finding) -> String {
    format!(
        "    {}\n",
        format!(
            "- {} ({}: {:.0}% → suppressed)",
            finding.description,
            finding.analyzer.name(),
            finding.raw_confidence * 100.0
        )
        .dim()
    )
}

fn format_technical(report: &SurveyReport) -> String {
    let mut output = String::from("\n  Technical Details:\n");

    if let Some(clusters) = &report.clusters {
        output.push_str(&format!(
            "    Clusters: {} (noise {:.0}%, silhouette {:.3}, Davies-Bouldin {:.3})\n",
            clusters.cluster_count,
            clusters.noise_ratio() * 100.0,
            clusters.silhouette_score,
            clusters.davies_bouldin_index
        ));
    }
    if let Some(inclusions) = &report.inclusions {
        output.push_str(&format!(
            "    Inclusions: {} of {} anomalies (total volume {:.3} m³, quality {:.2})\n",
            inclusions.inclusion_count,
            inclusions.anomaly_count,
            inclusions.total_volume,
            inclusions.analysis_quality
        ));
    }
    if let Some(patterns) = &report.patterns {
        output.push_str(&format!(
            "    Patterns ({}): {} periodic, {} spikes, {} trends, {} value clusters, {} harmonics\n",
            report.pattern_channel,
            patterns.periodic_patterns.len(),
            patterns.spikes.len(),
            patterns.trends.len(),
            patterns.clusters.len(),
            patterns.harmonics.len()
        ));
        output.push_str(&format!("    Complexity: {:.3}\n", patterns.complexity_score));
    }
    if !report.materials.is_empty() {
        output.push_str(&format!(
            "    Classified: {}/{} readings\n",
            report.classified_count(),
            report.reading_count
        ));
    }
    for issue in &report.validation_issues {
        output.push_str(&format!("    {}\n", issue.as_str().yellow()));
    }
    output.push_str(&format!(
        "    Report {} in {:.1} ms\n",
        report.report_id, report.processing_time_ms
    ));

    output
}

/// Results as pretty JSON
pub fn format_json(results: &[SurveyOutput<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

/// Summary line counts for multiple surveys
pub fn format_summary(assessments: &[SurveyAssessment]) -> String {
    let count = |v: SurveyVerdict| assessments.iter().filter(|a| a.verdict == v).count();

    let mut output = format!("\n{}\n", "Summary:".bold());
    output.push_str(&format!("  {} surveys analyzed\n", assessments.len()));

    let lines = [
        (SurveyVerdict::TargetsDetected, "with targets"),
        (SurveyVerdict::PossibleTargets, "with possible targets"),
        (SurveyVerdict::Clear, "clear"),
        (SurveyVerdict::Insufficient, "insufficient"),
    ];
    for (verdict, label) in lines {
        let n = count(verdict);
        if n > 0 {
            output.push_str(&format!(
                "  {}\n",
                paint_verdict(verdict, &format!("{} {} {}", verdict.symbol(), n, label))
            ));
        }
    }

    output
}
