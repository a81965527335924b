// tests/survey_test.rs
// End-to-end survey analysis: generated surveys, files on disk and the CLI

mod test_utils;

use emfcheckr::config::{ProfileConfig, ProfilePreset};
use emfcheckr::core::{collect_survey_files, load_survey, SurveyAnalyzer};
use emfcheckr::detection::{SurveyAssessment, SurveyVerdict};
use emfcheckr::testgen::{demo_surveys, BuriedTarget, SurveyGenerator, SyntheticSurvey};
use emfcheckr::EmfadMaterial;
use test_utils::{cleanup, run_emfcheckr, run_json_analysis, temp_dir};

fn target_survey() -> SyntheticSurvey {
    let targets = vec![BuriedTarget::new(2.0, 2.0, 1.0).with_strength(700.0)];
    SyntheticSurvey {
        name: "single-target".to_string(),
        description: "one shallow metallic target".to_string(),
        readings: SurveyGenerator::new().grid(10, 10, &targets),
        targets,
    }
}

#[test]
fn test_demo_surveys_produce_findings() {
    let profile = ProfileConfig::default();
    let analyzer = SurveyAnalyzer::new(profile.clone());

    for survey in demo_surveys() {
        let report = analyzer.analyze(&survey.readings);
        let assessment = SurveyAssessment::from_report(survey.name.clone(), &report, &profile);

        assert_eq!(report.reading_count, survey.readings.len());
        assert_eq!(report.invalid_readings, 0);
        assert_eq!(report.materials.len(), survey.readings.len());
        assert_ne!(assessment.verdict, SurveyVerdict::Insufficient);
        assert!(!assessment.findings.is_empty());
    }
}

#[test]
fn test_material_sweep_has_session_material() {
    let survey = demo_surveys().remove(0);
    let report = SurveyAnalyzer::new(ProfileConfig::default()).analyze(&survey.readings);

    let session = report.session_material.unwrap();
    assert_ne!(session.material, EmfadMaterial::Unknown);
    assert!(session.confidence > 0.0 && session.confidence <= 1.0);
    assert_eq!(session.classified, survey.readings.len());
}

#[test]
fn test_high_frequency_survey_has_no_material_vote() {
    // Signal-to-frequency ratios at 100 MHz fall below every material band
    let survey = demo_surveys().remove(1);
    let report = SurveyAnalyzer::new(ProfileConfig::default()).analyze(&survey.readings);
    assert!(report.session_material.is_none());
    assert!(report.inclusions.unwrap().inclusion_count > 0);
}

#[test]
fn test_presets_analyze_the_same_survey() {
    let survey = target_survey();
    for preset in ProfilePreset::all() {
        let profile = ProfileConfig::from_preset(preset);
        let report = SurveyAnalyzer::new(profile.clone()).analyze(&survey.readings);
        assert_eq!(report.profile_name, profile.name);
        assert!(report.clusters.is_some());
    }
}

#[test]
fn test_saved_survey_loads_back() {
    let dir = temp_dir("load");
    let survey = target_survey();
    survey.save(dir.join("site.json")).unwrap();
    std::fs::write(dir.join("notes.txt"), "not a survey").unwrap();

    let files = collect_survey_files(&dir);
    assert_eq!(files.len(), 1);

    let loaded = load_survey(&files[0]).unwrap();
    assert_eq!(loaded.readings.len(), survey.readings.len());
    for (a, b) in loaded.readings.iter().zip(&survey.readings) {
        assert_eq!(a.timestamp, b.timestamp);
        assert!((a.signal_strength - b.signal_strength).abs() < 1e-9);
    }
    assert_eq!(loaded.session_id, Some(1));

    cleanup(&dir);
}

#[test]
fn test_cli_json_output() {
    let dir = temp_dir("cli");
    target_survey().save(dir.join("site.json")).unwrap();

    let output = run_json_analysis(&dir);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["report"]["readingCount"], 100);
    assert!(results[0]["assessment"]["source"]
        .as_str()
        .unwrap()
        .ends_with("site.json"));

    cleanup(&dir);
}

#[test]
fn test_cli_demo_writes_reports() {
    let dir = temp_dir("reports");

    let output = run_emfcheckr("--demo")
        .arg("--output")
        .arg(&dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("material-sweep"));
    assert!(stdout.contains("Summary:"));
    assert!(dir.join("material-sweep.report.json").is_file());
    assert!(dir.join("inclusion-grid.report.json").is_file());

    cleanup(&dir);
}

#[test]
fn test_cli_rejects_missing_input() {
    let output = std::process::Command::new(test_utils::get_binary_path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
