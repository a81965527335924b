// src/main.rs
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, warn};
use rayon::prelude::*;

use emfcheckr::cli::{format_json, format_result, format_summary, print_profiles, Args, SurveyOutput};
use emfcheckr::config::ProfileConfig;
use emfcheckr::core::{collect_survey_files, export, load_survey, SurveyAnalyzer, SurveyData, SurveyReport};
use emfcheckr::detection::SurveyAssessment;
use emfcheckr::testgen;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if args.list_profiles {
        print_profiles();
        return Ok(());
    }

    let profile = args.build_profile()?;
    debug!("Using profile: {}", profile.name);

    if let Some(path) = &args.save_profile {
        profile
            .save(path)
            .with_context(|| format!("Failed to save profile: {}", path.display()))?;
        println!("Profile saved to: {}", path.display());
    }

    let surveys = if args.demo {
        testgen::demo_surveys()
            .into_iter()
            .map(|s| SurveyData::new(s.name, s.readings))
            .collect()
    } else {
        match &args.input {
            Some(input) => load_surveys(input),
            None => Vec::new(),
        }
    };

    if surveys.is_empty() {
        println!("{}", "No survey files found!".red());
        return Ok(());
    }

    if !args.json {
        println!("Found {} survey(s), profile: {}\n", surveys.len(), profile.name.as_str().cyan());
    }

    let results = analyze_all(&surveys, &profile, args.json);

    if let Some(dir) = &args.output {
        write_reports(dir, &results)?;
    }

    if args.json {
        let outputs: Vec<_> = results
            .iter()
            .map(|(assessment, report)| SurveyOutput { assessment, report })
            .collect();
        println!("{}", format_json(&outputs)?);
        return Ok(());
    }

    for (assessment, report) in &results {
        println!("{}", format_result(assessment, report, args.verbose, args.show_suppressed));
    }

    if results.len() > 1 {
        let assessments: Vec<_> = results.into_iter().map(|(a, _)| a).collect();
        println!("{}", format_summary(&assessments));
    }

    Ok(())
}

fn load_surveys(input: &Path) -> Vec<SurveyData> {
    let mut surveys = Vec::new();
    for path in collect_survey_files(input) {
        match load_survey(&path) {
            Ok(survey) => surveys.push(survey),
            Err(e) => eprintln!("{} {:#}", "Skipping".red(), e),
        }
    }
    surveys
}

fn analyze_all(
    surveys: &[SurveyData],
    profile: &ProfileConfig,
    quiet: bool,
) -> Vec<(SurveyAssessment, SurveyReport)> {
    let analyzer = SurveyAnalyzer::new(profile.clone());

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(surveys.len() as u64)
    };
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    let results = surveys
        .par_iter()
        .progress_with(progress.clone())
        .map(|survey| {
            let report = analyzer.analyze(&survey.readings);
            let assessment = SurveyAssessment::from_report(survey.source.clone(), &report, profile);
            (assessment, report)
        })
        .collect();

    progress.finish_and_clear();
    results
}

fn write_reports(dir: &Path, results: &[(SurveyAssessment, SurveyReport)]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for (assessment, report) in results {
        let stem = Path::new(&assessment.source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("survey");
        let path = dir.join(format!("{}.report.json", stem));
        let output = SurveyOutput { assessment, report };
        match export::write_json_file(&path, &output) {
            Some(()) => debug!("Report written to {}", path.display()),
            None => warn!("Report for {} not written", assessment.source),
        }
    }

    Ok(())
}
