// src/core/survey.rs
//
// Survey file loading. A survey file is JSON: either a bare array of
// readings or an object with a session id and a readings array.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::reading::EmfReading;

/// Recognised survey file extensions
pub const SURVEY_EXTENSIONS: [&str; 2] = ["json", "emf"];

/// Decoded survey plus light metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyData {
    pub source: String,
    pub session_id: Option<u64>,
    pub readings: Vec<EmfReading>,
}

impl SurveyData {
    pub fn new(source: impl Into<String>, readings: Vec<EmfReading>) -> Self {
        let session_id = readings.first().map(|r| r.session_id);
        Self {
            source: source.into(),
            session_id,
            readings,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings failing `EmfReading::validate`, with their issues
    pub fn invalid_readings(&self) -> Vec<(usize, Vec<String>)> {
        self.readings
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let issues = r.validate();
                (!issues.is_empty()).then_some((i, issues))
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SurveyFile {
    Session {
        #[serde(rename = "sessionId")]
        session_id: Option<u64>,
        readings: Vec<EmfReading>,
    },
    Readings(Vec<EmfReading>),
}

/// Parse a survey document
pub fn parse_survey(source: &str, json: &str) -> Result<SurveyData> {
    let parsed: SurveyFile = serde_json::from_str(json)
        .with_context(|| format!("Failed to parse survey: {}", source))?;

    let survey = match parsed {
        SurveyFile::Session {
            session_id,
            readings,
        } => {
            let mut survey = SurveyData::new(source, readings);
            if session_id.is_some() {
                survey.session_id = session_id;
            }
            survey
        }
        SurveyFile::Readings(readings) => SurveyData::new(source, readings),
    };

    if survey.is_empty() {
        bail!("Survey contains no readings: {}", source);
    }

    let invalid = survey.invalid_readings();
    if !invalid.is_empty() {
        warn!(
            "{}: {}/{} readings failed validation (first: #{} {})",
            source,
            invalid.len(),
            survey.len(),
            invalid[0].0,
            invalid[0].1.join("; ")
        );
    }

    debug!("Loaded {} readings from {}", survey.len(), source);
    Ok(survey)
}

/// Load a survey file from disk
pub fn load_survey(path: &Path) -> Result<SurveyData> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    parse_survey(&path.display().to_string(), &text)
}

fn has_survey_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SURVEY_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Survey files under `path` (the path itself when it is a file)
pub fn collect_survey_files(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if path.is_file() {
        if has_survey_extension(path) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && has_survey_extension(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[{"x": 1.0, "signalStrength": 500.0, "frequency": 19000.0, "sessionId": 7}]"#;
        let survey = parse_survey("inline", json).unwrap();
        assert_eq!(survey.len(), 1);
        assert_eq!(survey.session_id, Some(7));
        assert_eq!(survey.readings[0].signal_strength, 500.0);
    }

    #[test]
    fn test_parse_session_object() {
        let json = r#"{"sessionId": 42, "readings": [{"x": 0.0}, {"x": 1.0}]}"#;
        let survey = parse_survey("inline", json).unwrap();
        assert_eq!(survey.len(), 2);
        assert_eq!(survey.session_id, Some(42));
    }

    #[test]
    fn test_empty_survey_rejected() {
        assert!(parse_survey("inline", "[]").is_err());
        assert!(parse_survey("inline", "{ nope").is_err());
    }

    #[test]
    fn test_collect_ignores_other_extensions() {
        let dir = std::env::temp_dir().join(format!("emfcheckr-survey-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a.json"), "[]").unwrap();
        fs::write(dir.join("nested").join("b.EMF"), "[]").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();

        let files = collect_survey_files(&dir);
        assert_eq!(files.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
