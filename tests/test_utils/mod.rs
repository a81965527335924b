// tests/test_utils/mod.rs
// Shared helpers for the integration suites

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use uuid::Uuid;

use emfcheckr::core::material::FeatureVector;
use emfcheckr::core::{EmfReading, EmfResult};
use emfcheckr::InferenceEngine;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_emfcheckr"))
}

pub fn run_emfcheckr<P: AsRef<std::ffi::OsStr>>(input: P) -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.arg(input);
    cmd
}

pub fn run_json_analysis<P: AsRef<std::ffi::OsStr>>(input: P) -> Output {
    run_emfcheckr(input)
        .arg("--json")
        .output()
        .expect("Failed to execute with --json")
}

/// Fresh scratch directory under the system temp dir
pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("emfcheckr-{}-{}", label, Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

/// Readings along x with identical signal characteristics
pub fn line(start_x: f64, count: usize, step: f64, signal: f64) -> Vec<EmfReading> {
    (0..count)
        .map(|i| {
            EmfReading::at(start_x + i as f64 * step, 0.0, 0.0, signal)
                .with_frequency(19_000.0)
                .with_phase(10.0)
        })
        .collect()
}

/// Small square of readings centred on (cx, cy)
pub fn blob(cx: f64, cy: f64, signal: f64) -> Vec<EmfReading> {
    let offsets = [(0.0, 0.0), (0.1, 0.0), (0.0, 0.1), (0.1, 0.1), (0.05, 0.05)];
    offsets
        .iter()
        .map(|(dx, dy)| {
            EmfReading::at(cx + dx, cy + dy, 0.0, signal)
                .with_frequency(19_000.0)
                .with_phase(10.0)
        })
        .collect()
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}

/// Engine that always answers with the same scores
pub struct FixedEngine {
    pub scores: Vec<f32>,
}

impl FixedEngine {
    /// One-hot style scores with `score` at `class`
    pub fn scoring(class: usize, score: f32) -> Self {
        let mut scores = vec![0.01; 15];
        scores[class] = score;
        Self { scores }
    }
}

impl InferenceEngine for FixedEngine {
    fn initialize(&mut self, model: &[u8]) -> bool {
        !model.is_empty()
    }

    fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
        Ok(self.scores.clone())
    }

    fn cleanup(&mut self) {}
}
