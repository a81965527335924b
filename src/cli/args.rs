//! CLI argument parsing with profile support

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::config::{AnalyzerType, ProfileBuilder, ProfileConfig, ProfilePreset};
use crate::core::reading::SignalChannel;

/// Preset names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Standard,
    Shallow,
    Deep,
    HighSensitivity,
}

impl From<PresetArg> for ProfilePreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Standard => ProfilePreset::Standard,
            PresetArg::Shallow => ProfilePreset::Shallow,
            PresetArg::Deep => ProfilePreset::Deep,
            PresetArg::HighSensitivity => ProfilePreset::HighSensitivity,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "emfcheckr")]
#[command(version)]
#[command(about = "Analyze EMF survey readings: clusters, inclusions, patterns and materials")]
pub struct Args {
    /// Survey file or directory of survey files (.json / .emf)
    #[arg(required_unless_present_any = ["demo", "list_profiles"])]
    pub input: Option<PathBuf>,

    /// Survey profile preset [default: saved profile, else standard]
    #[arg(short, long, value_enum)]
    pub profile: Option<PresetArg>,

    /// Load the profile from a JSON file instead of a preset
    #[arg(long, env = "EMFCHECKR_PROFILE")]
    pub profile_file: Option<PathBuf>,

    /// Save the effective profile as JSON
    #[arg(long)]
    pub save_profile: Option<PathBuf>,

    /// DBSCAN neighbourhood radius
    #[arg(long)]
    pub eps: Option<f64>,

    /// DBSCAN core-point neighbour count
    #[arg(long)]
    pub min_points: Option<usize>,

    /// Normalized deviation marking an anomalous reading
    #[arg(long)]
    pub anomaly_threshold: Option<f64>,

    /// Channel fed to pattern recognition
    /// (signal, magnitude, amplitude, phase, depth, real, imaginary)
    #[arg(long, value_parser = parse_channel)]
    pub channel: Option<SignalChannel>,

    /// Disable an analyzer (clustering, inclusions, patterns, material); repeatable
    #[arg(long, value_parser = parse_analyzer)]
    pub disable: Vec<AnalyzerType>,

    /// Global sensitivity multiplier (0.0 - 2.0)
    #[arg(long)]
    pub sensitivity: Option<f32>,

    /// Minimum adjusted confidence for a reported finding
    #[arg(long)]
    pub min_confidence: Option<f32>,

    /// Verbose output with analyzer details and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show findings suppressed by the profile
    #[arg(long)]
    pub show_suppressed: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory to write full survey reports into
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Analyze generated demo surveys instead of input files
    #[arg(long)]
    pub demo: bool,

    /// List available profiles and exit
    #[arg(long)]
    pub list_profiles: bool,
}

fn parse_channel(name: &str) -> std::result::Result<SignalChannel, String> {
    SignalChannel::from_name(name).ok_or_else(|| format!("Unknown channel: {}", name))
}

fn parse_analyzer(name: &str) -> std::result::Result<AnalyzerType, String> {
    AnalyzerType::from_name(name).ok_or_else(|| format!("Unknown analyzer: {}", name))
}

impl Args {
    fn has_overrides(&self) -> bool {
        self.eps.is_some()
            || self.min_points.is_some()
            || self.anomaly_threshold.is_some()
            || self.channel.is_some()
            || !self.disable.is_empty()
            || self.sensitivity.is_some()
            || self.min_confidence.is_some()
    }

    fn base_profile(&self) -> Result<ProfileConfig> {
        if let Some(path) = &self.profile_file {
            return ProfileConfig::load(path)
                .with_context(|| format!("Failed to load profile: {}", path.display()));
        }
        if let Some(preset) = self.profile {
            return Ok(ProfileConfig::from_preset(preset.into()));
        }
        match ProfileConfig::default_path().filter(|p| p.is_file()) {
            Some(path) => ProfileConfig::load(&path)
                .with_context(|| format!("Failed to load saved profile: {}", path.display())),
            None => Ok(ProfileConfig::default()),
        }
    }

    /// Effective profile: profile file, preset or saved default, then flag overrides
    pub fn build_profile(&self) -> Result<ProfileConfig> {
        let base = self.base_profile()?;

        if !self.has_overrides() {
            return Ok(base);
        }

        let mut builder = ProfileBuilder::from_config(base);
        if let Some(eps) = self.eps {
            builder = builder.eps(eps);
        }
        if let Some(min_points) = self.min_points {
            builder = builder.min_points(min_points);
        }
        if let Some(threshold) = self.anomaly_threshold {
            builder = builder.anomaly_threshold(threshold);
        }
        if let Some(channel) = self.channel {
            builder = builder.pattern_channel(channel);
        }
        for &analyzer in &self.disable {
            builder = builder.disable_analyzer(analyzer);
        }
        if let Some(sensitivity) = self.sensitivity {
            builder = builder.global_sensitivity(sensitivity);
        }
        if let Some(min_confidence) = self.min_confidence {
            builder = builder.min_confidence(min_confidence);
        }

        let profile = builder.build();
        profile.validate().context("Invalid profile overrides")?;
        Ok(profile)
    }
}

/// Print available profiles
pub fn print_profiles() {
    println!("Available survey profiles:\n");

    for preset in ProfilePreset::all() {
        let config = ProfileConfig::from_preset(preset);
        println!("  {} - {}", config.name, config.description);
        println!(
            "    Clustering: eps {:.2}, min points {}",
            config.clustering.eps, config.clustering.min_points
        );
        println!(
            "    Inclusions: threshold {:.2}, merge radius {:.1} m, size {:.1}-{:.1} m",
            config.inclusions.anomaly_threshold,
            config.inclusions.merge_radius,
            config.inclusions.min_inclusion_size,
            config.inclusions.max_inclusion_size
        );
        println!(
            "    Sensitivity: {:.1}x, min confidence {:.0}%",
            config.global_sensitivity,
            config.min_confidence * 100.0
        );

        let mut modified: Vec<_> = config
            .analyzer_modifiers
            .iter()
            .map(|(a, m)| format!("{}:{:.1}x", a.name(), m.multiplier))
            .collect();
        modified.sort();
        if !modified.is_empty() {
            println!("    Modifiers: {}", modified.join(", "));
        }

        println!();
    }
}
