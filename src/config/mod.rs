//! Configuration module for emfcheckr

mod profiles;

pub use profiles::{
    AnalyzerType, ConfidenceModifier, ProfileBuilder, ProfileConfig, ProfilePreset,
};
