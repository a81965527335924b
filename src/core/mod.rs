//! Core survey analysis modules

pub mod analysis;
pub mod analyzer;
pub mod distance;
pub mod error;
pub mod export;
pub mod material;
pub mod reading;
pub mod stats;
pub mod survey;

pub use analyzer::{AnalyzerBuilder, SurveyAnalyzer, SurveyReport};
pub use distance::{DataPoint, DistanceMetric, WeightedEmfDistance};
pub use error::{EmfError, EmfResult};
pub use reading::{EmfReading, SignalChannel};
pub use survey::{collect_survey_files, load_survey, parse_survey, SurveyData};
