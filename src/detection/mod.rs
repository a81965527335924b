//! Survey findings and verdicts

mod result;

pub use result::{
    raw_detections, Finding, RawDetection, Severity, SurveyAssessment, SurveyVerdict,
};
