// src/core/error.rs
//
// Error type shared by the analysis core.

use std::time::Duration;
use thiserror::Error;

/// Errors raised inside the analysis core.
///
/// Most analyzers are total over finite inputs and never return these; they
/// surface from the inference seam, the JSON export helpers and profile
/// loading.
#[derive(Debug, Error)]
pub enum EmfError {
    #[error("inference engine rejected the model")]
    ModelRejected,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("inference timed out after {0:?}")]
    InferenceTimeout(Duration),

    #[error("inference returned an empty output vector")]
    EmptyInferenceOutput,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EmfResult<T> = Result<T, EmfError>;
