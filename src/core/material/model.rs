// src/core/material/model.rs
//
// Pluggable inference backend for model-based material classification.
// The engine lives on one worker thread fed through a job channel, so a
// hung backend cannot stall the caller past the configured timeout.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::emfad::EmfadMaterial;
use super::features::FeatureVector;
use crate::core::error::{EmfError, EmfResult};

/// Inference backend seam. Implementations own whatever runtime they wrap.
pub trait InferenceEngine: Send {
    /// Load a serialized model; false when the model is rejected
    fn initialize(&mut self, model: &[u8]) -> bool;

    /// One score per model class, in `EmfadMaterial::MODEL_CLASSES` order
    fn run_inference(&mut self, features: &FeatureVector) -> EmfResult<Vec<f32>>;

    /// Release backend resources
    fn cleanup(&mut self);
}

/// Outcome of a model classification attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelClassification {
    pub material: EmfadMaterial,
    /// Top class score, or the best score seen when below threshold
    pub confidence: f64,
    pub scores: Vec<f32>,
    /// Set when inference failed; material is then Unknown with confidence 0
    pub error: Option<String>,
}

impl ModelClassification {
    fn failed(error: &EmfError) -> Self {
        Self {
            material: EmfadMaterial::Unknown,
            confidence: 0.0,
            scores: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_confident(&self) -> bool {
        self.error.is_none() && self.material != EmfadMaterial::Unknown
    }
}

struct InferenceJob {
    features: FeatureVector,
    reply: mpsc::Sender<EmfResult<Vec<f32>>>,
}

/// Model classifier wrapping an `InferenceEngine`
pub struct ModelClassifier {
    jobs: Mutex<Option<mpsc::Sender<InferenceJob>>>,
    worker: Option<JoinHandle<()>>,
    /// Jobs submitted and not yet finished by the worker
    pending: Arc<AtomicUsize>,
    /// Set when a caller gave up waiting; cleared once the worker drains
    stalled: AtomicBool,
    threshold: f64,
    timeout: Duration,
}

impl ModelClassifier {
    /// Initialize the engine with `model`. A rejected model still yields a
    /// classifier; every classification then reports a failure.
    pub fn new(mut engine: Box<dyn InferenceEngine>, model: &[u8], threshold: f64, timeout: Duration) -> Self {
        let pending = Arc::new(AtomicUsize::new(0));

        let (jobs, worker) = if engine.initialize(model) {
            debug!("Inference model loaded ({} bytes)", model.len());
            spawn_worker(engine, Arc::clone(&pending))
        } else {
            warn!("Inference model rejected ({} bytes); classification will fall back", model.len());
            (None, None)
        };

        Self {
            jobs: Mutex::new(jobs),
            worker,
            pending,
            stalled: AtomicBool::new(false),
            threshold,
            timeout,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.worker.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one feature vector. Failures never propagate: they surface
    /// as Unknown with confidence 0 and an error diagnostic.
    pub fn classify(&self, features: &FeatureVector) -> ModelClassification {
        match self.infer(*features).and_then(|scores| self.interpret(scores)) {
            Ok(classification) => classification,
            Err(e) => {
                debug!("Model classification failed: {}", e);
                ModelClassification::failed(&e)
            }
        }
    }

    fn infer(&self, features: FeatureVector) -> EmfResult<Vec<f32>> {
        if !self.is_ready() {
            return Err(EmfError::ModelRejected);
        }

        // A timed-out job still occupies the worker; refuse instead of queueing
        if self.stalled.load(Ordering::SeqCst) {
            if self.pending.load(Ordering::SeqCst) > 0 {
                return Err(EmfError::Inference("engine busy".to_string()));
            }
            self.stalled.store(false, Ordering::SeqCst);
        }

        let (reply, rx) = mpsc::channel();
        {
            let jobs = self
                .jobs
                .lock()
                .map_err(|_| EmfError::Inference("job queue poisoned".to_string()))?;
            let sender = jobs.as_ref().ok_or(EmfError::ModelRejected)?;

            self.pending.fetch_add(1, Ordering::SeqCst);
            if sender.send(InferenceJob { features, reply }).is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                return Err(EmfError::Inference("inference worker terminated".to_string()));
            }
        }

        match rx.recv_timeout(self.timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.stalled.store(true, Ordering::SeqCst);
                Err(EmfError::InferenceTimeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(EmfError::Inference("inference worker terminated".to_string()))
            }
        }
    }

    fn interpret(&self, scores: Vec<f32>) -> EmfResult<ModelClassification> {
        let (index, best) = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or(EmfError::EmptyInferenceOutput)?;

        let confidence = best as f64;
        let material = if confidence >= self.threshold {
            EmfadMaterial::from_model_index(index)
        } else {
            EmfadMaterial::Unknown
        };

        Ok(ModelClassification {
            material,
            confidence,
            scores,
            error: None,
        })
    }
}

/// Start the thread that owns the engine. It runs jobs in order and calls
/// `cleanup` once the job channel closes.
fn spawn_worker(
    mut engine: Box<dyn InferenceEngine>,
    pending: Arc<AtomicUsize>,
) -> (Option<mpsc::Sender<InferenceJob>>, Option<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel::<InferenceJob>();

    let spawned = thread::Builder::new()
        .name("emf-inference".to_string())
        .spawn(move || {
            for job in rx {
                let outcome = engine.run_inference(&job.features);
                pending.fetch_sub(1, Ordering::SeqCst);
                // Caller may have timed out already
                let _ = job.reply.send(outcome);
            }
            engine.cleanup();
        });

    match spawned {
        Ok(handle) => (Some(tx), Some(handle)),
        Err(e) => {
            warn!("Inference worker failed to start: {}", e);
            (None, None)
        }
    }
}

impl Drop for ModelClassifier {
    fn drop(&mut self) {
        // Closing the channel lets the worker clean up and exit
        let jobs = match self.jobs.get_mut() {
            Ok(jobs) => jobs.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(jobs);

        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.pending.load(Ordering::SeqCst) > 0 {
            warn!("Inference engine busy at shutdown; worker detached");
            return;
        }
        if worker.join().is_err() {
            warn!("Inference worker panicked");
        }
    }
}

impl std::fmt::Debug for ModelClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClassifier")
            .field("ready", &self.is_ready())
            .field("stalled", &self.stalled.load(Ordering::SeqCst))
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine {
        scores: Vec<f32>,
        accept: bool,
        cleaned: Arc<AtomicBool>,
    }

    impl InferenceEngine for FixedEngine {
        fn initialize(&mut self, _model: &[u8]) -> bool {
            self.accept
        }

        fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
            Ok(self.scores.clone())
        }

        fn cleanup(&mut self) {
            self.cleaned.store(true, Ordering::SeqCst);
        }
    }

    struct SlowEngine;

    impl InferenceEngine for SlowEngine {
        fn initialize(&mut self, _model: &[u8]) -> bool {
            true
        }

        fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
            thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0])
        }

        fn cleanup(&mut self) {}
    }

    fn classifier(scores: Vec<f32>, accept: bool) -> (ModelClassifier, Arc<AtomicBool>) {
        let cleaned = Arc::new(AtomicBool::new(false));
        let engine = FixedEngine {
            scores,
            accept,
            cleaned: Arc::clone(&cleaned),
        };
        (
            ModelClassifier::new(Box::new(engine), b"model", 0.7, Duration::from_secs(2)),
            cleaned,
        )
    }

    fn features() -> FeatureVector {
        FeatureVector([0.0; 32])
    }

    #[test]
    fn test_confident_top_class() {
        let mut scores = vec![0.01; 15];
        scores[3] = 0.9;
        let (model, _) = classifier(scores, true);

        let result = model.classify(&features());
        assert_eq!(result.material, EmfadMaterial::Copper);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert!(result.is_confident());
    }

    #[test]
    fn test_low_score_is_unknown_with_best_score() {
        let mut scores = vec![0.05; 15];
        scores[0] = 0.55;
        let (model, _) = classifier(scores, true);

        let result = model.classify(&features());
        assert_eq!(result.material, EmfadMaterial::Unknown);
        assert!((result.confidence - 0.55).abs() < 1e-6);
        assert!(!result.is_failure());
    }

    #[test]
    fn test_rejected_model_reports_failure() {
        let (model, _) = classifier(vec![1.0; 15], false);
        assert!(!model.is_ready());

        let result = model.classify(&features());
        assert!(result.is_failure());
        assert_eq!(result.material, EmfadMaterial::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_output_is_failure() {
        let (model, _) = classifier(Vec::new(), true);
        assert!(model.classify(&features()).is_failure());
    }

    #[test]
    fn test_timeout_is_failure() {
        let model = ModelClassifier::new(Box::new(SlowEngine), b"m", 0.7, Duration::from_millis(20));
        let result = model.classify(&features());
        assert!(result.is_failure());
        assert!(result.error.unwrap().contains("timed out"));
    }

    struct HungEngine {
        entered: Arc<AtomicUsize>,
    }

    impl InferenceEngine for HungEngine {
        fn initialize(&mut self, _model: &[u8]) -> bool {
            true
        }

        fn run_inference(&mut self, _features: &FeatureVector) -> EmfResult<Vec<f32>> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_secs(5));
            Ok(vec![1.0])
        }

        fn cleanup(&mut self) {}
    }

    #[test]
    fn test_hung_engine_is_entered_once() {
        let entered = Arc::new(AtomicUsize::new(0));
        let engine = HungEngine {
            entered: Arc::clone(&entered),
        };
        let model = ModelClassifier::new(Box::new(engine), b"m", 0.7, Duration::from_millis(20));

        let first = model.classify(&features());
        assert!(first.error.unwrap().contains("timed out"));

        for _ in 0..20 {
            let result = model.classify(&features());
            assert!(result.error.unwrap().contains("engine busy"));
        }
        thread::sleep(Duration::from_millis(50));
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recovers_after_slow_call() {
        let model = ModelClassifier::new(Box::new(SlowEngine), b"m", 0.7, Duration::from_millis(20));
        assert!(model.classify(&features()).is_failure());

        thread::sleep(Duration::from_millis(600));
        let result = model.classify(&features());
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_cleanup_on_drop() {
        let (model, cleaned) = classifier(vec![0.9], true);
        drop(model);
        assert!(cleaned.load(Ordering::SeqCst));
    }
}
