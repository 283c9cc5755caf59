use crate::{
    backend::InferenceBackend,
    config::EngineConfig,
    error::InferenceError,
    frame::Frame,
    processing::{
        post::{PostProcessor, RawDetection},
        pre::PreProcessor,
    },
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const WARM_UP_CONFIDENCE: f32 = 0.5;

enum ModelSlot<B> {
    Loaded(B),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Loaded,
    Absent { reason: String },
}

impl ModelStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelStatus::Loaded)
    }
}

/// Owns the detection model and serializes every forward pass through it.
///
/// Letterboxing and output parsing run on the caller's thread outside the lock;
/// only the backend call and lazy loading hold it.
pub struct InferenceEngine<B: InferenceBackend> {
    config: EngineConfig,
    slot: Mutex<ModelSlot<B>>,
    loaded: AtomicBool,
    postprocessor: PostProcessor,
}

impl<B: InferenceBackend> InferenceEngine<B> {
    pub fn new(config: EngineConfig) -> Self {
        let postprocessor = PostProcessor::new(config.iou_threshold, config.max_detections);
        Self {
            config,
            slot: Mutex::new(ModelSlot::Absent),
            loaded: AtomicBool::new(false),
            postprocessor,
        }
    }

    /// Engine with a backend that is already loaded.
    pub fn with_backend(config: EngineConfig, backend: B) -> Self {
        let engine = Self::new(config);
        *engine.lock_recovering() = ModelSlot::Loaded(backend);
        engine.loaded.store(true, Ordering::Release);
        engine
    }

    pub fn model_path(&self) -> &Path {
        &self.config.model_path
    }

    pub fn model_file_exists(&self) -> bool {
        self.config.model_path.is_file()
    }

    /// Whether a model is resident. Never waits on an in-flight inference.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Return the resident model, loading it from the configured path first if needed.
    ///
    /// Runs under the inference lock, so concurrent first calls load exactly once.
    /// A missing or unloadable artifact is reported as [`ModelStatus::Absent`] and
    /// retried on the next call.
    pub fn load_or_get(&self) -> ModelStatus {
        let mut slot = self.lock_recovering();

        if let ModelSlot::Loaded(_) = *slot {
            return ModelStatus::Loaded;
        }

        let path = &self.config.model_path;
        if !self.model_file_exists() {
            tracing::warn!(model_path = %path.display(), "Model file not found");
            return ModelStatus::Absent {
                reason: format!("Model file not found at {}", path.display()),
            };
        }

        tracing::info!(model_path = %path.display(), "Loading model");
        let start = Instant::now();

        match B::load_model(path, self.config.execution_provider) {
            Ok(backend) => {
                *slot = ModelSlot::Loaded(backend);
                self.loaded.store(true, Ordering::Release);
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model loaded successfully"
                );
                ModelStatus::Loaded
            }
            Err(e) => {
                tracing::error!(model_path = %path.display(), error = %e, "Failed to load model");
                ModelStatus::Absent {
                    reason: format!("Failed to load model from {}: {}", path.display(), e),
                }
            }
        }
    }

    /// Run one throwaway inference on a black frame to pay first-call costs
    /// outside the request path. Failures are logged and ignored.
    pub fn warm_up(&self) {
        if !self.is_loaded() {
            tracing::debug!("Skipping warm-up, no model loaded");
            return;
        }

        let size = self.config.input_size;
        tracing::info!(input_size = size, "Warming up model (first inference is slow)");
        let start = Instant::now();

        match self.detect(&Frame::blank(size, size), WARM_UP_CONFIDENCE, size) {
            Ok(_) => tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model warm-up complete"
            ),
            Err(e) => tracing::warn!(error = %e, "Model warm-up failed, continuing"),
        }
    }

    /// Detect objects in `frame`, returning boxes in `frame`'s own pixel space.
    ///
    /// The frame is letterboxed to `input_size` for the model. Candidates scoring
    /// below `confidence_threshold` are dropped before NMS.
    pub fn detect(
        &self,
        frame: &Frame,
        confidence_threshold: f32,
        input_size: u32,
    ) -> Result<Vec<RawDetection>, InferenceError> {
        let _s = tracing::debug_span!(
            "engine_detect",
            width = frame.width(),
            height = frame.height()
        )
        .entered();

        let (input, letterbox) = PreProcessor::new(input_size)
            .preprocess(frame)
            .map_err(InferenceError::Preprocess)?;

        let output = {
            let mut slot = self.slot.lock().map_err(|_| {
                self.slot.clear_poison();
                InferenceError::LockPoisoned
            })?;
            let backend = match &mut *slot {
                ModelSlot::Loaded(backend) => backend,
                ModelSlot::Absent => return Err(InferenceError::ModelNotLoaded),
            };

            let _infer_span = tracing::info_span!("model_inference").entered();
            backend.infer(&input).map_err(InferenceError::Backend)?
        };

        self.postprocessor
            .parse_detections(&output.predictions.view(), confidence_threshold, &letterbox)
            .map_err(InferenceError::Postprocess)
    }

    fn lock_recovering(&self) -> MutexGuard<'_, ModelSlot<B>> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering model lock after a panicked inference");
            self.slot.clear_poison();
            poisoned.into_inner()
        })
    }
}
