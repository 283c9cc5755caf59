use crate::arbiter::RequestArbiter;
use crate::config::GatewayConfig;
use crate::config_store::ConfigStore;
use crate::metrics::GatewayMetrics;
use inference::{InferenceBackend, InferenceEngine};
use std::sync::Arc;

/// Everything a handler needs, built once in `main`.
pub struct AppState<B: InferenceBackend> {
    pub engine: Arc<InferenceEngine<B>>,
    pub config: Arc<ConfigStore>,
    pub arbiter: RequestArbiter,
    pub metrics: Arc<GatewayMetrics>,
    /// Long-edge bound applied to incoming frames; also the model input size.
    pub image_size: u32,
    pub jpeg_quality: u8,
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(engine: InferenceEngine<B>, config: &GatewayConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(ConfigStore::new(config.service_config())),
            arbiter: RequestArbiter::new(),
            metrics: Arc::new(GatewayMetrics::new()),
            image_size: config.image_size,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

// Manual impl so `B` need not be `Clone`
impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
            arbiter: self.arbiter.clone(),
            metrics: self.metrics.clone(),
            image_size: self.image_size,
            jpeg_quality: self.jpeg_quality,
        }
    }
}
