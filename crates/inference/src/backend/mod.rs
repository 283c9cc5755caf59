use ndarray::{Array, IxDyn};
use serde::Deserialize;
use std::path::Path;

#[cfg(feature = "ort-backend")]
pub mod ort;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

/// A loaded detection model.
///
/// Implementations are not required to be re-entrant: the engine guarantees
/// `infer` is never called concurrently on the same instance.
pub trait InferenceBackend: Send {
    fn load_model(path: &Path, provider: ExecutionProvider) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run the forward pass on a `[1, 3, H, W]` normalized input.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// `[1, 4 + num_classes, anchors]` cxcywh in input pixels, or the transposed layout
    pub predictions: ndarray::ArrayD<f32>,
}
