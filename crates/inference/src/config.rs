use crate::backend::ExecutionProvider;
use std::path::PathBuf;

pub const DEFAULT_INPUT_SIZE: u32 = 416;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    /// Square model input resolution; also used for warm-up.
    pub input_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
}

impl EngineConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            execution_provider: ExecutionProvider::Cpu,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("models/posture_detection.onnx")
    }
}
