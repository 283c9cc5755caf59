pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{ExecutionProvider, InferenceBackend, InferenceOutput};
pub use config::EngineConfig;
pub use engine::{InferenceEngine, ModelStatus};
pub use error::{FrameError, InferenceError};
pub use frame::{ColorFormat, Frame};
pub use processing::post::RawDetection;
pub use processing::resize::{ScaleFactors, resize_frame};

#[cfg(feature = "ort-backend")]
pub use backend::ort::OrtBackend;
