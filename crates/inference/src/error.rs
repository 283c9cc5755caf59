use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Buffer size mismatch: expected {expected} bytes for {width}x{height}, got {actual} bytes")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Model lock poisoned by a panicked inference")]
    LockPoisoned,

    #[error("Preprocessing failed: {0:#}")]
    Preprocess(anyhow::Error),

    #[error("Inference failed: {0:#}")]
    Backend(anyhow::Error),

    #[error("Postprocessing failed: {0:#}")]
    Postprocess(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_names_both_sizes() {
        let err = FrameError::SizeMismatch {
            width: 10,
            height: 10,
            expected: 300,
            actual: 200,
        };
        assert_eq!(
            err.to_string(),
            "Buffer size mismatch: expected 300 bytes for 10x10, got 200 bytes"
        );
    }

    #[test]
    fn backend_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("session closed").context("run failed");
        let err = InferenceError::Backend(cause);
        assert_eq!(err.to_string(), "Inference failed: run failed: session closed");
    }
}
