use super::{ExecutionProvider, InferenceBackend, InferenceOutput};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::Path;

// Input name used by the Ultralytics ONNX exporter
const INPUT_NAME: &str = "images";

const INTRA_THREADS: usize = 4;

pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    fn build_session(path: &Path, provider: ExecutionProvider) -> anyhow::Result<Session> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(INTRA_THREADS)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        Ok(builder.commit_from_file(path)?)
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &Path, provider: ExecutionProvider) -> anyhow::Result<Self> {
        let session = Self::build_session(path, provider)?;
        tracing::info!(model_path = %path.display(), ?provider, "ONNX model loaded");
        Ok(Self { session })
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(images.view())?
        ])?;

        // Detection exports have a single output; segmentation heads append mask protos
        let predictions = outputs[0].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }
}
