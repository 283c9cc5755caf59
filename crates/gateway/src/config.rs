use crate::config_store::ServiceConfig;
pub use common::{Environment, LogLevel};
use inference::{EngineConfig, ExecutionProvider};
use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "POSTURE";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_MODEL_PATH: &str = "models/posture_detection.onnx";
pub const DEFAULT_IMAGE_SIZE: u32 = 416;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_CLASSES: [&str; 2] = ["Bad Sitting Posture", "Good Sitting Posture"];

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub log_level: LogLevel,
    pub bind_addr: String,
    pub model_path: PathBuf,
    /// Long-edge bound for incoming frames and the square model input size.
    pub image_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub classes: Vec<String>,
    pub execution_provider: ExecutionProvider,
    pub warm_up: bool,
    pub jpeg_quality: u8,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            log_level: LogLevel::Info,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            image_size: DEFAULT_IMAGE_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: inference::config::DEFAULT_IOU_THRESHOLD,
            max_detections: inference::config::DEFAULT_MAX_DETECTIONS,
            classes: DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            execution_provider: ExecutionProvider::Cpu,
            warm_up: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            otel_endpoint: None,
        }
    }
}

impl GatewayConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            model_path: self.model_path.clone(),
            input_size: self.image_size,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            execution_provider: self.execution_provider,
        }
    }

    /// Initial contents of the runtime-mutable configuration.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            confidence_threshold: self.confidence_threshold,
            classes: self.classes.clone(),
        }
    }
}

/// Load configuration from `POSTURE_*` environment variables on top of the defaults.
pub fn get_configuration() -> Result<GatewayConfig, config::ConfigError> {
    load(env_source())
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("classes")
}

fn load(source: config::Environment) -> Result<GatewayConfig, config::ConfigError> {
    let defaults = GatewayConfig::default();

    let config = config::Config::builder()
        .set_default("environment", defaults.environment.as_str())?
        .set_default("log_level", defaults.log_level.as_str())?
        .set_default("bind_addr", defaults.bind_addr)?
        .set_default("model_path", DEFAULT_MODEL_PATH)?
        .set_default("image_size", defaults.image_size as i64)?
        .set_default("confidence_threshold", defaults.confidence_threshold as f64)?
        .set_default("iou_threshold", defaults.iou_threshold as f64)?
        .set_default("max_detections", defaults.max_detections as i64)?
        .set_default("classes", defaults.classes)?
        .set_default("execution_provider", "cpu")?
        .set_default("warm_up", defaults.warm_up)?
        .set_default("jpeg_quality", defaults.jpeg_quality as i64)?
        .add_source(source)
        .build()?;

    let mut config: GatewayConfig = config.try_deserialize()?;

    config.classes = config
        .classes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if config.image_size == 0 {
        return Err(config::ConfigError::Message(
            "image_size must be positive".to_string(),
        ));
    }

    Ok(config)
}
