use crate::{
    annotate,
    codec::{self, DecodeError},
    config_store::{ConfigUpdate, ServiceConfig},
    error::{ApiError, NO_IMAGE_PROVIDED},
    mapper::{self, Detection},
    state::AppState,
    status::{self, OverallStatus},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use inference::{InferenceBackend, ModelStatus, resize_frame};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

pub const BUSY_MESSAGE: &str = "Server busy, skipping frame";

// Base64 inflates raw uploads by a third; leave room for full-resolution stills
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct DetectRequest {
    /// Any JSON value; only a missing key is a bad request, other shapes fail decoding
    image: serde_json::Value,
    #[serde(default)]
    include_image: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub detection_count: usize,
    pub overall_status: OverallStatus,
    /// Omitted when not requested, `null` on the degraded paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl DetectResponse {
    /// Well-formed empty result used when a frame is shed or there is no model.
    fn degraded(message: String) -> Self {
        Self {
            success: true,
            detections: Vec::new(),
            detection_count: 0,
            overall_status: OverallStatus::Unknown,
            processed_image: Some(None),
            message: Some(message),
            timestamp: timestamp(),
        }
    }

    fn detected(
        detections: Vec<Detection>,
        overall_status: OverallStatus,
        processed_image: Option<String>,
    ) -> Self {
        Self {
            success: true,
            detection_count: detections.len(),
            detections,
            overall_status,
            processed_image: processed_image.map(Some),
            message: None,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_status: &'static str,
    model_file_exists: bool,
    model_path: String,
    classes: Vec<String>,
    image_size: u32,
}

#[derive(Debug, Serialize)]
struct ConfigUpdated {
    success: bool,
    #[serde(flatten)]
    config: ServiceConfig,
}

#[derive(Debug, Serialize)]
struct ClassesResponse {
    classes: Vec<String>,
    class_count: usize,
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub fn build_router<B: InferenceBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/detect", post(detect::<B>))
        .route("/health", get(health::<B>))
        .route("/config", get(get_config::<B>).post(update_config::<B>))
        .route("/classes", get(classes::<B>))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

async fn detect<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    body: Bytes,
) -> Result<Json<DetectResponse>, ApiError> {
    // Admission comes first: a shed frame is never parsed or decoded
    let Some(guard) = state.arbiter.try_acquire() else {
        tracing::debug!("Detection in flight, skipping frame");
        state.metrics.record_skipped();
        return Ok(Json(DetectResponse::degraded(BUSY_MESSAGE.to_string())));
    };

    let request: DetectRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting malformed detect request");
        state.metrics.record_request("bad_request");
        ApiError::BadRequest(NO_IMAGE_PROVIDED.to_string())
    })?;
    let config = state.config.get();

    let pipeline_state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        run_pipeline(&pipeline_state, request, config)
    })
    .await
    .map_err(ApiError::from)
    .and_then(|r| r);

    if let Err(e) = &result {
        let outcome = match e {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "error",
        };
        state.metrics.record_request(outcome);
    }

    result.map(Json)
}

/// Decode, resize, detect, map and reduce one frame. Runs on the blocking pool.
fn run_pipeline<B: InferenceBackend>(
    state: &AppState<B>,
    request: DetectRequest,
    config: ServiceConfig,
) -> Result<DetectResponse, ApiError> {
    let _s = tracing::info_span!("detect_request").entered();

    let encoded = match &request.image {
        serde_json::Value::String(s) => s.as_str(),
        other => return Err(DecodeError::NotText(json_kind(other)).into()),
    };
    let frame = codec::decode(encoded)?;
    let (original_width, original_height) = (frame.width(), frame.height());
    let (frame, scale) = resize_frame(frame, state.image_size)
        .map_err(|e| ApiError::Internal(format!("Failed to resize image: {:#}", e)))?;

    if let ModelStatus::Absent { reason } = state.engine.load_or_get() {
        tracing::warn!(%reason, "Detection requested without a model");
        state.metrics.record_request("model_absent");
        return Ok(DetectResponse::degraded(format!(
            "Model not loaded - place the model file at {}",
            state.engine.model_path().display()
        )));
    }

    let start = Instant::now();
    let raw = state
        .engine
        .detect(&frame, config.confidence_threshold, state.image_size)?;
    let elapsed = start.elapsed();

    let detections = mapper::map_to_original(&raw, scale, &config.classes);
    let overall_status = status::reduce(&detections);
    tracing::debug!(
        original_width,
        original_height,
        resized_width = frame.width(),
        resized_height = frame.height(),
        detections = detections.len(),
        status = overall_status.as_str(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Frame processed"
    );

    let processed_image = if request.include_image.unwrap_or(false) {
        let annotated = annotate::draw_detections(&frame, &raw)
            .map_err(|e| ApiError::Internal(format!("Failed to annotate image: {}", e)))?;
        Some(codec::encode_base64(&annotated, state.jpeg_quality)?)
    } else {
        None
    };

    state
        .metrics
        .record_detection(elapsed, detections.len(), overall_status);

    Ok(DetectResponse::detected(
        detections,
        overall_status,
        processed_image,
    ))
}

async fn health<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<HealthResponse> {
    let engine = &state.engine;
    Json(HealthResponse {
        status: "healthy",
        model_status: if engine.is_loaded() {
            "loaded"
        } else {
            "not loaded"
        },
        model_file_exists: engine.model_file_exists(),
        model_path: engine.model_path().display().to_string(),
        classes: state.config.get().classes,
        image_size: state.image_size,
    })
}

async fn get_config<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<ServiceConfig> {
    Json(state.config.get())
}

async fn update_config<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    body: Bytes,
) -> Result<Json<ConfigUpdated>, ApiError> {
    let update: ConfigUpdate = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))?;

    Ok(Json(ConfigUpdated {
        success: true,
        config: state.config.update(update),
    }))
}

async fn classes<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<ClassesResponse> {
    let classes = state.config.get().classes;
    Json(ClassesResponse {
        class_count: classes.len(),
        classes,
    })
}
