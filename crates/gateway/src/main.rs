use common::{TelemetryGuard, setup_logging};
use inference::{InferenceEngine, OrtBackend};
use posture_gateway::{AppState, build_router, config::get_configuration};

const SERVICE_NAME: &str = "posture-gateway";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = match &config.otel_endpoint {
        Some(endpoint) => Some(TelemetryGuard::init(
            SERVICE_NAME,
            endpoint,
            config.environment,
            config.log_level,
        )?),
        None => {
            setup_logging(config.log_level, config.environment);
            None
        }
    };

    tracing::info!(
        environment = config.environment.as_str(),
        model_path = %config.model_path.display(),
        classes = ?config.classes,
        image_size = config.image_size,
        execution_provider = ?config.execution_provider,
        "Posture detection gateway starting"
    );

    let engine = InferenceEngine::<OrtBackend>::new(config.engine_config());
    if !engine.model_file_exists() {
        tracing::warn!(
            model_path = %config.model_path.display(),
            "Model file missing, detection is disabled until it is provided"
        );
    }

    let state = AppState::new(engine, &config);

    // Load and warm up before accepting traffic
    let engine = state.engine.clone();
    let warm_up = config.warm_up;
    tokio::task::spawn_blocking(move || {
        if engine.load_or_get().is_loaded() && warm_up {
            engine.warm_up();
        }
    })
    .await?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
