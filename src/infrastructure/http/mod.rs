use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{audio::AudioController, health::HealthController};
use crate::infrastructure::config::Config;

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    health_controller: Arc<HealthController>,
    audio_controller: Arc<AudioController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let health_routes = Router::new()
        .route("/health", get(HealthController::health))
        .route("/health/ready", get(HealthController::health_ready))
        .with_state(health_controller);

    let audio_routes = Router::new()
        .route("/api/audio/generate", post(AudioController::generate))
        .with_state(audio_controller);

    let app = Router::new()
        .merge(health_routes)
        .merge(audio_routes)
        .layer(TraceLayer::new_for_http());

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
