use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::synthesis::{HealthProbe, LanguageConfig};

pub struct HealthController {
    probe: Arc<HealthProbe>,
}

impl HealthController {
    pub fn new(probe: Arc<HealthProbe>) -> Self {
        Self { probe }
    }

    pub async fn health() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// GET /health/ready - readiness including the synthesis endpoint probe
    pub async fn health_ready(
        State(controller): State<Arc<HealthController>>,
    ) -> impl IntoResponse {
        let status = controller.probe.is_healthy(&LanguageConfig::default()).await;
        if status.healthy {
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ready",
                    "synthesis": "available"
                })),
            )
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "synthesis": "unavailable",
                    "message": status.message
                })),
            )
        }
    }
}
