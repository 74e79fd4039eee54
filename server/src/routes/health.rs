//! Health check endpoint

use axum::Json;
use serde::Serialize;

use plantvillage_infer::inference::HEALTH_STATUS;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET / and GET /health - static liveness indicator, independent of the model
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HEALTH_STATUS,
    })
}
