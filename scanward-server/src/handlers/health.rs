use axum::Json;
use scanward_model::HealthResponse;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
