use std::sync::Arc;

use axum::{extract::Extension, Json};

use crate::app::dto::HealthResponse;
use crate::app::services::AppServices;

/// Liveness probe. `HEAD` is answered by axum on the same route.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        push_connections: services.registry().len(),
    })
}
