use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use mousedeck_core::{MouseId, MousePatch};

use crate::app::dto::{
    CreateMouseRequest, DeleteGeneratedResponse, DeleteMouseResponse, ListMiceParams,
};
use crate::app::errors;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_mice).post(create_mouse))
        .route("/generated", delete(delete_generated))
        .route("/:id", get(get_mouse).patch(update_mouse).delete(delete_mouse))
}

/// GET /api/mice
///
/// Plain array unless `page`/`pageSize`/`limit` is given.
pub async fn list_mice(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<ListMiceParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.list_mice(&query).await {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_mouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_mouse(id).await {
        Ok(mouse) => Json(mouse).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_mouse(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateMouseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let new = match body.into_new_mouse() {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_mouse(new).await {
        Ok(mouse) => (StatusCode::CREATED, Json(mouse)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_mouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<MousePatch>, JsonRejection>,
) -> axum::response::Response {
    let id: MouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(patch) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    if let Err(e) = patch.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.update_mouse(id, patch).await {
        Ok(mouse) => Json(mouse).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn delete_mouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MouseId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_mouse(id).await {
        Ok(mouse) => Json(DeleteMouseResponse {
            message: "Mouse deleted successfully".to_string(),
            mouse,
        })
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// DELETE /api/mice/generated
///
/// Admin cleanup of synthetic records. Emits one `DELETED_MOUSE` per record.
pub async fn delete_generated(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.delete_generated().await {
        Ok(removed) => Json(DeleteGeneratedResponse {
            message: format!("Deleted {} generated mice", removed.len()),
            deleted_count: removed.len(),
        })
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}
