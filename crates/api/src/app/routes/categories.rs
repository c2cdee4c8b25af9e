use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use mousedeck_core::{CategoryId, CategoryPatch};

use crate::app::dto::{CreateCategoryRequest, MessageResponse};
use crate::app::errors;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
        .route("/:id/mice", get(mice_in_category))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_category(id).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let new = match body.into_new_category() {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_category(new).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<CategoryPatch>, JsonRejection>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
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

    match services.update_category(id, patch).await {
        Ok(category) => Json(category).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_category(id).await {
        Ok(()) => Json(MessageResponse {
            message: "Category deleted successfully".to_string(),
        })
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn mice_in_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.mice_in_category(id).await {
        Ok(mice) => Json(mice).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}
