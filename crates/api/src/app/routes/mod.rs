use axum::{routing::get, Router};

pub mod categories;
pub mod mice;
pub mod system;
pub mod ws;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/mice", mice::router())
        .nest("/categories", categories::router())
}

/// Parse a numeric path segment.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = mousedeck_core::DomainError>,
{
    raw.parse::<T>()
        .map_err(crate::app::errors::domain_error_to_response)
}
