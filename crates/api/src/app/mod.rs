//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: repository + push notifier, the only thing handlers talk to
//! - `push.rs`: registry of connected WebSocket clients
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod push;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `server.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/ws", get(routes::ws::ws_handler))
        .nest("/api", routes::router())
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub use services::AppServices;
