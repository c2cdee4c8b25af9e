//! HTTP API: catalog REST endpoints and the WebSocket push channel.

pub mod app;
pub mod config;
pub mod server;
