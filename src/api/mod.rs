//! HTTP API: a thin layer over the orchestrator and the store.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::serve_api;
