pub mod api;
pub mod assistant;
pub mod config;
pub mod errors;
pub mod inference;
pub mod logging;
pub mod models;
pub mod retrieval;
pub mod seed;
pub mod store;

pub use config::AppConfig;
pub use errors::*;
