use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaglineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Knowledge store not connected")]
    StoreUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RaglineError>;
