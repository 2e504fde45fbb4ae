//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::models::SearchHit;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Assistant message request
#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_use_rag", rename = "useRag")]
    pub use_rag: bool,
}

const fn default_use_rag() -> bool {
    true
}

/// Assistant reply with retrieved sources
#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub reply: String,
    pub sources: Vec<SearchHit>,
}

/// Knowledge upsert request
#[derive(Debug, Deserialize)]
pub struct UpsertKnowledgeRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpsertKnowledgeResponse {
    pub ok: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Corpus statistics response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_documents: i64,
    pub documents_with_embeddings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

/// One provider probe from the diagnostic endpoint
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensionality: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Diagnostic response for the inference providers
#[derive(Debug, Serialize)]
pub struct InferenceProbeResponse {
    pub text_generation: ProbeResult,
    pub embeddings: ProbeResult,
}
