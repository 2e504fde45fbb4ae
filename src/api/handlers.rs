/// API request handlers
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::api::types::ApiResponse;
use crate::api::types::AssistantRequest;
use crate::api::types::AssistantResponse;
use crate::api::types::HealthResponse;
use crate::api::types::InferenceProbeResponse;
use crate::api::types::ProbeResult;
use crate::api::types::StatsResponse;
use crate::api::types::UpsertKnowledgeRequest;
use crate::api::types::UpsertKnowledgeResponse;
use crate::assistant::AssistantService;
use crate::inference::InferenceClient;
use crate::inference::TextEmbedder;
use crate::models::KnowledgeDocument;
use crate::store::KnowledgeStore;
use crate::RaglineError;

/// Shared application state.
///
/// `store` is `None` when the startup connection failed; upsert and
/// stats then answer 503 while the assistant endpoint keeps working
/// without retrieval.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<AssistantService>,
    pub store: Option<Arc<KnowledgeStore>>,
    pub inference: Arc<InferenceClient>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Assistant message handler (POST /api/assistant).
///
/// Validates the message before any provider call; upstream failures are
/// absorbed inside the orchestrator, so this endpoint answers 200 even
/// when providers are down.
pub async fn assistant(
    State(state): State<AppState>,
    Json(req): Json<AssistantRequest>,
) -> Response {
    let Some(message) = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "message is required");
    };

    info!("POST /api/assistant: length={} useRag={}", message.len(), req.use_rag);

    let reply = state.assistant.respond(message, req.use_rag).await;
    Json(ApiResponse::success(AssistantResponse {
        reply: reply.reply,
        sources: reply.sources,
    }))
    .into_response()
}

/// Knowledge upsert handler (POST /api/assistant/knowledge).
///
/// Embeds `"{question}\n{answer}"` and upserts by question. 503 when the
/// store never connected, 500 for provider or store failures.
pub async fn upsert_knowledge(
    State(state): State<AppState>,
    Json(req): Json<UpsertKnowledgeRequest>,
) -> Response {
    let (Some(question), Some(answer)) = (
        req.question.as_deref().filter(|q| !q.trim().is_empty()),
        req.answer.as_deref().filter(|a| !a.trim().is_empty()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "question and answer are required");
    };

    info!("POST /api/assistant/knowledge: {question}");

    let Some(store) = &state.store else {
        warn!("knowledge upsert rejected, store not connected");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            RaglineError::StoreUnavailable.to_string(),
        );
    };

    let embedding = match state.inference.embed(&format!("{question}\n{answer}")).await {
        Ok(v) => v,
        Err(e) => {
            error!("Embedding failed during upsert: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let doc = KnowledgeDocument {
        question: question.to_string(),
        answer: answer.to_string(),
        comment: req.comment,
        embedding,
    };

    match store.upsert(&doc).await {
        Ok(()) => Json(ApiResponse::success(UpsertKnowledgeResponse { ok: true })).into_response(),
        Err(e) => {
            error!("Knowledge upsert failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Corpus statistics handler (GET /api/stats)
pub async fn stats(State(state): State<AppState>) -> Response {
    info!("GET /api/stats");

    let Some(store) = &state.store else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            RaglineError::StoreUnavailable.to_string(),
        );
    };

    let total_documents = store.count().await.unwrap_or(0);
    let documents_with_embeddings = store.count_embedded().await.unwrap_or(0);
    let last_updated = store.last_updated().await.unwrap_or(None);

    Json(ApiResponse::success(StatsResponse {
        total_documents,
        documents_with_embeddings,
        last_updated,
    }))
    .into_response()
}

/// Provider diagnostics handler (GET /api/debug/inference).
///
/// Fires one tiny generation and one tiny embedding so a misconfigured
/// key or model shows up here instead of in user traffic.
pub async fn debug_inference(State(state): State<AppState>) -> Json<ApiResponse<InferenceProbeResponse>> {
    info!("GET /api/debug/inference");

    let text_generation = match state.inference.generate_with_limit("Say hello!", 50).await {
        Ok(text) => ProbeResult {
            model: state.inference.text_model().to_string(),
            success: true,
            response: Some(text),
            dimensionality: None,
            error: None,
        },
        Err(e) => ProbeResult {
            model: state.inference.text_model().to_string(),
            success: false,
            response: None,
            dimensionality: None,
            error: Some(e.to_string()),
        },
    };

    let embeddings = match state.inference.embed("Test embedding").await {
        Ok(v) => ProbeResult {
            model: state.inference.embedding_model().to_string(),
            success: true,
            response: None,
            dimensionality: Some(v.len()),
            error: None,
        },
        Err(e) => ProbeResult {
            model: state.inference.embedding_model().to_string(),
            success: false,
            response: None,
            dimensionality: None,
            error: Some(e.to_string()),
        },
    };

    Json(ApiResponse::success(InferenceProbeResponse {
        text_generation,
        embeddings,
    }))
}
