//! Assistant orchestration: embed, retrieve, decide, generate.
//!
//! One-shot sequential flow per incoming message. Every upstream failure
//! is caught exactly once and converted into a degraded reply: a failed
//! embedding disables retrieval for the request, a failed retrieval
//! yields an empty context, a failed generation substitutes a fixed
//! unavailability message. The caller always gets a reply.

use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::inference::TextEmbedder;
use crate::inference::TextGenerator;
use crate::models::SearchHit;
use crate::retrieval::RetrievalEngine;

/// User-facing text substituted when the generation provider fails.
pub const FALLBACK_REPLY: &str =
    "Sorry — the assistant is temporarily unavailable. Try again later.";

const PROMPT_PREAMBLE: &str = "You are a helpful assistant. Use the context when available.";
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Generated (or verbatim) reply plus the retrieved sources.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub reply: String,
    pub sources: Vec<SearchHit>,
}

/// Orchestrates providers and the retrieval engine for one message at a
/// time. `engine` is `None` when the store was unreachable at startup,
/// which silently disables retrieval.
pub struct AssistantService {
    embedder: Arc<dyn TextEmbedder>,
    generator: Arc<dyn TextGenerator>,
    engine: Option<Arc<RetrievalEngine>>,
    retrieval: RetrievalConfig,
}

impl AssistantService {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn TextGenerator>,
        engine: Option<Arc<RetrievalEngine>>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            engine,
            retrieval,
        }
    }

    /// Produce a reply for `message`.
    ///
    /// Retrieval happens only when requested, the embedding succeeded and
    /// the store is available. A top hit at or above the verbatim
    /// threshold short-circuits generation and returns the stored answer
    /// unchanged (NaN scores never pass the comparison).
    pub async fn respond(&self, message: &str, use_rag: bool) -> AssistantReply {
        info!("Processing message: length={} useRag={}", message.len(), use_rag);

        let query = match self.embedder.embed(message).await {
            Ok(v) => {
                debug!("embedding success, length={}", v.len());
                v
            }
            Err(e) => {
                warn!("Embedding failed, continuing without retrieval: {e}");
                Vec::new()
            }
        };

        let sources = self.retrieve(&query, use_rag).await;

        if let Some(top) = sources.first() {
            if top.score >= self.retrieval.verbatim_threshold {
                debug!(
                    "high-confidence match (score={:.3}), returning stored answer verbatim",
                    top.score
                );
                return AssistantReply {
                    reply: top.answer.clone(),
                    sources,
                };
            }
        }

        let prompt = compose_prompt(&sources, message);
        let reply = match self.generator.generate(&prompt).await {
            Ok(text) => {
                debug!("generation success, length={}", text.len());
                text
            }
            Err(e) => {
                error!("Text generation failed: {e}");
                FALLBACK_REPLY.to_string()
            }
        };

        AssistantReply { reply, sources }
    }

    async fn retrieve(&self, query: &[f32], use_rag: bool) -> Vec<SearchHit> {
        if !use_rag || query.is_empty() {
            debug!("skipping retrieval (useRag={use_rag}, embeddingLen={})", query.len());
            return Vec::new();
        }
        let Some(engine) = &self.engine else {
            debug!("skipping retrieval, store not connected");
            return Vec::new();
        };

        match engine.search(query, self.retrieval.top_k).await {
            Ok(hits) => {
                debug!("retrieved {} sources", hits.len());
                hits
            }
            Err(e) => {
                warn!("Retrieval failed, continuing without context: {e}");
                Vec::new()
            }
        }
    }
}

/// Fixed instruction preamble, a context block of retrieved pairs and
/// the user's message.
#[must_use]
pub fn compose_prompt(sources: &[SearchHit], message: &str) -> String {
    let context = sources
        .iter()
        .map(|hit| format!("Q: {}\nA: {}", hit.question, hit.answer))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!("{PROMPT_PREAMBLE}\n\nContext:\n{context}\n\nUser: {message}\nAssistant:")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::EmbeddedDocument;
    use crate::retrieval::VectorSearch;
    use crate::RaglineError;
    use crate::Result;

    struct MockEmbedder {
        result: Option<Vec<f32>>,
    }

    #[async_trait]
    impl TextEmbedder for MockEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.result
                .clone()
                .ok_or_else(|| RaglineError::Embedding("provider down".to_string()))
        }
    }

    struct MockGenerator {
        reply: Option<String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockGenerator {
        fn succeeding(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| RaglineError::Generation("provider down".to_string()))
        }
    }

    /// Store whose primary tier always returns the given hits.
    struct FixedStore {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl VectorSearch for FixedStore {
        async fn ann_by_vector(
            &self,
            _vector: &[f32],
            k: usize,
            index: Option<&str>,
        ) -> Result<Vec<SearchHit>> {
            if index.is_some() {
                return Ok(Vec::new());
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        async fn scan_with_embeddings(&self) -> Result<Vec<EmbeddedDocument>> {
            Ok(Vec::new())
        }
    }

    fn hit(question: &str, answer: &str, score: f32) -> SearchHit {
        SearchHit {
            question: question.to_string(),
            answer: answer.to_string(),
            comment: None,
            score,
        }
    }

    fn service_with(
        embedder: MockEmbedder,
        generator: Arc<MockGenerator>,
        hits: Vec<SearchHit>,
    ) -> AssistantService {
        let engine = Arc::new(RetrievalEngine::new(
            Arc::new(FixedStore { hits }),
            "default",
        ));
        AssistantService::new(
            Arc::new(embedder),
            generator,
            Some(engine),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_generation_only() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = service_with(
            MockEmbedder { result: None },
            generator.clone(),
            vec![hit("q", "a", 0.99)],
        );

        let reply = service.respond("hello", true).await;
        assert_eq!(reply.reply, "generated");
        assert!(reply.sources.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_high_confidence_hit_returns_stored_answer_verbatim() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = service_with(
            MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            },
            generator.clone(),
            vec![hit("q1", "the canned answer", 0.82), hit("q2", "other", 0.4)],
        );

        let reply = service.respond("hello", true).await;
        assert_eq!(reply.reply, "the canned answer");
        assert_eq!(reply.sources.len(), 2);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_confidence_hit_goes_through_generation_with_context() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = service_with(
            MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            },
            generator.clone(),
            vec![hit("what is ragline", "an assistant backend", 0.5)],
        );

        let reply = service.respond("tell me", true).await;
        assert_eq!(reply.reply, "generated");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Q: what is ragline\nA: an assistant backend"));
        assert!(prompt.contains("User: tell me"));
    }

    #[tokio::test]
    async fn test_nan_score_never_passes_threshold() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = service_with(
            MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            },
            generator.clone(),
            vec![hit("q", "a", f32::NAN)],
        );

        let reply = service.respond("hello", true).await;
        assert_eq!(reply.reply, "generated");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_substitutes_fallback_reply() {
        let generator = Arc::new(MockGenerator::failing());
        let service = service_with(
            MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            },
            generator,
            Vec::new(),
        );

        let reply = service.respond("hello", true).await;
        assert_eq!(reply.reply, FALLBACK_REPLY);
        assert!(reply.sources.is_empty());
    }

    #[tokio::test]
    async fn test_rag_disabled_skips_retrieval() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = service_with(
            MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            },
            generator.clone(),
            vec![hit("q", "a", 0.99)],
        );

        let reply = service.respond("hello", false).await;
        assert_eq!(reply.reply, "generated");
        assert!(reply.sources.is_empty());
    }

    #[tokio::test]
    async fn test_missing_store_disables_retrieval() {
        let generator = Arc::new(MockGenerator::succeeding("generated"));
        let service = AssistantService::new(
            Arc::new(MockEmbedder {
                result: Some(vec![1.0, 0.0]),
            }),
            generator.clone(),
            None,
            RetrievalConfig::default(),
        );

        let reply = service.respond("hello", true).await;
        assert_eq!(reply.reply, "generated");
        assert!(reply.sources.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_compose_prompt_shape() {
        let sources = vec![hit("q1", "a1", 0.5), hit("q2", "a2", 0.3)];
        let prompt = compose_prompt(&sources, "the question");

        assert!(prompt.starts_with(PROMPT_PREAMBLE));
        assert!(prompt.contains("Q: q1\nA: a1\n---\nQ: q2\nA: a2"));
        assert!(prompt.ends_with("User: the question\nAssistant:"));
    }

    #[test]
    fn test_compose_prompt_without_sources_has_empty_context() {
        let prompt = compose_prompt(&[], "hi");
        assert!(prompt.contains("Context:\n\n"));
        assert!(prompt.contains("User: hi"));
    }
}
