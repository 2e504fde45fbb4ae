use serde::Deserialize;
use serde::Serialize;

/// A curated question/answer pair stored in the knowledge corpus.
///
/// `question` is the natural primary key: upserting a document with an
/// existing question replaces the stored answer, comment and embedding.
/// Embedding dimensionality is whatever the embedding model produced at
/// write time; it is deliberately not validated on write, so rows written
/// under different models can coexist (the scan tier drops mismatches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub embedding: Vec<f32>,
}

/// Typed projection of a stored document used by the local-scan tier.
///
/// Decoded at the store boundary so the scan works on known fields
/// instead of raw rows.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub question: String,
    pub answer: String,
    pub comment: Option<String>,
    pub embedding: Vec<f32>,
}

/// A retrieval result: document projection plus a similarity score.
///
/// The score is cosine-flavored (roughly [-1, 1]) when produced by the
/// local scan, or the engine-side relevance score from an index query.
/// Scores are only comparable within a single search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub score: f32,
}
