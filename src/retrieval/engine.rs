//! Tiered retrieval engine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;

use crate::models::EmbeddedDocument;
use crate::models::SearchHit;
use crate::retrieval::similarity::cosine_similarity;
use crate::retrieval::similarity::INVALID_SIMILARITY;
use crate::Result;

/// Store-side operations the engine needs.
///
/// `ann_by_vector` with `index = None` uses whatever index the store
/// selects by default; a `Some(name)` targets that index explicitly and
/// yields zero rows when the name does not resolve.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn ann_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        index: Option<&str>,
    ) -> Result<Vec<SearchHit>>;

    /// All documents with a non-empty embedding, typed projection.
    async fn scan_with_embeddings(&self) -> Result<Vec<EmbeddedDocument>>;
}

/// One strategy in the ordered fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    PrimaryIndex,
    NamedIndex,
    LocalScan,
}

impl Tier {
    const fn name(self) -> &'static str {
        match self {
            Self::PrimaryIndex => "primary index",
            Self::NamedIndex => "named index",
            Self::LocalScan => "local scan",
        }
    }
}

const TIER_ORDER: [Tier; 3] = [Tier::PrimaryIndex, Tier::NamedIndex, Tier::LocalScan];

/// Similarity search over the knowledge corpus with tiered fallback.
pub struct RetrievalEngine {
    store: Arc<dyn VectorSearch>,
    fallback_index: String,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn VectorSearch>, fallback_index: impl Into<String>) -> Self {
        Self {
            store,
            fallback_index: fallback_index.into(),
        }
    }

    /// Return the top `k` most similar documents, descending by score.
    ///
    /// Tiers are tried in order; an erroring tier is logged and skipped,
    /// an empty tier falls through. Exhausting every tier yields an empty
    /// vec, never an error.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        for tier in TIER_ORDER {
            match self.run_tier(tier, query, k).await {
                Ok(hits) if !hits.is_empty() => {
                    debug!("{} returned {} rows", tier.name(), hits.len());
                    return Ok(hits);
                }
                Ok(_) => {
                    debug!("{} returned no rows, trying next tier", tier.name());
                }
                Err(e) => {
                    warn!("{} failed, trying next tier: {}", tier.name(), e);
                }
            }
        }

        warn!("all retrieval tiers exhausted, returning empty result");
        Ok(Vec::new())
    }

    async fn run_tier(&self, tier: Tier, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        match tier {
            Tier::PrimaryIndex => self.store.ann_by_vector(query, k, None).await,
            Tier::NamedIndex => {
                self.store
                    .ann_by_vector(query, k, Some(&self.fallback_index))
                    .await
            }
            Tier::LocalScan => self.local_scan(query, k).await,
        }
    }

    /// Brute-force cosine scan over every stored embedding. Documents
    /// whose embedding fails the shape check score [`INVALID_SIMILARITY`]
    /// and are dropped before sorting.
    async fn local_scan(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let docs = self.store.scan_with_embeddings().await?;
        debug!("local scan over {} documents", docs.len());

        let mut hits: Vec<SearchHit> = docs
            .into_iter()
            .filter_map(|doc| {
                let score = cosine_similarity(query, &doc.embedding);
                if score <= INVALID_SIMILARITY {
                    return None;
                }
                Some(SearchHit {
                    question: doc.question,
                    answer: doc.answer,
                    comment: doc.comment,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }
}
