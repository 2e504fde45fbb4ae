//! Postgres-backed knowledge store.
//!
//! Persists the curated question/answer corpus in a single `knowledge`
//! table keyed by question, with a pgvector `embedding` column. The
//! column is deliberately unconstrained: dimensionality is whatever the
//! embedding model produced at write time, so no write-time check exists
//! and mixed corpora are representable (the scan tier drops mismatches).

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::EmbeddedDocument;
use crate::models::KnowledgeDocument;
use crate::models::SearchHit;
use crate::retrieval::VectorSearch;
use crate::Result;

/// Connection pool wrapper over the knowledge corpus.
///
/// Constructed once at startup and shared by `Arc`; there is no lazy
/// global handle. When construction fails the service keeps running with
/// retrieval and upsert disabled, and callers surface
/// [`crate::RaglineError::StoreUnavailable`] instead.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    pool: PgPool,
}

impl KnowledgeStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Validate the connection string, build the pool and ensure the
    /// schema exists.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        config.database.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .min_connections(config.min_connections())
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout()))
            .connect(config.database_url())
            .await?;

        info!(
            "Knowledge store pool configured: max_connections={}, min_connections={}",
            config.max_connections(),
            config.min_connections()
        );

        let store = Self::new(pool);
        store.init_schema(config).await?;
        Ok(store)
    }

    /// Get a reference to the underlying pool for raw queries
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `knowledge` table and, when enabled, attempt a cosine
    /// ANN index. Index creation failure is logged and non-fatal: the
    /// retrieval engine degrades to its scan tier without it.
    async fn init_schema(&self, config: &AppConfig) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS knowledge (
                question TEXT PRIMARY KEY,
                answer TEXT NOT NULL,
                comment TEXT,
                embedding VECTOR,
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        if config.vector_indexes_enabled() {
            let create_index = format!(
                "CREATE INDEX IF NOT EXISTS knowledge_embedding_idx \
                 ON knowledge USING ivfflat (embedding vector_cosine_ops) \
                 WITH (lists = {})",
                config.vector_index_lists()
            );
            if let Err(e) = sqlx::query(&create_index).execute(&self.pool).await {
                warn!("Could not create vector index (retrieval will rely on the scan tier): {e}");
            }
        }

        Ok(())
    }

    /// Insert or fully replace the document with the same question.
    pub async fn upsert(&self, doc: &KnowledgeDocument) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO knowledge (question, answer, comment, embedding, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (question) DO UPDATE SET
                answer = EXCLUDED.answer,
                comment = EXCLUDED.comment,
                embedding = EXCLUDED.embedding,
                updated_at = NOW()
            ",
        )
        .bind(&doc.question)
        .bind(&doc.answer)
        .bind(&doc.comment)
        .bind(Vector::from(doc.embedding.clone()))
        .execute(&self.pool)
        .await?;

        debug!(
            "Upserted knowledge document: {} (embedding dims={})",
            doc.question,
            doc.embedding.len()
        );
        Ok(())
    }

    pub async fn find_by_question(&self, question: &str) -> Result<Option<KnowledgeDocument>> {
        #[derive(sqlx::FromRow)]
        struct RawDocument {
            question: String,
            answer: String,
            comment: Option<String>,
            embedding: Option<Vector>,
        }

        let row = sqlx::query_as::<_, RawDocument>(
            "SELECT question, answer, comment, embedding FROM knowledge WHERE question = $1",
        )
        .bind(question)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| KnowledgeDocument {
            question: r.question,
            answer: r.answer,
            comment: r.comment,
            embedding: r.embedding.map(|v| v.to_vec()).unwrap_or_default(),
        }))
    }

    /// Total number of stored documents.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM knowledge")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of documents carrying an embedding.
    pub async fn count_embedded(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM knowledge WHERE embedding IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Most recent upsert time across the corpus.
    pub async fn last_updated(&self) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let last = sqlx::query_scalar::<_, Option<chrono::DateTime<chrono::Utc>>>(
            "SELECT MAX(updated_at) FROM knowledge",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(last)
    }
}

#[async_trait]
impl VectorSearch for KnowledgeStore {
    /// Nearest-neighbor query over the `embedding` column, projecting the
    /// document fields and `1 - (embedding <=> query)` as score.
    ///
    /// With `index = Some(name)` the name is resolved via `to_regclass`
    /// first; an unresolved name yields zero rows rather than an error,
    /// matching engines that silently ignore unknown index names.
    async fn ann_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        index: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        if let Some(name) = index {
            let resolved = sqlx::query_scalar::<_, Option<String>>("SELECT to_regclass($1)::text")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
            if resolved.is_none() {
                debug!("index name {name:?} does not resolve, returning no rows");
                return Ok(Vec::new());
            }
        }

        #[derive(sqlx::FromRow)]
        struct RawHit {
            question: String,
            answer: String,
            comment: Option<String>,
            score: f64, // distance operator returns FLOAT8
        }

        let rows = sqlx::query_as::<_, RawHit>(
            r"
            SELECT
                question,
                answer,
                comment,
                1 - (embedding <=> $1) as score
            FROM knowledge
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1
            LIMIT $2
            ",
        )
        .bind(Vector::from(vector.to_vec()))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SearchHit {
                question: r.question,
                answer: r.answer,
                comment: r.comment,
                score: r.score as f32,
            })
            .collect())
    }

    async fn scan_with_embeddings(&self) -> Result<Vec<EmbeddedDocument>> {
        #[derive(sqlx::FromRow)]
        struct RawDocument {
            question: String,
            answer: String,
            comment: Option<String>,
            embedding: Vector,
        }

        let rows = sqlx::query_as::<_, RawDocument>(
            "SELECT question, answer, comment, embedding FROM knowledge \
             WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| EmbeddedDocument {
                question: r.question,
                answer: r.answer,
                comment: r.comment,
                embedding: r.embedding.to_vec(),
            })
            .collect())
    }
}
