//! Vector retrieval over the knowledge corpus.
//!
//! The engine runs an ordered chain of retrieval tiers against anything
//! implementing [`VectorSearch`]: the store's primary index query, the
//! same query against an explicitly named index, and finally an
//! in-process cosine scan. A tier that errors or comes back empty falls
//! through to the next one; only full exhaustion yields an empty result.

pub mod engine;
pub mod similarity;

pub use engine::RetrievalEngine;
pub use engine::VectorSearch;
pub use similarity::cosine_similarity;
pub use similarity::INVALID_SIMILARITY;
