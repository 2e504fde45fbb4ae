//! Cosine similarity for the local-scan retrieval tier.

/// Sentinel score for pairs that cannot be meaningfully compared:
/// mismatched lengths, empty inputs, zero norms, non-finite results.
/// Guaranteed to sort last; the scan tier drops anything at this value.
pub const INVALID_SIMILARITY: f32 = -1.0;

/// Cosine similarity between two vectors.
///
/// Returns a value in roughly [-1, 1] where 1 means identical direction,
/// or [`INVALID_SIMILARITY`] when the pair fails the shape check.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return INVALID_SIMILARITY;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return INVALID_SIMILARITY;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity
    } else {
        INVALID_SIMILARITY
    }
}
