//! Hosted-model inference: embeddings and text generation.

pub mod client;

pub use client::InferenceClient;

use async_trait::async_trait;

use crate::Result;

/// Converts text into a fixed-length embedding vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Converts a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
