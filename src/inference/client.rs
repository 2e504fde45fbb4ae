//! HTTP client for the hosted inference provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::inference::TextEmbedder;
use crate::inference::TextGenerator;
use crate::RaglineError;
use crate::Result;

const GENERATION_TEMPERATURE: f32 = 0.7;

/// Client for the hosted embedding and text-generation endpoints.
///
/// Implements both provider traits over a single HTTP connection pool.
#[derive(Debug)]
pub struct InferenceClient {
    client: Client,
    endpoint: String,
    api_key: String,
    text_model: String,
    embedding_model: String,
    max_tokens: u32,
}

impl InferenceClient {
    /// Build a client from configuration.
    ///
    /// A missing or placeholder API key is a configuration error here,
    /// not at first use.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.inference_api_key();
        if api_key.is_empty() || api_key == "YOUR_API_KEY_HERE" {
            return Err(RaglineError::Config(
                "Inference API key is not set. Add it to [inference] in config.toml".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RaglineError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.inference_endpoint().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            text_model: config.text_model().to_string(),
            embedding_model: config.embedding_model().to_string(),
            max_tokens: config.max_tokens(),
        })
    }

    #[must_use]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Generate with an explicit output token bound (diagnostic probes
    /// use a small one instead of the configured limit).
    pub async fn generate_with_limit(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let url = format!("{}/v1/chat/completions", self.endpoint);
        debug!(
            "generate model={} promptLen={} maxTokens={}",
            self.text_model,
            prompt.len(),
            max_tokens
        );

        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: GENERATION_TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RaglineError::Generation(format!("text generation failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RaglineError::Generation(format!(
                "text generation failed ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| RaglineError::Generation(format!("failed to parse response: {e}")))?;

        // A choice with no content is an empty reply, not an error
        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("generate success, responseLen={}", text.len());
        Ok(text)
    }
}

/// Feature-extraction responses arrive either flat (`[f32]`) or nested
/// (`[[f32]]` for a single input) depending on the model.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

impl EmbeddingResponse {
    fn flatten(self) -> Vec<f32> {
        match self {
            Self::Flat(v) => v,
            Self::Nested(rows) => rows.into_iter().next().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl TextEmbedder for InferenceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            inputs: &'a str,
        }

        let url = format!(
            "{}/hf-inference/models/{}/pipeline/feature-extraction",
            self.endpoint, self.embedding_model
        );
        debug!(
            "embed model={} textLen={}",
            self.embedding_model,
            text.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbeddingRequest { inputs: text })
            .send()
            .await
            .map_err(|e| RaglineError::Embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RaglineError::Embedding(format!(
                "embedding request failed ({status}): {error_text}"
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RaglineError::Embedding(format!("invalid embedding response: {e}")))?;

        let embedding = result.flatten();
        if embedding.is_empty() {
            return Err(RaglineError::Embedding(
                "invalid embedding response: empty vector".to_string(),
            ));
        }

        debug!("embed success, embeddingLen={}", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl TextGenerator for InferenceClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_limit(prompt, self.max_tokens).await
    }
}
