//! HTTP client for a hosted text-completion endpoint
//!
//! Speaks the inference-API shape: POST `{inputs, parameters}` with a
//! bearer token, 200 returns a JSON array of `{generated_text}` chunks.

use super::{ReasoningBackend, ReasoningError};
use async_trait::async_trait;
use serde::Deserialize;

/// Default generation length cap (tokens).
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default request timeout (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct GeneratedChunk {
    generated_text: String,
}

/// HTTP-backed [`ReasoningBackend`].
#[derive(Clone)]
pub struct HttpReasoningClient {
    http: reqwest::Client,
    endpoint_url: String,
    api_token: String,
    max_new_tokens: u32,
    temperature: f64,
}

impl HttpReasoningClient {
    /// Create a client for the given endpoint and bearer token.
    pub fn new(endpoint_url: &str, api_token: &str) -> Result<Self, ReasoningError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Override the generation length cap.
    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ReasoningBackend for HttpReasoningClient {
    async fn generate(&self, prompt: &str) -> Result<String, ReasoningError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": self.temperature,
            },
        });

        let resp = self
            .http
            .post(&self.endpoint_url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReasoningError::Status(status));
        }

        let chunks: Vec<GeneratedChunk> = resp.json().await?;
        chunks
            .into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or(ReasoningError::EmptyResponse)
    }

    fn backend_name(&self) -> &'static str {
        "inference-http"
    }
}
