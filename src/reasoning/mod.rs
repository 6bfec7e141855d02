//! Reasoning endpoint collaborator
//!
//! A single synchronous POST to a text-completion endpoint, with the
//! response treated as untrusted best-effort text. [`ReasoningBackend`] is
//! the seam — the worker never talks to HTTP directly, so tests substitute
//! canned backends. `prompt` composes the request, `parsing` extracts and
//! coerces the semi-structured reply.

mod client;
pub mod parsing;
pub mod prompt;

pub use client::HttpReasoningClient;
pub use parsing::{parse_prediction, ParseError, ParsedPrediction};

use async_trait::async_trait;

/// Errors from the reasoning endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("endpoint returned no generated text")]
    EmptyResponse,
}

/// Text-generation backend for delay prediction requests.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Generate a response for the prompt. The returned text carries no
    /// format guarantee — callers must parse defensively.
    async fn generate(&self, prompt: &str) -> Result<String, ReasoningError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
