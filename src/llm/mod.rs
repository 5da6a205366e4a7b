//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Every call here is schema-constrained: the caller supplies a JSON Schema
//! and gets back the parsed JSON value the model produced. Typed decoding and
//! bounds checks belong to `crate::classify`.

pub mod providers;

use serde_json::Value;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned malformed output: {0}")]
    Malformed(String),
}

// ── Request ───────────────────────────────────────────────────────────────────

/// One schema-constrained generation.
#[derive(Debug, Clone, Copy)]
pub struct StructuredRequest<'a> {
    /// Optional system prompt.
    pub system: Option<&'a str>,
    /// The single user message.
    pub prompt: &'a str,
    /// Schema name reported to the provider (`[a-zA-Z0-9_-]`).
    pub schema_name: &'a str,
    pub schema: &'a Value,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete_structured` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl LlmProvider {
    /// Send one request and return the JSON object the model produced.
    pub async fn complete_structured(
        &self,
        request: StructuredRequest<'_>,
    ) -> Result<Value, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete_structured(request).await,
            LlmProvider::OpenAiCompatible(p) => p.complete_structured(request).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(_) => "openai-compatible",
        }
    }
}
