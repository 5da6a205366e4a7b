//! Schema-constrained LLM calls and the validation of what comes back.
//!
//! Each submodule owns one output contract: a JSON Schema sent to the
//! provider, the typed struct the reply must decode into, and the bounds
//! checks serde cannot express. Anything that fails either step is a
//! [`ClassifyError::Schema`]; nothing is retried.
//!
//! - [`analysis`] — transactions → candidate subscriptions.
//! - [`chat`] — assistant replies with optional action buttons.
//! - [`cashflow`] — six-month cashflow projection.

pub mod analysis;
pub mod cashflow;
pub mod chat;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm::{LlmProvider, ProviderError, StructuredRequest};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("model output violates the {contract} contract: {reason}")]
    Schema { contract: &'static str, reason: String },
}

impl ClassifyError {
    pub(crate) fn schema(contract: &'static str, reason: impl Into<String>) -> Self {
        ClassifyError::Schema { contract, reason: reason.into() }
    }
}

/// Send one structured request and decode the reply into `T`.
async fn generate<T: DeserializeOwned>(
    llm: &LlmProvider,
    contract: &'static str,
    system: Option<&str>,
    prompt: &str,
    schema: &Value,
) -> Result<T, ClassifyError> {
    let value = llm
        .complete_structured(StructuredRequest { system, prompt, schema_name: contract, schema })
        .await?;
    serde_json::from_value(value).map_err(|e| {
        warn!(contract, error = %e, "model output failed to decode");
        ClassifyError::schema(contract, e.to_string())
    })
}

fn finite(contract: &'static str, field: &str, value: f64) -> Result<(), ClassifyError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ClassifyError::schema(contract, format!("{field} is not a finite number")))
    }
}

fn unit_interval(contract: &'static str, field: &str, value: f64) -> Result<(), ClassifyError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ClassifyError::schema(contract, format!("{field} {value} is outside [0, 1]")))
    }
}
