//! Dummy LLM provider — replays a scripted JSON reply.
//! Used for tests and keyless local runs; counts how often it is called so
//! tests can assert that a code path never reached the model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::llm::{ProviderError, StructuredRequest};

#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    reply: Option<Value>,
    calls: Arc<AtomicUsize>,
}

impl DummyProvider {
    /// A provider that answers every request with `reply`.
    pub fn scripted(reply: Value) -> Self {
        Self { reply: Some(reply), calls: Arc::default() }
    }

    /// Number of requests received so far, across all clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn complete_structured(
        &self,
        request: StructuredRequest<'_>,
    ) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| {
            ProviderError::Request(format!(
                "dummy provider has no scripted reply for '{}'",
                request.schema_name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(schema: &Value) -> StructuredRequest<'_> {
        StructuredRequest { system: None, prompt: "hi", schema_name: "chat_reply", schema }
    }

    #[tokio::test]
    async fn scripted_reply_is_returned_and_counted() {
        let schema = json!({});
        let p = DummyProvider::scripted(json!({"response": "szia"}));
        let clone = p.clone();
        assert_eq!(p.complete_structured(request(&schema)).await.unwrap()["response"], "szia");
        assert_eq!(clone.calls(), 1);
    }

    #[tokio::test]
    async fn unscripted_provider_fails() {
        let schema = json!({});
        let p = DummyProvider::default();
        assert!(p.complete_structured(request(&schema)).await.is_err());
        assert_eq!(p.calls(), 1);
    }
}
