//! Assistant replies: free text plus optional action buttons.

use serde_json::{Value, json};

use super::{ClassifyError, generate};
use crate::llm::LlmProvider;
use crate::model::ChatReply;

const CONTRACT: &str = "chat_reply";

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "response": { "type": "string" },
            "actions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["cancel_subscription", "view_details", "find_alternatives"] },
                        "label": { "type": "string" },
                        "subscriptionId": { "type": "string" },
                        "subscriptionName": { "type": "string" }
                    },
                    "required": ["type", "label"]
                }
            },
            "needsFollowUp": { "type": "boolean" }
        },
        "required": ["response"]
    })
}

pub async fn reply(
    llm: &LlmProvider,
    system: &str,
    prompt: &str,
) -> Result<ChatReply, ClassifyError> {
    let reply: ChatReply = generate(llm, CONTRACT, Some(system), prompt, &schema()).await?;
    if reply.response.trim().is_empty() {
        return Err(ClassifyError::schema(CONTRACT, "response is empty"));
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::model::ActionKind;

    #[tokio::test]
    async fn reply_with_actions_decodes() {
        let llm = LlmProvider::Dummy(DummyProvider::scripted(json!({
            "response": "A legdrágább az Adobe.",
            "actions": [{ "type": "find_alternatives", "label": "Alternatívák", "subscriptionId": "adobe-creative" }],
            "needsFollowUp": false
        })));
        let r = reply(&llm, "sys", "Melyik a legdrágább?").await.unwrap();
        let actions = r.actions.unwrap();
        assert_eq!(actions[0].kind, ActionKind::FindAlternatives);
        assert_eq!(actions[0].subscription_id.as_deref(), Some("adobe-creative"));
        assert_eq!(r.needs_follow_up, Some(false));
    }

    #[tokio::test]
    async fn unknown_action_kind_is_rejected() {
        let llm = LlmProvider::Dummy(DummyProvider::scripted(json!({
            "response": "ok",
            "actions": [{ "type": "delete_account", "label": "x" }]
        })));
        assert!(matches!(reply(&llm, "sys", "hi").await, Err(ClassifyError::Schema { .. })));
    }

    #[tokio::test]
    async fn blank_response_is_rejected() {
        let llm = LlmProvider::Dummy(DummyProvider::scripted(json!({ "response": "  " })));
        assert!(matches!(reply(&llm, "sys", "hi").await, Err(ClassifyError::Schema { .. })));
    }
}
