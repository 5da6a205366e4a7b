use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CancelSubscription,
    ViewDetails,
    FindAlternatives,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CancelSubscription => "cancel_subscription",
            ActionKind::ViewDetails => "view_details",
            ActionKind::FindAlternatives => "find_alternatives",
        }
    }
}

/// A button the dashboard can render under an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
}

/// One turn of a conversation. History sent by the client may omit the
/// timestamp; it then defaults to the time of parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ChatAction>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { id: None, role, content: content.into(), timestamp: Utc::now(), actions: Vec::new() }
    }
}

/// Assistant reply returned by `POST /ai-chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ChatAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_follow_up: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_without_timestamp_parses() {
        let m: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(m.role, Role::User);
        assert!(m.actions.is_empty());
    }

    #[test]
    fn action_uses_type_key() {
        let a = ChatAction {
            kind: ActionKind::CancelSubscription,
            label: "Cancel".into(),
            subscription_id: Some("netflix-1".into()),
            subscription_name: None,
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "cancel_subscription");
        assert_eq!(json["subscriptionId"], "netflix-1");
        assert!(json.get("subscriptionName").is_none());
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"system","content":"x"}"#).is_err());
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("bot"), None);
    }
}
