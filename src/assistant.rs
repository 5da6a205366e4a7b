//! Conversational assistant.
//!
//! A message that asks to cancel something the user is subscribed to is
//! answered locally with a canned reply and two action buttons. Everything
//! else goes to the model together with a snapshot of the user's
//! subscriptions.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::classify::{self, ClassifyError};
use crate::domain;
use crate::llm::LlmProvider;
use crate::locale::Locale;
use crate::model::{
    ActionKind, ChatAction, ChatMessage, ChatReply, Subscription, SubscriptionStatus, UsageLevel,
};

const CANCEL_KEYWORDS: &[&str] = &["cancel", "lemondás", "lemondanám"];

/// First subscription named (by name or category) in a message that asks to
/// cancel something. Matching is case-insensitive substring search in
/// subscription order.
pub fn detect_cancel_intent<'a>(message: &str, subscriptions: &'a [Subscription]) -> Option<&'a Subscription> {
    let lower = message.to_lowercase();
    if !CANCEL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }
    subscriptions.iter().find(|s| {
        let name = s.name.to_lowercase();
        let category = s.category.to_lowercase();
        (!name.is_empty() && lower.contains(&name)) || (!category.is_empty() && lower.contains(&category))
    })
}

pub fn cancel_intent_reply(sub: &Subscription, locale: Locale) -> ChatReply {
    let action = |kind, label: &str| ChatAction {
        kind,
        label: label.to_string(),
        subscription_id: Some(sub.id.clone()),
        subscription_name: Some(sub.name.clone()),
    };
    ChatReply {
        response: locale.chat_cancel_intent(&sub.name, sub.amount, sub.cancellation_difficulty),
        actions: Some(vec![
            action(ActionKind::CancelSubscription, locale.action_cancel_now()),
            action(ActionKind::ViewDetails, locale.action_view_details()),
        ]),
        needs_follow_up: None,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpcomingBill<'a> {
    name: &'a str,
    amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_charge: Option<NaiveDate>,
}

/// What the model is told about the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionContext<'a> {
    subscriptions: &'a [Subscription],
    total_monthly_spend: f64,
    unused_subscriptions: Vec<&'a Subscription>,
    high_usage_subscriptions: Vec<&'a Subscription>,
    categories: Vec<&'a str>,
    upcoming_bills: Vec<UpcomingBill<'a>>,
}

impl<'a> SubscriptionContext<'a> {
    fn new(subscriptions: &'a [Subscription]) -> Self {
        let mut categories: Vec<&str> = Vec::new();
        for s in subscriptions {
            if !categories.contains(&s.category.as_str()) {
                categories.push(&s.category);
            }
        }
        let mut upcoming_bills: Vec<UpcomingBill<'a>> = subscriptions
            .iter()
            .filter(|s| s.status != SubscriptionStatus::Cancelled)
            .map(|s| UpcomingBill { name: &s.name, amount: s.amount, next_charge: s.next_charge })
            .collect();
        upcoming_bills.sort_by_key(|b| b.next_charge.unwrap_or(NaiveDate::MAX));

        Self {
            subscriptions,
            total_monthly_spend: domain::summarize(subscriptions).total_monthly_spend,
            unused_subscriptions: subscriptions
                .iter()
                .filter(|s| s.status == SubscriptionStatus::Unused)
                .collect(),
            high_usage_subscriptions: subscriptions.iter().filter(|s| s.usage == UsageLevel::High).collect(),
            categories,
            upcoming_bills,
        }
    }
}

fn system_prompt(locale: Locale) -> String {
    let language = locale.reply_language();
    format!(
        "You are SubSaver AI, a specialized financial assistant for subscription management. \
         You are knowledgeable, friendly, and focused on helping users save money and optimize their subscriptions.\n\n\
         CORE INSTRUCTIONS:\n\
         1. ALWAYS respond in {language}\n\
         2. Focus on actionable money-saving advice\n\
         3. Use specific data from the user's subscriptions\n\
         4. Be concise but comprehensive\n\
         5. Proactively suggest optimizations\n\
         6. Provide actionable buttons when relevant\n\n\
         RESPONSE GUIDELINES:\n\
         - Expense questions: give specific amounts and percentages, suggest cost optimizations.\n\
         - Unused subscriptions: list them with amounts, calculate potential annual savings, offer cancel buttons.\n\
         - Cancellation requests: acknowledge, assess difficulty, offer a cancel_subscription action, mention retention offers to avoid.\n\
         - Alternatives: suggest specific cheaper services, compare pricing, offer a find_alternatives action.\n\
         - Upcoming bills: list in chronological order with amounts and dates.\n\n\
         ACTION BUTTONS:\n\
         - cancel_subscription: when the user wants to cancel\n\
         - find_alternatives: when discussing cheaper options\n\
         - view_details: for detailed subscription info\n\n\
         Always include subscriptionId and subscriptionName on actions that refer to a subscription."
    )
}

fn user_prompt(context: &SubscriptionContext<'_>, history: &[ChatMessage], message: &str, locale: Locale) -> String {
    let context = serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string());
    let history = history
        .iter()
        .map(|m| format!("{}: {}", locale.role_label(m.role), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "CURRENT USER CONTEXT:\n{context}\n\n\
         CONVERSATION HISTORY:\n{history}\n\n\
         USER'S CURRENT MESSAGE: \"{message}\""
    )
}

/// Answer `message` for a user whose subscriptions are `subscriptions`.
pub async fn respond(
    llm: &LlmProvider,
    locale: Locale,
    subscriptions: &[Subscription],
    message: &str,
    history: &[ChatMessage],
) -> Result<ChatReply, ClassifyError> {
    if let Some(sub) = detect_cancel_intent(message, subscriptions) {
        debug!(subscription_id = %sub.id, "cancel intent answered locally");
        return Ok(cancel_intent_reply(sub, locale));
    }

    let context = SubscriptionContext::new(subscriptions);
    let prompt = user_prompt(&context, history, message, locale);
    classify::chat::reply(llm, &system_prompt(locale), &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::model::Role;
    use crate::store::seed::demo_subscriptions;
    use serde_json::json;

    #[tokio::test]
    async fn cancel_netflix_short_circuits_in_any_case() {
        let dummy = DummyProvider::default();
        let llm = LlmProvider::Dummy(dummy.clone());
        let subs = demo_subscriptions("demo");

        for message in ["cancel my Netflix", "CANCEL MY NETFLIX", "please Cancel netflix now"] {
            let reply = respond(&llm, Locale::Hu, &subs, message, &[]).await.unwrap();
            assert!(reply.response.contains("Netflix"), "{message}");
            assert!(reply.response.contains("15.99"));
            let actions = reply.actions.unwrap();
            assert_eq!(actions.len(), 2);
            assert_eq!(actions[0].kind, ActionKind::CancelSubscription);
            assert_eq!(actions[0].subscription_id.as_deref(), Some("netflix-1"));
            assert_eq!(actions[1].kind, ActionKind::ViewDetails);
        }
        assert_eq!(dummy.calls(), 0);
    }

    #[test]
    fn hungarian_keyword_and_category_match() {
        let subs = demo_subscriptions("demo");
        let hit = detect_cancel_intent("Lemondanám a news előfizetést", &subs).unwrap();
        assert_eq!(hit.id, "news-subscription");
        // Category match: "health" is the gym's category.
        assert_eq!(detect_cancel_intent("cancel health stuff", &subs).unwrap().id, "gym-membership");
    }

    #[test]
    fn no_keyword_or_no_match_means_no_intent() {
        let subs = demo_subscriptions("demo");
        assert!(detect_cancel_intent("tell me about Netflix", &subs).is_none());
        assert!(detect_cancel_intent("cancel my yacht club", &subs).is_none());
    }

    #[tokio::test]
    async fn other_messages_go_to_the_model() {
        let dummy = DummyProvider::scripted(json!({ "response": "Havonta 128.94 dollárt költesz." }));
        let llm = LlmProvider::Dummy(dummy.clone());
        let subs = demo_subscriptions("demo");
        let history = vec![ChatMessage::new(Role::User, "szia")];
        let reply = respond(&llm, Locale::Hu, &subs, "Mennyit költök?", &history).await.unwrap();
        assert_eq!(reply.response, "Havonta 128.94 dollárt költesz.");
        assert_eq!(dummy.calls(), 1);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let llm = LlmProvider::Dummy(DummyProvider::default());
        let err = respond(&llm, Locale::Hu, &[], "hello", &[]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Provider(_)));
    }

    #[test]
    fn context_summarizes_subscriptions() {
        let subs = demo_subscriptions("demo");
        let ctx = SubscriptionContext::new(&subs);
        assert_eq!(ctx.total_monthly_spend, 128.94);
        assert_eq!(ctx.unused_subscriptions.len(), 2);
        assert_eq!(ctx.high_usage_subscriptions.len(), 2);
        assert_eq!(ctx.categories, vec!["Entertainment", "Software", "Health", "News"]);
        assert_eq!(ctx.upcoming_bills[0].name, "Gym Membership");
    }
}
