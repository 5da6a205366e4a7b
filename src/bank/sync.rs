//! Persisting what the aggregator returns: the initial import after a bank
//! is linked, and webhook-driven re-syncs.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::crypto::TokenSealer;
use super::{BankError, BankProvider};
use crate::model::{Transaction, User};
use crate::store::Store;

/// Counts reported back to the dashboard after linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub accounts: usize,
    pub transactions: usize,
}

/// Exchange `public_token`, seal the access token onto the user record, then
/// import `import_days` of history.
pub async fn link_item(
    store: &dyn Store,
    bank: &BankProvider,
    sealer: &TokenSealer,
    user_id: &str,
    public_token: &str,
    import_days: i64,
) -> Result<LinkSummary, BankError> {
    let item = bank.exchange_public_token(public_token).await?;
    let accounts = bank.accounts(&item.access_token).await?;

    let mut user = match store.find_user(user_id)? {
        Some(user) => user,
        None => User::new(user_id, ""),
    };
    user.sealed_access_token = Some(sealer.seal(&item.access_token)?);
    user.item_id = Some(item.item_id.clone());
    user.accounts = accounts;
    user.updated_at = Utc::now();
    store.upsert_user(&user)?;

    let transactions = import(store, bank, &item.access_token, user_id, import_days).await?;

    user.last_sync_at = Some(Utc::now());
    store.upsert_user(&user)?;

    info!(
        user_id,
        item_id = %item.item_id,
        accounts = user.accounts.len(),
        transactions,
        "bank item linked"
    );
    Ok(LinkSummary { accounts: user.accounts.len(), transactions })
}

/// Fetch the last `days` of transactions and upsert them for `user_id`.
async fn import(
    store: &dyn Store,
    bank: &BankProvider,
    access_token: &str,
    user_id: &str,
    days: i64,
) -> Result<usize, BankError> {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(days);
    let fetched = bank.transactions(access_token, start, end).await?;
    let transactions: Vec<Transaction> =
        fetched.into_iter().map(|t| t.into_transaction(user_id)).collect();
    Ok(store.upsert_transactions(&transactions)?)
}

// ── webhooks ──────────────────────────────────────────────────────────────────

/// Removed transactions arrive either as bare ids or as objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemovedTransaction {
    Id(String),
    Object { transaction_id: String },
}

impl RemovedTransaction {
    pub fn id(&self) -> &str {
        match self {
            RemovedTransaction::Id(id) => id,
            RemovedTransaction::Object { transaction_id } => transaction_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub webhook_type: String,
    #[serde(default)]
    pub webhook_code: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub new_transactions: u64,
    #[serde(default)]
    pub removed_transactions: Vec<RemovedTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a transactions webhook; acknowledged without work.
    Ignored,
    /// No user owns the item (or it has no sealed token).
    UnknownItem,
    Synced { upserted: usize, removed: usize },
}

pub async fn handle_webhook(
    store: &dyn Store,
    bank: &BankProvider,
    sealer: &TokenSealer,
    event: &WebhookEvent,
    sync_days: i64,
) -> Result<WebhookOutcome, BankError> {
    if event.webhook_type != "TRANSACTIONS" {
        info!(webhook_type = %event.webhook_type, "ignoring webhook");
        return Ok(WebhookOutcome::Ignored);
    }

    let Some(item_id) = event.item_id.as_deref() else {
        warn!("transactions webhook without item_id");
        return Ok(WebhookOutcome::UnknownItem);
    };
    let Some(mut user) = store.find_user_by_item(item_id)? else {
        warn!(item_id, "webhook for unknown item");
        return Ok(WebhookOutcome::UnknownItem);
    };
    let Some(sealed) = user.sealed_access_token.as_deref() else {
        warn!(item_id, user_id = %user.id, "webhook for item without access token");
        return Ok(WebhookOutcome::UnknownItem);
    };
    let access_token = sealer.open(sealed)?;

    let mut upserted = 0;
    if event.new_transactions > 0 {
        upserted = import(store, bank, &access_token, &user.id, sync_days).await?;
        user.last_sync_at = Some(Utc::now());
        store.upsert_user(&user)?;
    }

    let removed_ids: Vec<String> =
        event.removed_transactions.iter().map(|r| r.id().to_string()).collect();
    let removed = if removed_ids.is_empty() { 0 } else { store.remove_transactions(&removed_ids)? };

    info!(
        item_id,
        user_id = %user.id,
        code = event.webhook_code.as_deref().unwrap_or("-"),
        upserted,
        removed,
        "transactions webhook processed"
    );
    Ok(WebhookOutcome::Synced { upserted, removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::dummy::DummyBank;
    use crate::store::memory::MemoryStore;

    fn setup() -> (MemoryStore, BankProvider, TokenSealer) {
        (
            MemoryStore::new(),
            BankProvider::Dummy(DummyBank::default()),
            TokenSealer::new("test-key").unwrap(),
        )
    }

    #[tokio::test]
    async fn linking_seals_token_and_imports_history() {
        let (store, bank, sealer) = setup();
        let summary = link_item(&store, &bank, &sealer, "u1", "pub-1", 180).await.unwrap();
        assert_eq!(summary, LinkSummary { accounts: 1, transactions: 4 });

        let user = store.find_user("u1").unwrap().unwrap();
        let sealed = user.sealed_access_token.unwrap();
        assert_ne!(sealed, "access-dummy-pub-1");
        assert_eq!(sealer.open(&sealed).unwrap(), "access-dummy-pub-1");
        assert_eq!(user.item_id.as_deref(), Some("item-pub-1"));
        assert!(user.last_sync_at.is_some());
        assert_eq!(store.list_transactions("u1").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn relinking_is_idempotent() {
        let (store, bank, sealer) = setup();
        link_item(&store, &bank, &sealer, "u1", "pub-1", 180).await.unwrap();
        link_item(&store, &bank, &sealer, "u1", "pub-1", 180).await.unwrap();
        assert_eq!(store.list_transactions("u1").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn webhook_resyncs_and_removes() {
        let (store, bank, sealer) = setup();
        link_item(&store, &bank, &sealer, "u1", "pub-1", 180).await.unwrap();

        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "webhook_type": "TRANSACTIONS",
            "webhook_code": "DEFAULT_UPDATE",
            "item_id": "item-pub-1",
            "new_transactions": 2,
            "removed_transactions": ["dummy-tx-4", { "transaction_id": "dummy-tx-3" }]
        }))
        .unwrap();
        let outcome = handle_webhook(&store, &bank, &sealer, &event, 30).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Synced { upserted: 2, removed: 2 });
        assert_eq!(store.list_transactions("u1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_item_and_other_types() {
        let (store, bank, sealer) = setup();
        let event = WebhookEvent {
            webhook_type: "TRANSACTIONS".into(),
            webhook_code: None,
            item_id: Some("item-nope".into()),
            new_transactions: 1,
            removed_transactions: vec![],
        };
        assert_eq!(
            handle_webhook(&store, &bank, &sealer, &event, 30).await.unwrap(),
            WebhookOutcome::UnknownItem
        );

        let item_event = WebhookEvent { webhook_type: "ITEM".into(), ..event };
        assert_eq!(
            handle_webhook(&store, &bank, &sealer, &item_event, 30).await.unwrap(),
            WebhookOutcome::Ignored
        );
    }
}
