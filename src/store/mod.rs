//! Persistence interface.
//!
//! Handlers and the orchestrator receive an `Arc<dyn Store>` and never see a
//! concrete backend. Two backends exist:
//!
//! - [`memory::MemoryStore`] — process-local maps; default, tests, demos.
//! - `sqlite::SqliteStore` — single-file SQLite (feature `isqlite`).
//!
//! Calls are blocking and short; they run inline on the request task.
//! Writes that must not interleave (`cancel_and_record`) are atomic inside
//! the backend.

pub mod memory;
pub mod seed;
#[cfg(feature = "isqlite")]
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::model::{
    CancellationEvent, Notification, SavingsGoal, Subscription, Transaction, User, ValidationError,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("stored data is malformed: {0}")]
    Serialization(String),
    #[error("rejected record: {0}")]
    Invalid(#[from] ValidationError),
}

pub trait Store: Send + Sync {
    /// Backend name for logs (`"memory"`, `"sqlite"`).
    fn backend(&self) -> &'static str;

    // ── users & sessions ──────────────────────────────────────────────

    fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Reverse lookup used by the aggregator webhook.
    fn find_user_by_item(&self, item_id: &str) -> Result<Option<User>, StoreError>;

    fn upsert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Register a bearer token for `user_id`. Sessions are issued by the
    /// identity provider; this is how they reach the store.
    fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError>;

    fn session_user(&self, token: &str) -> Result<Option<String>, StoreError>;

    // ── transactions ──────────────────────────────────────────────────

    /// Insert or replace by transaction id. Returns the number written.
    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<usize, StoreError>;

    /// Delete by transaction id. Unknown ids are ignored. Returns the number
    /// actually removed.
    fn remove_transactions(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// Newest first.
    fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError>;

    // ── subscriptions ─────────────────────────────────────────────────

    fn find_subscription(&self, user_id: &str, id: &str) -> Result<Option<Subscription>, StoreError>;

    /// Insert or replace by `(user_id, id)`; insertion order is preserved
    /// for existing records.
    fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), StoreError>;

    /// In insertion order.
    fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError>;

    /// Atomically mark a subscription cancelled and record the saving.
    ///
    /// When the user has a stored record it is marked cancelled and its own
    /// amount is recorded. Without a stored record `fallback_amount` is
    /// recorded. Returns `None` when the subscription was already cancelled
    /// or already has an event; a stored record is still marked cancelled in
    /// the latter case. A saving is never counted twice.
    fn cancel_and_record(
        &self,
        user_id: &str,
        subscription_id: &str,
        fallback_amount: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<CancellationEvent>, StoreError>;

    /// Oldest first.
    fn list_cancellations(&self, user_id: &str) -> Result<Vec<CancellationEvent>, StoreError>;

    // ── savings goals ─────────────────────────────────────────────────

    fn find_goal(&self, user_id: &str, id: &str) -> Result<Option<SavingsGoal>, StoreError>;

    fn upsert_goal(&self, goal: &SavingsGoal) -> Result<(), StoreError>;

    fn list_goals(&self, user_id: &str) -> Result<Vec<SavingsGoal>, StoreError>;

    // ── notifications ─────────────────────────────────────────────────

    fn upsert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// Newest first.
    fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    /// Returns `false` when no such notification exists.
    fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;

    /// Returns `false` when no such notification exists.
    fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;
}

/// Open the configured backend.
pub fn open(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match config.store {
        StoreBackend::Memory => Ok(Arc::new(memory::MemoryStore::new())),
        #[cfg(feature = "isqlite")]
        StoreBackend::Sqlite => {
            std::fs::create_dir_all(&config.server.data_dir).map_err(|e| {
                AppError::Store(format!(
                    "cannot create data dir {}: {e}",
                    config.server.data_dir.display()
                ))
            })?;
            let store = sqlite::SqliteStore::open(&config.sqlite_path())
                .map_err(|e| AppError::Store(e.to_string()))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "isqlite"))]
        StoreBackend::Sqlite => Err(AppError::Store(
            "sqlite backend requested but the binary was built without feature 'isqlite'".into(),
        )),
    }
}
