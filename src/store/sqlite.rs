//! Single-file SQLite store.
//!
//! Transactions and users get real columns (they are queried by field);
//! subscriptions, goals and notifications are stored as JSON bodies keyed by
//! `(user_id, id)`. List order for subscriptions follows `rowid`, which an
//! `ON CONFLICT DO UPDATE` upsert preserves.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Store, StoreError};
use crate::model::{
    CancellationEvent, Notification, SavingsGoal, Subscription, SubscriptionStatus, Transaction,
    User,
};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    item_id TEXT,
    sealed_access_token TEXT,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS users_item_id ON users(item_id);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    amount REAL NOT NULL,
    currency TEXT,
    date TEXT NOT NULL,
    name TEXT NOT NULL,
    merchant_name TEXT,
    category TEXT NOT NULL,
    pending INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS transactions_user ON transactions(user_id, date);

CREATE TABLE IF NOT EXISTS subscriptions (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (user_id, id)
);

CREATE TABLE IF NOT EXISTS cancellations (
    user_id TEXT NOT NULL,
    subscription_id TEXT NOT NULL,
    monthly_amount REAL NOT NULL,
    at TEXT NOT NULL,
    UNIQUE (user_id, subscription_id)
);

CREATE TABLE IF NOT EXISTS goals (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (user_id, id)
);

CREATE TABLE IF NOT EXISTS notifications (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (user_id, id)
);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("sqlite: {context}: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("sqlite: open {}: {e}", path.display())))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err("open in-memory"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err("create schema"))?;
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(db_err("read user_version"))?;
        if version == 0 {
            conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                .map_err(db_err("set user_version"))?;
        } else if version != SCHEMA_VERSION {
            return Err(StoreError::Backend(format!(
                "sqlite: unsupported schema version {version} (expected {SCHEMA_VERSION})"
            )));
        }
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
    }

    fn user_from_row(body: String, token: Option<String>) -> Result<User, StoreError> {
        let mut user: User = from_json(&body)?;
        user.sealed_access_token = token;
        Ok(user)
    }

    fn list_bodies<T: DeserializeOwned>(
        &self,
        sql: &str,
        user_id: &str,
        context: &str,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(db_err(context))?;
        let bodies = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .map_err(db_err(context))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err(context))?;
        bodies.iter().map(|b| from_json(b)).collect()
    }
}

impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .lock()?
            .query_row(
                "SELECT body, sealed_access_token FROM users WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()
            .map_err(db_err("find user"))?;
        row.map(|(body, token)| Self::user_from_row(body, token)).transpose()
    }

    fn find_user_by_item(&self, item_id: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .lock()?
            .query_row(
                "SELECT body, sealed_access_token FROM users WHERE item_id = ?1 LIMIT 1",
                params![item_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()
            .map_err(db_err("find user by item"))?;
        row.map(|(body, token)| Self::user_from_row(body, token)).transpose()
    }

    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let body = to_json(user)?;
        self.lock()?
            .execute(
                "INSERT INTO users (id, item_id, sealed_access_token, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET item_id = excluded.item_id,
                     sealed_access_token = excluded.sealed_access_token, body = excluded.body",
                params![user.id, user.item_id, user.sealed_access_token, body],
            )
            .map_err(db_err("upsert user"))?;
        Ok(())
    }

    fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO sessions (token, user_id) VALUES (?1, ?2)",
                params![token, user_id],
            )
            .map_err(db_err("put session"))?;
        Ok(())
    }

    fn session_user(&self, token: &str) -> Result<Option<String>, StoreError> {
        self.lock()?
            .query_row("SELECT user_id FROM sessions WHERE token = ?1", params![token], |row| row.get(0))
            .optional()
            .map_err(db_err("session lookup"))
    }

    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<usize, StoreError> {
        for t in transactions {
            t.validate()?;
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("begin upsert transactions"))?;
        for t in transactions {
            tx.execute(
                "INSERT OR REPLACE INTO transactions
                 (id, user_id, account_id, amount, currency, date, name, merchant_name, category, pending)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    t.id,
                    t.user_id,
                    t.account_id,
                    t.amount,
                    t.currency,
                    t.date.to_string(),
                    t.name,
                    t.merchant_name,
                    to_json(&t.category)?,
                    t.pending,
                ],
            )
            .map_err(db_err("upsert transaction"))?;
        }
        tx.commit().map_err(db_err("commit upsert transactions"))?;
        Ok(transactions.len())
    }

    fn remove_transactions(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("begin remove transactions"))?;
        let mut removed = 0;
        for id in ids {
            removed += tx
                .execute("DELETE FROM transactions WHERE id = ?1", params![id])
                .map_err(db_err("remove transaction"))?;
        }
        tx.commit().map_err(db_err("commit remove transactions"))?;
        Ok(removed)
    }

    fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, account_id, amount, currency, date, name, merchant_name, category, pending
                 FROM transactions WHERE user_id = ?1 ORDER BY date DESC, id ASC",
            )
            .map_err(db_err("prepare list transactions"))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, bool>(9)?,
                ))
            })
            .map_err(db_err("list transactions"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err("list transactions"))?;

        rows.into_iter()
            .map(|(id, user_id, account_id, amount, currency, date, name, merchant_name, category, pending)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| StoreError::Serialization(format!("transaction {id} date: {e}")))?;
                Ok(Transaction {
                    id,
                    user_id,
                    account_id,
                    amount,
                    currency,
                    date,
                    name,
                    merchant_name,
                    category: from_json(&category)?,
                    pending,
                })
            })
            .collect()
    }

    fn find_subscription(&self, user_id: &str, id: &str) -> Result<Option<Subscription>, StoreError> {
        let body: Option<String> = self
            .lock()?
            .query_row(
                "SELECT body FROM subscriptions WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("find subscription"))?;
        body.as_deref().map(from_json).transpose()
    }

    fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        subscription.validate()?;
        let body = to_json(subscription)?;
        self.lock()?
            .execute(
                "INSERT INTO subscriptions (user_id, id, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, id) DO UPDATE SET body = excluded.body",
                params![subscription.user_id, subscription.id, body],
            )
            .map_err(db_err("upsert subscription"))?;
        Ok(())
    }

    fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError> {
        self.list_bodies(
            "SELECT body FROM subscriptions WHERE user_id = ?1 ORDER BY rowid",
            user_id,
            "list subscriptions",
        )
    }

    fn cancel_and_record(
        &self,
        user_id: &str,
        subscription_id: &str,
        fallback_amount: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<CancellationEvent>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("begin cancel"))?;

        let already_recorded: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM cancellations WHERE user_id = ?1 AND subscription_id = ?2)",
                params![user_id, subscription_id],
                |row| row.get(0),
            )
            .map_err(db_err("check cancellation"))?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT body FROM subscriptions WHERE user_id = ?1 AND id = ?2",
                params![user_id, subscription_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("load subscription"))?;

        let amount = match stored {
            Some(body) => {
                let mut sub: Subscription = from_json(&body)?;
                if sub.is_cancelled() {
                    return Ok(None);
                }
                sub.status = SubscriptionStatus::Cancelled;
                tx.execute(
                    "UPDATE subscriptions SET body = ?3 WHERE user_id = ?1 AND id = ?2",
                    params![user_id, subscription_id, to_json(&sub)?],
                )
                .map_err(db_err("mark cancelled"))?;
                sub.amount
            }
            None => fallback_amount,
        };
        if already_recorded {
            tx.commit().map_err(db_err("commit cancel"))?;
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO cancellations (user_id, subscription_id, monthly_amount, at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, subscription_id, amount, at.to_rfc3339()],
        )
        .map_err(db_err("record cancellation"))?;
        tx.commit().map_err(db_err("commit cancel"))?;

        Ok(Some(CancellationEvent {
            user_id: user_id.to_string(),
            subscription_id: subscription_id.to_string(),
            monthly_amount: amount,
            at,
        }))
    }

    fn list_cancellations(&self, user_id: &str) -> Result<Vec<CancellationEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT subscription_id, monthly_amount, at FROM cancellations
                 WHERE user_id = ?1 ORDER BY at ASC, rowid ASC",
            )
            .map_err(db_err("prepare list cancellations"))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(db_err("list cancellations"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err("list cancellations"))?;

        rows.into_iter()
            .map(|(subscription_id, monthly_amount, at)| {
                let at = DateTime::parse_from_rfc3339(&at)
                    .map_err(|e| StoreError::Serialization(format!("cancellation time: {e}")))?
                    .with_timezone(&Utc);
                Ok(CancellationEvent { user_id: user_id.to_string(), subscription_id, monthly_amount, at })
            })
            .collect()
    }

    fn find_goal(&self, user_id: &str, id: &str) -> Result<Option<SavingsGoal>, StoreError> {
        let body: Option<String> = self
            .lock()?
            .query_row(
                "SELECT body FROM goals WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("find goal"))?;
        body.as_deref().map(from_json).transpose()
    }

    fn upsert_goal(&self, goal: &SavingsGoal) -> Result<(), StoreError> {
        goal.validate()?;
        let body = to_json(goal)?;
        self.lock()?
            .execute(
                "INSERT INTO goals (user_id, id, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, id) DO UPDATE SET body = excluded.body",
                params![goal.user_id, goal.id, body],
            )
            .map_err(db_err("upsert goal"))?;
        Ok(())
    }

    fn list_goals(&self, user_id: &str) -> Result<Vec<SavingsGoal>, StoreError> {
        self.list_bodies("SELECT body FROM goals WHERE user_id = ?1 ORDER BY rowid", user_id, "list goals")
    }

    fn upsert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let body = to_json(notification)?;
        self.lock()?
            .execute(
                "INSERT INTO notifications (user_id, id, timestamp, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, id) DO UPDATE SET timestamp = excluded.timestamp, body = excluded.body",
                params![notification.user_id, notification.id, notification.timestamp.to_rfc3339(), body],
            )
            .map_err(db_err("upsert notification"))?;
        Ok(())
    }

    fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let mut out: Vec<Notification> = self.list_bodies(
            "SELECT body FROM notifications WHERE user_id = ?1",
            user_id,
            "list notifications",
        )?;
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err("begin mark read"))?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM notifications WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("load notification"))?;
        let Some(body) = body else {
            return Ok(false);
        };
        let mut n: Notification = from_json(&body)?;
        n.is_read = true;
        tx.execute(
            "UPDATE notifications SET body = ?3 WHERE user_id = ?1 AND id = ?2",
            params![user_id, id, to_json(&n)?],
        )
        .map_err(db_err("mark read"))?;
        tx.commit().map_err(db_err("commit mark read"))?;
        Ok(true)
    }

    fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .lock()?
            .execute(
                "DELETE FROM notifications WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
            )
            .map_err(db_err("delete notification"))?;
        Ok(removed > 0)
    }
}
