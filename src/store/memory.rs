//! In-process store backed by maps behind a single `RwLock`.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{Store, StoreError};
use crate::model::{
    CancellationEvent, Notification, SavingsGoal, Subscription, SubscriptionStatus, Transaction,
    User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    sessions: HashMap<String, String>,
    transactions: HashMap<String, Transaction>,
    /// Per user, insertion ordered.
    subscriptions: HashMap<String, Vec<Subscription>>,
    cancellations: Vec<CancellationEvent>,
    goals: HashMap<String, Vec<SavingsGoal>>,
    notifications: HashMap<String, Vec<Notification>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

/// Replace the element matching `same` or append.
fn upsert_in<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(slot) => *slot = item.clone(),
        None => items.push(item.clone()),
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn find_user_by_item(&self, item_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.item_id.as_deref() == Some(item_id))
            .cloned())
    }

    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.write()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn put_session(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.write()?.sessions.insert(token.to_string(), user_id.to_string());
        Ok(())
    }

    fn session_user(&self, token: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.sessions.get(token).cloned())
    }

    fn upsert_transactions(&self, transactions: &[Transaction]) -> Result<usize, StoreError> {
        for tx in transactions {
            tx.validate()?;
        }
        let mut inner = self.write()?;
        for tx in transactions {
            inner.transactions.insert(tx.id.clone(), tx.clone());
        }
        Ok(transactions.len())
    }

    fn remove_transactions(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        Ok(ids.iter().filter(|id| inner.transactions.remove(id.as_str()).is_some()).count())
    }

    fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let mut out: Vec<Transaction> = self
            .read()?
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn find_subscription(&self, user_id: &str, id: &str) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .read()?
            .subscriptions
            .get(user_id)
            .and_then(|subs| subs.iter().find(|s| s.id == id))
            .cloned())
    }

    fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        subscription.validate()?;
        let mut inner = self.write()?;
        let subs = inner.subscriptions.entry(subscription.user_id.clone()).or_default();
        upsert_in(subs, subscription, |s| s.id == subscription.id);
        Ok(())
    }

    fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.read()?.subscriptions.get(user_id).cloned().unwrap_or_default())
    }

    fn cancel_and_record(
        &self,
        user_id: &str,
        subscription_id: &str,
        fallback_amount: f64,
        at: DateTime<Utc>,
    ) -> Result<Option<CancellationEvent>, StoreError> {
        let mut inner = self.write()?;
        let already_recorded = inner
            .cancellations
            .iter()
            .any(|e| e.user_id == user_id && e.subscription_id == subscription_id);

        let stored = inner
            .subscriptions
            .get_mut(user_id)
            .and_then(|subs| subs.iter_mut().find(|s| s.id == subscription_id));

        let amount = match stored {
            Some(sub) if sub.is_cancelled() => return Ok(None),
            Some(sub) => {
                sub.status = SubscriptionStatus::Cancelled;
                sub.amount
            }
            None => fallback_amount,
        };
        if already_recorded {
            return Ok(None);
        }

        let event = CancellationEvent {
            user_id: user_id.to_string(),
            subscription_id: subscription_id.to_string(),
            monthly_amount: amount,
            at,
        };
        inner.cancellations.push(event.clone());
        Ok(Some(event))
    }

    fn list_cancellations(&self, user_id: &str) -> Result<Vec<CancellationEvent>, StoreError> {
        Ok(self
            .read()?
            .cancellations
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_goal(&self, user_id: &str, id: &str) -> Result<Option<SavingsGoal>, StoreError> {
        Ok(self
            .read()?
            .goals
            .get(user_id)
            .and_then(|goals| goals.iter().find(|g| g.id == id))
            .cloned())
    }

    fn upsert_goal(&self, goal: &SavingsGoal) -> Result<(), StoreError> {
        goal.validate()?;
        let mut inner = self.write()?;
        let goals = inner.goals.entry(goal.user_id.clone()).or_default();
        upsert_in(goals, goal, |g| g.id == goal.id);
        Ok(())
    }

    fn list_goals(&self, user_id: &str) -> Result<Vec<SavingsGoal>, StoreError> {
        Ok(self.read()?.goals.get(user_id).cloned().unwrap_or_default())
    }

    fn upsert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let list = inner.notifications.entry(notification.user_id.clone()).or_default();
        upsert_in(list, notification, |n| n.id == notification.id);
        Ok(())
    }

    fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let mut out = self.read()?.notifications.get(user_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let found = inner
            .notifications
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|n| n.id == id));
        Ok(match found {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        })
    }

    fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let Some(list) = inner.notifications.get_mut(user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|n| n.id != id);
        Ok(list.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CancellationDifficulty, CancellationMethod, Frequency, NotificationCategory, Severity,
        UsageLevel,
    };
    use chrono::NaiveDate;

    fn sub(user: &str, id: &str, amount: f64) -> Subscription {
        Subscription {
            id: id.into(),
            user_id: user.into(),
            name: id.into(),
            amount,
            frequency: Frequency::Monthly,
            category: "Software".into(),
            status: SubscriptionStatus::Active,
            usage: UsageLevel::Low,
            confidence: 0.8,
            cancellation_difficulty: CancellationDifficulty::Easy,
            cancellation_method: CancellationMethod::Online,
            cancellation_contact: None,
            website: None,
            last_charge: None,
            next_charge: None,
        }
    }

    fn tx(id: &str, user: &str, day: u32) -> Transaction {
        Transaction {
            id: id.into(),
            user_id: user.into(),
            account_id: "acc".into(),
            amount: 9.99,
            currency: Some("USD".into()),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            name: "ACME".into(),
            merchant_name: None,
            category: Vec::new(),
            pending: true,
        }
    }

    #[test]
    fn subscription_upsert_keeps_order_and_replaces() {
        let store = MemoryStore::new();
        store.upsert_subscription(&sub("u1", "a", 1.0)).unwrap();
        store.upsert_subscription(&sub("u1", "b", 2.0)).unwrap();
        store.upsert_subscription(&sub("u1", "a", 3.0)).unwrap();
        let list = store.list_subscriptions("u1").unwrap();
        assert_eq!(list.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(list[0].amount, 3.0);
        assert!(store.list_subscriptions("u2").unwrap().is_empty());
    }

    #[test]
    fn invalid_subscription_rejected() {
        let store = MemoryStore::new();
        let err = store.upsert_subscription(&sub("u1", "a", -1.0)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn transaction_upsert_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert_transactions(&[tx("t1", "u1", 1), tx("t2", "u1", 5)]).unwrap();
        let mut settled = tx("t1", "u1", 1);
        settled.pending = false;
        store.upsert_transactions(&[settled]).unwrap();

        let list = store.list_transactions("u1").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "t2");
        assert!(!list[1].pending);

        let removed = store.remove_transactions(&["t1".into(), "missing".into()]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.list_transactions("u1").unwrap().len(), 1);
    }

    #[test]
    fn cancellation_counts_once() {
        let store = MemoryStore::new();
        store.upsert_subscription(&sub("u1", "gym", 29.99)).unwrap();
        let now = Utc::now();

        let first = store.cancel_and_record("u1", "gym", 99.0, now).unwrap().unwrap();
        assert_eq!(first.monthly_amount, 29.99);
        assert!(store.find_subscription("u1", "gym").unwrap().unwrap().is_cancelled());
        assert!(store.cancel_and_record("u1", "gym", 99.0, now).unwrap().is_none());

        let unstored = store.cancel_and_record("u1", "netflix-1", 15.99, now).unwrap().unwrap();
        assert_eq!(unstored.monthly_amount, 15.99);
        assert!(store.cancel_and_record("u1", "netflix-1", 15.99, now).unwrap().is_none());

        assert_eq!(store.list_cancellations("u1").unwrap().len(), 2);
        assert!(store.list_cancellations("u2").unwrap().is_empty());
    }

    #[test]
    fn fallback_saving_not_recounted_after_record_appears() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.cancel_and_record("u1", "gym", 29.99, now).unwrap().unwrap();

        store.upsert_subscription(&sub("u1", "gym", 35.0)).unwrap();
        assert!(store.cancel_and_record("u1", "gym", 29.99, now).unwrap().is_none());
        assert!(store.find_subscription("u1", "gym").unwrap().unwrap().is_cancelled());

        let events = store.list_cancellations("u1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].monthly_amount, 29.99);
    }

    #[test]
    fn sessions_and_item_lookup() {
        let store = MemoryStore::new();
        let mut user = User::new("u1", "a@example.test");
        user.item_id = Some("item-1".into());
        store.upsert_user(&user).unwrap();
        store.put_session("tok", "u1").unwrap();
        assert_eq!(store.session_user("tok").unwrap().as_deref(), Some("u1"));
        assert!(store.session_user("nope").unwrap().is_none());
        assert_eq!(store.find_user_by_item("item-1").unwrap().unwrap().id, "u1");
    }

    #[test]
    fn notifications_read_and_dismiss() {
        let store = MemoryStore::new();
        let n = Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            category: NotificationCategory::System,
            severity: Severity::Info,
            title: "t".into(),
            message: "m".into(),
            timestamp: Utc::now(),
            is_read: false,
            action_url: None,
            action_label: None,
        };
        store.upsert_notification(&n).unwrap();
        assert!(store.mark_notification_read("u1", "n1").unwrap());
        assert!(store.list_notifications("u1").unwrap()[0].is_read);
        assert!(!store.mark_notification_read("u2", "n1").unwrap());
        assert!(store.delete_notification("u1", "n1").unwrap());
        assert!(!store.delete_notification("u1", "n1").unwrap());
    }
}
