//! Sample data for the demo user: the subscriptions, savings goals and
//! notifications the dashboard shows before a bank is linked.

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use super::{Store, StoreError};
use crate::model::{
    CancellationDifficulty as D, CancellationMethod as M, Frequency, Notification,
    NotificationCategory, Priority, SavingsGoal, Severity, Subscription, SubscriptionStatus as S,
    UsageLevel as U, User,
};

struct Row {
    id: &'static str,
    name: &'static str,
    amount: f64,
    category: &'static str,
    status: S,
    usage: U,
    difficulty: D,
    method: M,
    contact: &'static str,
    last: (i32, u32, u32),
}

const SUBSCRIPTIONS: &[Row] = &[
    Row { id: "netflix-1", name: "Netflix", amount: 15.99, category: "Entertainment", status: S::Active, usage: U::High, difficulty: D::Medium, method: M::Online, contact: "https://netflix.com/cancel", last: (2024, 1, 15) },
    Row { id: "spotify-premium", name: "Spotify Premium", amount: 11.99, category: "Entertainment", status: S::Active, usage: U::High, difficulty: D::Easy, method: M::Online, contact: "https://spotify.com/cancel", last: (2024, 1, 10) },
    Row { id: "adobe-creative", name: "Adobe Creative Suite", amount: 52.99, category: "Software", status: S::Active, usage: U::Medium, difficulty: D::Hard, method: M::Phone, contact: "+1-800-833-6687", last: (2024, 1, 5) },
    Row { id: "gym-membership", name: "Gym Membership", amount: 29.99, category: "Health", status: S::Unused, usage: U::Low, difficulty: D::Medium, method: M::Phone, contact: "+1-800-555-0123", last: (2024, 1, 1) },
    Row { id: "cloud-storage", name: "Cloud Storage", amount: 4.99, category: "Software", status: S::Active, usage: U::Medium, difficulty: D::Easy, method: M::Online, contact: "https://cloudstorage.com/cancel", last: (2024, 1, 12) },
    Row { id: "news-subscription", name: "News Subscription", amount: 12.99, category: "News", status: S::Unused, usage: U::Low, difficulty: D::Medium, method: M::Email, contact: "cancel@newsdaily.com", last: (2024, 1, 8) },
];

pub fn demo_subscriptions(user_id: &str) -> Vec<Subscription> {
    SUBSCRIPTIONS
        .iter()
        .map(|r| {
            let last = NaiveDate::from_ymd_opt(r.last.0, r.last.1, r.last.2);
            Subscription {
                id: r.id.to_string(),
                user_id: user_id.to_string(),
                name: r.name.to_string(),
                amount: r.amount,
                frequency: Frequency::Monthly,
                category: r.category.to_string(),
                status: r.status,
                usage: r.usage,
                confidence: 0.95,
                cancellation_difficulty: r.difficulty,
                cancellation_method: r.method,
                cancellation_contact: Some(r.contact.to_string()),
                website: None,
                last_charge: last,
                next_charge: last.and_then(|d| d.checked_add_months(chrono::Months::new(1))),
            }
        })
        .collect()
}

pub fn demo_goals(user_id: &str) -> Vec<SavingsGoal> {
    let goal = |id: &str, name: &str, description: &str, target: f64, current: f64, date: (i32, u32, u32), priority| {
        SavingsGoal {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            target_amount: target,
            current_amount: current,
            target_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or(NaiveDate::MIN),
            priority,
        }
    };
    vec![
        goal("emergency-fund", "Vészhelyzeti alap", "3 havi kiadás fedezése", 1000.0, 456.0, (2024, 12, 31), Priority::High),
        goal("vacation", "Nyaralás", "Európai körutazás", 2000.0, 680.0, (2024, 8, 15), Priority::Medium),
        goal("tech-upgrade", "Laptop csere", "Új MacBook Pro", 1500.0, 230.0, (2024, 10, 1), Priority::Low),
    ]
}

pub fn demo_notifications(user_id: &str) -> Vec<Notification> {
    let now = Utc::now();
    let note = |id: &str, severity, category, title: &str, message: &str, age: Duration, is_read, label: &str| {
        Notification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            category,
            severity,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: now - age,
            is_read,
            action_url: Some("/dashboard".to_string()),
            action_label: Some(label.to_string()),
        }
    };
    vec![
        note("1", Severity::Warning, NotificationCategory::Subscription, "Spotify díjemelés", "A Spotify Premium előfizetés ára 2 dollárral nőtt", Duration::minutes(30), false, "Részletek"),
        note("2", Severity::Success, NotificationCategory::Savings, "Megtakarítási cél elérve", "Gratulálunk! Elérted az Emergency Fund cél 50%-át", Duration::hours(2), false, "Megtekintés"),
        note("3", Severity::Info, NotificationCategory::Savings, "Heti összefoglaló", "Ez a hét 42.99 dollár megtakarítás", Duration::days(1), true, "Jelentés"),
        note("4", Severity::Warning, NotificationCategory::Subscription, "Nem használt előfizetés", "30 napja nem használtad az edzőterem tagságodat", Duration::days(2), true, "Lemondás"),
    ]
}

/// Seed the demo user. Existing records with the same ids are overwritten.
pub fn seed_demo(store: &dyn Store, user_id: &str) -> Result<(), StoreError> {
    if store.find_user(user_id)?.is_none() {
        store.upsert_user(&User::new(user_id, format!("{user_id}@demo.subsaver.local")))?;
    }
    let subscriptions = demo_subscriptions(user_id);
    for sub in &subscriptions {
        store.upsert_subscription(sub)?;
    }
    let goals = demo_goals(user_id);
    for goal in &goals {
        store.upsert_goal(goal)?;
    }
    let notifications = demo_notifications(user_id);
    for n in &notifications {
        store.upsert_notification(n)?;
    }
    info!(
        user_id,
        backend = store.backend(),
        subscriptions = subscriptions.len(),
        goals = goals.len(),
        notifications = notifications.len(),
        "demo data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn demo_records_are_valid() {
        for s in demo_subscriptions("demo") {
            s.validate().unwrap();
        }
        for g in demo_goals("demo") {
            g.validate().unwrap();
        }
    }

    #[test]
    fn seeding_populates_store() {
        let store = MemoryStore::new();
        seed_demo(&store, "demo").unwrap();
        let subs = store.list_subscriptions("demo").unwrap();
        assert_eq!(subs.len(), 6);
        assert_eq!(subs[0].id, "netflix-1");
        assert_eq!(store.list_goals("demo").unwrap().len(), 3);
        let notes = store.list_notifications("demo").unwrap();
        assert_eq!(notes.len(), 4);
        assert_eq!(notes[0].id, "1");
        assert!(store.find_user("demo").unwrap().is_some());
    }
}
