use chrono::{NaiveDate, Utc};
use tempfile::TempDir;

use subsaver::model::{
    CancellationDifficulty, CancellationMethod, Frequency, Subscription, SubscriptionStatus,
    Transaction, UsageLevel, User,
};
use subsaver::store::Store;
use subsaver::store::seed::seed_demo;
use subsaver::store::sqlite::SqliteStore;

fn open(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&dir.path().join("subsaver.db")).unwrap()
}

fn sub(id: &str, amount: f64) -> Subscription {
    Subscription {
        id: id.into(),
        user_id: "u1".into(),
        name: id.into(),
        amount,
        frequency: Frequency::Monthly,
        category: "Software".into(),
        status: SubscriptionStatus::Active,
        usage: UsageLevel::Medium,
        confidence: 0.9,
        cancellation_difficulty: CancellationDifficulty::Easy,
        cancellation_method: CancellationMethod::Online,
        cancellation_contact: None,
        website: None,
        last_charge: None,
        next_charge: None,
    }
}

fn tx(id: &str, day: u32) -> Transaction {
    Transaction {
        id: id.into(),
        user_id: "u1".into(),
        account_id: "acc-1".into(),
        amount: 15.99,
        currency: Some("USD".into()),
        date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        name: "NETFLIX.COM".into(),
        merchant_name: Some("Netflix".into()),
        category: vec!["Service".into(), "Subscription".into()],
        pending: false,
    }
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        let mut user = User::new("u1", "u1@example.test");
        user.sealed_access_token = Some("nonce:cipher".into());
        user.item_id = Some("item-9".into());
        store.upsert_user(&user).unwrap();
        store.upsert_subscription(&sub("a", 4.99)).unwrap();
        store.upsert_transactions(&[tx("t1", 2)]).unwrap();
    }

    let store = open(&dir);
    let user = store.find_user_by_item("item-9").unwrap().unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.sealed_access_token.as_deref(), Some("nonce:cipher"));
    assert_eq!(store.list_subscriptions("u1").unwrap()[0].amount, 4.99);
    let txs = store.list_transactions("u1").unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].category, vec!["Service", "Subscription"]);
    assert_eq!(txs[0].merchant(), "Netflix");
}

#[test]
fn subscription_upsert_preserves_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_subscription(&sub("a", 1.0)).unwrap();
    store.upsert_subscription(&sub("b", 2.0)).unwrap();
    store.upsert_subscription(&sub("a", 3.0)).unwrap();

    let list = store.list_subscriptions("u1").unwrap();
    let ids: Vec<_> = list.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(list[0].amount, 3.0);
}

#[test]
fn transactions_upsert_and_remove() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_transactions(&[tx("t1", 1), tx("t2", 9)]).unwrap();
    store.upsert_transactions(&[tx("t1", 1)]).unwrap();

    let list = store.list_transactions("u1").unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, "t2");

    assert_eq!(store.remove_transactions(&["t2".into(), "nope".into()]).unwrap(), 1);
    assert_eq!(store.list_transactions("u1").unwrap().len(), 1);
}

#[test]
fn cancellation_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.upsert_subscription(&sub("gym", 29.99)).unwrap();
    let now = Utc::now();

    let event = store.cancel_and_record("u1", "gym", 1.0, now).unwrap().unwrap();
    assert_eq!(event.monthly_amount, 29.99);
    assert!(store.cancel_and_record("u1", "gym", 1.0, now).unwrap().is_none());
    assert!(store.find_subscription("u1", "gym").unwrap().unwrap().is_cancelled());

    let fallback = store.cancel_and_record("u1", "netflix-1", 15.99, now).unwrap().unwrap();
    assert_eq!(fallback.monthly_amount, 15.99);
    assert!(store.cancel_and_record("u1", "netflix-1", 15.99, now).unwrap().is_none());

    let events = store.list_cancellations("u1").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subscription_id, "gym");
}

#[test]
fn fallback_saving_is_neither_recounted_nor_replaced() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let now = Utc::now();
    store.cancel_and_record("u1", "gym-membership", 29.99, now).unwrap().unwrap();

    store.upsert_subscription(&sub("gym-membership", 9.99)).unwrap();
    assert!(store.cancel_and_record("u1", "gym-membership", 29.99, now).unwrap().is_none());
    assert!(store.find_subscription("u1", "gym-membership").unwrap().unwrap().is_cancelled());

    let events = store.list_cancellations("u1").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].monthly_amount, 29.99);
}

#[test]
fn seeded_notifications_can_be_read_and_dismissed() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    seed_demo(&store, "demo").unwrap();

    assert_eq!(store.list_subscriptions("demo").unwrap().len(), 6);
    assert_eq!(store.list_goals("demo").unwrap().len(), 3);

    let notes = store.list_notifications("demo").unwrap();
    assert_eq!(notes.len(), 4);
    assert_eq!(notes[0].id, "1");
    assert!(!notes[0].is_read);

    assert!(store.mark_notification_read("demo", "1").unwrap());
    assert!(store.list_notifications("demo").unwrap()[0].is_read);
    assert!(store.delete_notification("demo", "1").unwrap());
    assert!(!store.delete_notification("demo", "1").unwrap());
    assert_eq!(store.list_notifications("demo").unwrap().len(), 3);
}

#[test]
fn sessions_map_tokens_to_users() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.put_session("tok-1", "u1").unwrap();
    assert_eq!(store.session_user("tok-1").unwrap().as_deref(), Some("u1"));
    assert!(store.session_user("tok-2").unwrap().is_none());
}
