//! In-process aggregator with canned data. Transaction dates are relative
//! to today so import windows behave like the real thing.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::{BankError, BankTransaction, LinkedItem};
use crate::model::BankAccount;

const ACCESS_PREFIX: &str = "access-dummy-";

#[derive(Debug, Clone)]
pub struct DummyBank {
    pub accounts: Vec<BankAccount>,
    pub transactions: Vec<BankTransaction>,
}

impl Default for DummyBank {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        let tx = |id: &str, days_ago: i64, name: &str, merchant: &str, amount: f64| BankTransaction {
            transaction_id: id.to_string(),
            account_id: "dummy-checking".to_string(),
            amount,
            iso_currency_code: Some("USD".to_string()),
            unofficial_currency_code: None,
            date: today - Duration::days(days_ago),
            name: name.to_string(),
            merchant_name: Some(merchant.to_string()),
            category: Some(vec!["Service".to_string(), "Subscription".to_string()]),
            pending: days_ago < 2,
        };
        Self {
            accounts: vec![BankAccount {
                account_id: "dummy-checking".into(),
                name: "Checking".into(),
                official_name: Some("Dummy Everyday Checking".into()),
                mask: Some("0000".into()),
                kind: "depository".into(),
                subtype: Some("checking".into()),
            }],
            transactions: vec![
                tx("dummy-tx-1", 3, "NETFLIX.COM", "Netflix", 15.99),
                tx("dummy-tx-2", 10, "SPOTIFY USA", "Spotify", 11.99),
                tx("dummy-tx-3", 40, "NETFLIX.COM", "Netflix", 15.99),
                tx("dummy-tx-4", 100, "ADOBE *CREATIVE CLD", "Adobe", 52.99),
            ],
        }
    }
}

impl DummyBank {
    pub fn create_link_token(&self, user_id: &str) -> Result<String, BankError> {
        Ok(format!("link-dummy-{user_id}-{}", Uuid::new_v4()))
    }

    /// The item id is derived from the public token so tests can address it.
    pub fn exchange_public_token(&self, public_token: &str) -> Result<LinkedItem, BankError> {
        if public_token.trim().is_empty() {
            return Err(BankError::Api {
                status: 400,
                code: "INVALID_PUBLIC_TOKEN".into(),
                message: "public token is empty".into(),
            });
        }
        Ok(LinkedItem {
            access_token: format!("{ACCESS_PREFIX}{public_token}"),
            item_id: format!("item-{public_token}"),
        })
    }

    fn check_access(access_token: &str) -> Result<(), BankError> {
        if access_token.starts_with(ACCESS_PREFIX) {
            Ok(())
        } else {
            Err(BankError::Api {
                status: 400,
                code: "INVALID_ACCESS_TOKEN".into(),
                message: "unknown access token".into(),
            })
        }
    }

    pub fn accounts(&self, access_token: &str) -> Result<Vec<BankAccount>, BankError> {
        Self::check_access(access_token)?;
        Ok(self.accounts.clone())
    }

    pub fn transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BankTransaction>, BankError> {
        Self::check_access(access_token)?;
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_then_fetch_window() {
        let bank = DummyBank::default();
        let item = bank.exchange_public_token("public-1").unwrap();
        assert_eq!(item.item_id, "item-public-1");

        let today = Utc::now().date_naive();
        let recent = bank.transactions(&item.access_token, today - Duration::days(30), today).unwrap();
        assert_eq!(recent.len(), 2);
        let all = bank.transactions(&item.access_token, today - Duration::days(180), today).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn foreign_access_token_rejected() {
        let bank = DummyBank::default();
        assert!(matches!(bank.accounts("access-sandbox-x"), Err(BankError::Api { .. })));
        assert!(bank.exchange_public_token(" ").is_err());
    }
}
