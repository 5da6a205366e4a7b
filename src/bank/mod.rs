//! Bank-link adapter.
//!
//! `BankProvider` is an enum over aggregator backends, built once at startup
//! by [`build`]. It only speaks the aggregator's token-exchange and
//! read-only data APIs; persistence of what it returns lives in [`sync`].
//!
//! - [`plaid`] — Plaid REST client.
//! - [`dummy`] — canned accounts and transactions for tests and demos.
//! - [`crypto`] — sealing of access tokens at rest.

pub mod crypto;
pub mod dummy;
pub mod plaid;
pub mod sync;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{PlaidConfig, Secrets};
use crate::model::{BankAccount, Transaction};
use crate::store::StoreError;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BankError {
    #[error("unknown bank provider: {0}")]
    UnknownProvider(String),
    #[error("bank provider misconfigured: {0}")]
    Config(String),
    #[error("bank request failed: {0}")]
    Transport(String),
    #[error("bank API error {code} (HTTP {status}): {message}")]
    Api { status: u16, code: String, message: String },
    #[error("access token sealing failed: {0}")]
    Crypto(String),
    #[error("user {0} has no linked bank item")]
    NotLinked(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ── Shared wire shapes ────────────────────────────────────────────────────────

/// Result of exchanging a public token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedItem {
    pub access_token: String,
    pub item_id: String,
}

/// A transaction as the aggregator reports it, before it is bound to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: f64,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub unofficial_currency_code: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub pending: bool,
}

impl BankTransaction {
    pub fn into_transaction(self, user_id: &str) -> Transaction {
        Transaction {
            id: self.transaction_id,
            user_id: user_id.to_string(),
            account_id: self.account_id,
            amount: self.amount,
            currency: self.iso_currency_code.or(self.unofficial_currency_code),
            date: self.date,
            name: self.name,
            merchant_name: self.merchant_name,
            category: self.category.unwrap_or_default(),
            pending: self.pending,
        }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum BankProvider {
    Plaid(plaid::PlaidClient),
    Dummy(dummy::DummyBank),
}

impl BankProvider {
    pub fn name(&self) -> &'static str {
        match self {
            BankProvider::Plaid(_) => "plaid",
            BankProvider::Dummy(_) => "dummy",
        }
    }

    /// Short-lived token the dashboard uses to open the link widget.
    pub async fn create_link_token(&self, user_id: &str) -> Result<String, BankError> {
        match self {
            BankProvider::Plaid(p) => p.create_link_token(user_id).await,
            BankProvider::Dummy(d) => d.create_link_token(user_id),
        }
    }

    pub async fn exchange_public_token(&self, public_token: &str) -> Result<LinkedItem, BankError> {
        match self {
            BankProvider::Plaid(p) => p.exchange_public_token(public_token).await,
            BankProvider::Dummy(d) => d.exchange_public_token(public_token),
        }
    }

    pub async fn accounts(&self, access_token: &str) -> Result<Vec<BankAccount>, BankError> {
        match self {
            BankProvider::Plaid(p) => p.accounts(access_token).await,
            BankProvider::Dummy(d) => d.accounts(access_token),
        }
    }

    /// Transactions dated within `[start, end]`, inclusive.
    pub async fn transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BankTransaction>, BankError> {
        match self {
            BankProvider::Plaid(p) => p.transactions(access_token, start, end).await,
            BankProvider::Dummy(d) => d.transactions(access_token, start, end),
        }
    }
}

/// Construct the configured provider. Plaid credentials come from the
/// environment only.
pub fn build(config: &PlaidConfig, secrets: &Secrets) -> Result<BankProvider, BankError> {
    match config.provider.as_str() {
        "dummy" => Ok(BankProvider::Dummy(dummy::DummyBank::default())),
        "plaid" => {
            let (Some(client_id), Some(secret)) = (&secrets.plaid_client_id, &secrets.plaid_secret)
            else {
                return Err(BankError::Config("PLAID_CLIENT_ID and PLAID_SECRET must be set".into()));
            };
            let client = plaid::PlaidClient::new(config, client_id.clone(), secret.clone())?;
            Ok(BankProvider::Plaid(client))
        }
        other => Err(BankError::UnknownProvider(other.to_string())),
    }
}
