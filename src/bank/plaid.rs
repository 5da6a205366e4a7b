//! Plaid REST client.
//!
//! Credentials travel as `PLAID-CLIENT-ID` / `PLAID-SECRET` headers on every
//! call. Request and response bodies are private wire types; callers get
//! [`LinkedItem`], [`BankAccount`] and [`BankTransaction`] back.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{BankError, BankTransaction, LinkedItem};
use crate::config::PlaidConfig;
use crate::model::BankAccount;

/// Page size for `/transactions/get`.
const PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone)]
pub struct PlaidClient {
    client: Client,
    base_url: String,
    client_id: String,
    secret: String,
    client_name: String,
    country_codes: Vec<String>,
    language: String,
    webhook_url: Option<String>,
}

impl PlaidClient {
    pub fn new(config: &PlaidConfig, client_id: String, secret: String) -> Result<Self, BankError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BankError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            client_id,
            secret,
            client_name: config.client_name.clone(),
            country_codes: config.country_codes.clone(),
            language: config.language.clone(),
            webhook_url: config.webhook_url.clone(),
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, BankError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "plaid request");
        let response = self
            .client
            .post(&url)
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", &self.secret)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "plaid request failed (transport)");
                BankError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => BankError::Api {
                    status: status.as_u16(),
                    code: env.error_code,
                    message: env.error_message,
                },
                Err(_) => BankError::Api {
                    status: status.as_u16(),
                    code: "UNKNOWN".into(),
                    message: text,
                },
            };
            error!(%url, error = %err, "plaid returned an error");
            return Err(err);
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BankError::Transport(format!("failed to parse {path} response: {e}")))
    }

    pub async fn create_link_token(&self, user_id: &str) -> Result<String, BankError> {
        let body = LinkTokenCreateRequest {
            user: LinkUser { client_user_id: user_id },
            client_name: &self.client_name,
            products: &["transactions"],
            country_codes: &self.country_codes,
            language: &self.language,
            webhook: self.webhook_url.as_deref(),
            account_filters: AccountFilters {
                depository: DepositoryFilter { account_subtypes: &["checking", "savings"] },
            },
        };
        let resp: LinkTokenCreateResponse = self.post("/link/token/create", &body).await?;
        Ok(resp.link_token)
    }

    pub async fn exchange_public_token(&self, public_token: &str) -> Result<LinkedItem, BankError> {
        let resp: ExchangeResponse = self
            .post("/item/public_token/exchange", &ExchangeRequest { public_token })
            .await?;
        Ok(LinkedItem { access_token: resp.access_token, item_id: resp.item_id })
    }

    pub async fn accounts(&self, access_token: &str) -> Result<Vec<BankAccount>, BankError> {
        let resp: AccountsResponse = self.post("/accounts/get", &AccessTokenRequest { access_token }).await?;
        Ok(resp.accounts)
    }

    /// Every transaction in the range, following `offset` until
    /// `total_transactions` is reached.
    pub async fn transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BankTransaction>, BankError> {
        let mut out = Vec::new();
        loop {
            let body = TransactionsGetRequest {
                access_token,
                start_date: start,
                end_date: end,
                options: TransactionsOptions { count: PAGE_SIZE, offset: out.len() as u32 },
            };
            let page: TransactionsGetResponse = self.post("/transactions/get", &body).await?;
            let fetched = page.transactions.len();
            out.extend(page.transactions);
            debug!(fetched, so_far = out.len(), total = page.total_transactions, "plaid transactions page");
            if fetched == 0 || out.len() >= page.total_transactions {
                break;
            }
        }
        Ok(out)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct LinkUser<'a> {
    client_user_id: &'a str,
}

#[derive(Serialize)]
struct DepositoryFilter<'a> {
    account_subtypes: &'a [&'a str],
}

#[derive(Serialize)]
struct AccountFilters<'a> {
    depository: DepositoryFilter<'a>,
}

#[derive(Serialize)]
struct LinkTokenCreateRequest<'a> {
    user: LinkUser<'a>,
    client_name: &'a str,
    products: &'a [&'a str],
    country_codes: &'a [String],
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook: Option<&'a str>,
    account_filters: AccountFilters<'a>,
}

#[derive(Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<BankAccount>,
}

#[derive(Serialize)]
struct TransactionsOptions {
    count: u32,
    offset: u32,
}

#[derive(Serialize)]
struct TransactionsGetRequest<'a> {
    access_token: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    options: TransactionsOptions,
}

#[derive(Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<BankTransaction>,
    total_transactions: usize,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error_code: String,
    error_message: String,
}
