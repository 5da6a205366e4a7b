//! Cancellation orchestrator.
//!
//! Maps a known subscription id to the merchant's cancellation method and a
//! human-actionable step list. The merchant is never contacted; every issued
//! flow is left [`TaskStatus::Pending`] for the user to complete. On success
//! the saving is recorded through [`Store::cancel_and_record`], which makes a
//! repeated cancellation a no-op for the running total.

pub mod catalog;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain;
use crate::locale::Locale;
use crate::model::{CancellationEvent, CancellationMethod};
use crate::store::{Store, StoreError};
use catalog::CatalogEntry;

#[derive(Debug, Error)]
pub enum CancelError {
    #[error("subscriptionId and subscriptionName are required")]
    Validation,
    #[error("no cancellation flow for subscription '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State of the merchant-side cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Accepted for compatibility; the acting user comes from auth.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Steps for one merchant.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationPlan {
    pub method: CancellationMethod,
    pub steps: Vec<String>,
    pub confirmation: String,
}

/// Build the step list for `entry`.
pub fn plan(entry: &CatalogEntry, locale: Locale) -> CancellationPlan {
    let (steps, confirmation) = match (entry.method, entry.phone, entry.email) {
        (CancellationMethod::Online, _, _) => {
            (locale.steps_online(entry.url), locale.confirmation_online(entry.name))
        }
        (CancellationMethod::Phone, Some(phone), _) => {
            let mut steps = locale.steps_phone(phone);
            if !entry.retention_offers.is_empty() {
                steps.push(locale.retention_warning().to_string());
            }
            (steps, locale.confirmation_phone(entry.name))
        }
        (CancellationMethod::Email, _, Some(email)) => {
            (locale.steps_email(email), locale.confirmation_email(entry.name))
        }
        _ => (locale.steps_unknown(), locale.confirmation_unknown(entry.name)),
    };
    CancellationPlan { method: entry.method, steps, confirmation }
}

/// Response body of a successful `POST /cancel-subscription`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
    pub saved_amount: f64,
    pub annual_savings: f64,
    pub cancellation_confirmation: String,
    pub next_steps: Vec<String>,
    pub method: CancellationMethod,
    pub status: TaskStatus,
    /// False when this subscription had already been counted.
    pub savings_recorded: bool,
    #[serde(skip)]
    pub event: Option<CancellationEvent>,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn Store>,
    delay: Duration,
    locale: Locale,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, delay: Duration, locale: Locale) -> Self {
        Self { store, delay, locale }
    }

    pub async fn cancel(&self, user_id: &str, req: &CancelRequest) -> Result<CancelOutcome, CancelError> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let (Some(id), Some(name)) = (present(&req.subscription_id), present(&req.subscription_name)) else {
            warn!(user_id, "cancellation request missing id or name");
            return Err(CancelError::Validation);
        };
        let Some(entry) = catalog::lookup(&id) else {
            warn!(user_id, subscription_id = %id, "cancellation requested for unknown subscription");
            return Err(CancelError::NotFound(id));
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let plan = plan(entry, self.locale);
        let event = self.store.cancel_and_record(user_id, entry.id, entry.amount, Utc::now())?;

        let monthly = entry.amount;
        let annual = domain::annual_savings(monthly);
        info!(
            user_id,
            subscription_id = entry.id,
            method = plan.method.as_str(),
            recorded = event.is_some(),
            reason = req.reason.as_deref().unwrap_or("not specified"),
            "cancellation flow issued"
        );

        Ok(CancelOutcome {
            success: true,
            message: self.locale.cancel_success(&name, monthly, annual),
            saved_amount: monthly,
            annual_savings: annual,
            cancellation_confirmation: plan.confirmation,
            next_steps: plan.steps,
            method: plan.method,
            status: TaskStatus::Pending,
            savings_recorded: event.is_some(),
            event,
        })
    }
}
