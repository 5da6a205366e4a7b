//! Domain data model shared by the store, adapters and HTTP layer.
//!
//! Wire names are camelCase to match what the dashboard sends and expects.

mod chat;
mod notification;
mod savings;
mod subscription;
mod transaction;
mod user;

pub use chat::{ActionKind, ChatAction, ChatMessage, ChatReply, Role};
pub use notification::{Notification, NotificationCategory, Severity};
pub use savings::{CancellationEvent, SavingsGoal};
pub use subscription::{
    CancellationDifficulty, CancellationMethod, Frequency, Subscription, SubscriptionStatus,
    UsageLevel, slugify,
};
pub use transaction::Transaction;
pub use user::{BankAccount, User};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections raised at the ingestion boundary, before a record can reach
/// the store or the domain logic.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be a finite, non-negative number (got {value})")]
    Amount { field: &'static str, value: f64 },
    #[error("confidence must be within [0, 1] (got {0})")]
    Confidence(f64),
}

/// Shared three-level priority used by savings goals and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

pub(crate) fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Amount { field, value })
    }
}

pub(crate) fn check_not_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}
