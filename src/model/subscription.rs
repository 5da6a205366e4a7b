use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ValidationError, check_amount, check_not_empty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

/// Lifecycle status. `Cancelled` is only ever set by the cancellation
/// orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Unused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Unused => "unused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationDifficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationMethod {
    Online,
    Phone,
    Email,
    Unknown,
}

impl CancellationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CancellationMethod::Online => "online",
            CancellationMethod::Phone => "phone",
            CancellationMethod::Email => "email",
            CancellationMethod::Unknown => "unknown",
        }
    }
}

/// A believed recurring charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    /// Merchant / service name as shown to the user.
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub category: String,
    pub status: SubscriptionStatus,
    pub usage: UsageLevel,
    pub confidence: f64,
    pub cancellation_difficulty: CancellationDifficulty,
    pub cancellation_method: CancellationMethod,
    /// URL, phone number or email address, depending on the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_charge: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_charge: Option<NaiveDate>,
}

impl Subscription {
    /// Enforce the record invariants. Called wherever a subscription enters
    /// the system: classifier acceptance, seeding, and store upserts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_not_empty("id", &self.id)?;
        check_not_empty("userId", &self.user_id)?;
        check_not_empty("name", &self.name)?;
        check_amount("amount", self.amount)?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::Confidence(self.confidence));
        }
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SubscriptionStatus::Cancelled
    }
}

/// Lowercase ASCII slug used to derive stable ids from merchant names:
/// `"Spotify Premium"` becomes `"spotify-premium"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
