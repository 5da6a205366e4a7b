use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Priority, ValidationError, check_amount, check_not_empty};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: NaiveDate,
    pub priority: Priority,
}

impl SavingsGoal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_not_empty("id", &self.id)?;
        check_not_empty("name", &self.name)?;
        check_amount("targetAmount", self.target_amount)?;
        check_amount("currentAmount", self.current_amount)
    }
}

/// One accepted cancellation. The user's total saved is the sum of these,
/// so it can only grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationEvent {
    pub user_id: String,
    pub subscription_id: String,
    pub monthly_amount: f64,
    pub at: DateTime<Utc>,
}
