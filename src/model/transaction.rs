use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ValidationError, check_not_empty};

/// A single bank-posted charge, keyed by the aggregator's transaction id.
///
/// Positive amounts are money leaving the account, following the
/// aggregator's sign convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub date: NaiveDate,
    /// Raw statement descriptor.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    /// Category path, most general first.
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub pending: bool,
}

impl Transaction {
    /// Cleaned merchant name when the aggregator has one, else the raw
    /// descriptor.
    pub fn merchant(&self) -> &str {
        self.merchant_name.as_deref().filter(|m| !m.is_empty()).unwrap_or(&self.name)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_not_empty("id", &self.id)?;
        check_not_empty("userId", &self.user_id)?;
        if !self.amount.is_finite() {
            return Err(ValidationError::Amount { field: "amount", value: self.amount });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(merchant: Option<&str>) -> Transaction {
        Transaction {
            id: "tx-1".into(),
            user_id: "u1".into(),
            account_id: "acc-1".into(),
            amount: 15.99,
            currency: Some("USD".into()),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            name: "NETFLIX.COM 866-579-7172".into(),
            merchant_name: merchant.map(Into::into),
            category: vec!["Service".into(), "Subscription".into()],
            pending: false,
        }
    }

    #[test]
    fn merchant_prefers_clean_name() {
        assert_eq!(tx(Some("Netflix")).merchant(), "Netflix");
        assert_eq!(tx(None).merchant(), "NETFLIX.COM 866-579-7172");
        assert_eq!(tx(Some("")).merchant(), "NETFLIX.COM 866-579-7172");
    }

    #[test]
    fn refunds_are_valid() {
        let mut t = tx(None);
        t.amount = -5.0;
        assert!(t.validate().is_ok());
        t.amount = f64::NAN;
        assert!(t.validate().is_err());
    }
}
