//! Transaction analysis: find recurring charges in a batch of transactions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{ClassifyError, finite, generate, unit_interval};
use crate::domain;
use crate::llm::LlmProvider;
use crate::model::{
    CancellationDifficulty, CancellationMethod, Frequency, Subscription, SubscriptionStatus,
    Transaction, UsageLevel, ValidationError, slugify,
};

const CONTRACT: &str = "transaction_analysis";

// ── input ─────────────────────────────────────────────────────────────────────

/// What the model sees of one transaction. Accepts both the dashboard's
/// camelCase shape and the aggregator's snake_case one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "merchant_name", skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
}

impl TransactionHint {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_name = [&self.name, &self.merchant_name]
            .into_iter()
            .any(|n| n.as_deref().is_some_and(|n| !n.trim().is_empty()));
        if !has_name {
            return Err(ValidationError::Empty { field: "name" });
        }
        if !self.amount.is_finite() {
            return Err(ValidationError::Amount { field: "amount", value: self.amount });
        }
        Ok(())
    }
}

impl From<&Transaction> for TransactionHint {
    fn from(t: &Transaction) -> Self {
        Self {
            name: Some(t.name.clone()),
            merchant_name: t.merchant_name.clone(),
            amount: t.amount,
            date: Some(t.date.to_string()),
            category: t.category.clone(),
        }
    }
}

// ── output contract ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub cancellation_difficulty: CancellationDifficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSubscription {
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub category: String,
    pub confidence: f64,
    pub is_recurring: bool,
    pub merchant_info: MerchantInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub subscriptions: Vec<CandidateSubscription>,
    pub insights: Vec<String>,
    pub total_monthly_spend: f64,
    pub potential_savings: f64,
}

impl TransactionAnalysis {
    fn validate(&self) -> Result<(), ClassifyError> {
        for (i, c) in self.subscriptions.iter().enumerate() {
            if c.name.trim().is_empty() {
                return Err(ClassifyError::schema(CONTRACT, format!("subscriptions[{i}].name is empty")));
            }
            finite(CONTRACT, "amount", c.amount)?;
            if c.amount < 0.0 {
                return Err(ClassifyError::schema(
                    CONTRACT,
                    format!("subscriptions[{i}].amount {} is negative", c.amount),
                ));
            }
            unit_interval(CONTRACT, "confidence", c.confidence)?;
        }
        finite(CONTRACT, "totalMonthlySpend", self.total_monthly_spend)?;
        finite(CONTRACT, "potentialSavings", self.potential_savings)?;
        Ok(())
    }
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "subscriptions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "amount": { "type": "number" },
                        "frequency": { "type": "string", "enum": ["monthly", "yearly", "weekly"] },
                        "category": { "type": "string" },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                        "isRecurring": { "type": "boolean" },
                        "merchantInfo": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "website": { "type": "string" },
                                "cancellationDifficulty": { "type": "string", "enum": ["easy", "medium", "hard"] }
                            },
                            "required": ["name", "cancellationDifficulty"]
                        }
                    },
                    "required": ["name", "amount", "frequency", "category", "confidence", "isRecurring", "merchantInfo"]
                }
            },
            "insights": { "type": "array", "items": { "type": "string" } },
            "totalMonthlySpend": { "type": "number" },
            "potentialSavings": { "type": "number" }
        },
        "required": ["subscriptions", "insights", "totalMonthlySpend", "potentialSavings"]
    })
}

fn prompt(transactions: &[TransactionHint]) -> String {
    let data = serde_json::to_string_pretty(transactions).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Analyze these bank transactions and identify recurring subscriptions:\n\n{data}\n\n\
         For each recurring subscription found:\n\
         1. Extract the service name, amount, and frequency\n\
         2. Categorize the service (Entertainment, Software, Health, News, etc.)\n\
         3. Assess confidence level (0-1) that this is a subscription\n\
         4. Determine cancellation difficulty based on known merchant practices\n\
         5. Provide merchant website if known\n\n\
         Also provide:\n\
         - Insights about spending patterns\n\
         - Total monthly subscription spend\n\
         - Potential savings from unused/duplicate services\n\n\
         Focus on identifying true recurring subscriptions, not one-time purchases."
    )
}

/// Ask the model for candidate subscriptions in `transactions`.
pub async fn analyze(
    llm: &LlmProvider,
    transactions: &[TransactionHint],
) -> Result<TransactionAnalysis, ClassifyError> {
    let analysis: TransactionAnalysis =
        generate(llm, CONTRACT, None, &prompt(transactions), &schema()).await?;
    analysis.validate()?;
    debug!(
        transactions = transactions.len(),
        candidates = analysis.subscriptions.len(),
        "transaction analysis decoded"
    );
    Ok(analysis)
}

// ── acceptance ────────────────────────────────────────────────────────────────

/// Turn recurring candidates into subscription records for `user_id`.
///
/// A candidate matching an existing record (same lowercase name, or same
/// derived id) updates that record's amount, confidence, frequency,
/// category and difficulty; its id, status and usage are kept. New records
/// start active with medium usage. Non-recurring candidates are dropped, as
/// are later duplicates within the batch.
pub fn accept(
    analysis: &TransactionAnalysis,
    user_id: &str,
    existing: &[Subscription],
) -> Vec<Subscription> {
    let mut out: Vec<Subscription> = Vec::new();
    for c in analysis.subscriptions.iter().filter(|c| c.is_recurring) {
        let slug = slugify(&c.name);
        let lower = c.name.to_lowercase();
        let matched = existing
            .iter()
            .find(|s| s.name.to_lowercase() == lower || (!slug.is_empty() && s.id == slug));

        let record = match matched {
            Some(prev) => Subscription {
                amount: c.amount,
                frequency: c.frequency,
                category: c.category.clone(),
                confidence: c.confidence,
                cancellation_difficulty: c.merchant_info.cancellation_difficulty,
                website: c.merchant_info.website.clone().or_else(|| prev.website.clone()),
                ..prev.clone()
            },
            None => {
                let website = c.merchant_info.website.clone();
                Subscription {
                    id: if slug.is_empty() { format!("sub-{}", out.len() + 1) } else { slug },
                    user_id: user_id.to_string(),
                    name: c.name.clone(),
                    amount: c.amount,
                    frequency: c.frequency,
                    category: c.category.clone(),
                    status: SubscriptionStatus::Active,
                    usage: UsageLevel::Medium,
                    confidence: c.confidence,
                    cancellation_difficulty: c.merchant_info.cancellation_difficulty,
                    cancellation_method: if website.is_some() {
                        CancellationMethod::Online
                    } else {
                        CancellationMethod::Unknown
                    },
                    cancellation_contact: website.clone(),
                    website,
                    last_charge: None,
                    next_charge: None,
                }
            }
        };

        if out.iter().any(|s| s.id == record.id) {
            continue;
        }
        out.push(record);
    }
    info!(user_id, accepted = out.len(), "classifier candidates accepted");
    out
}

/// Response body of the analysis route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub subscriptions: Vec<Subscription>,
    pub insights: Vec<String>,
    /// Recomputed from the accepted records, not taken from the model.
    pub total_monthly_spend: f64,
    /// The model's estimate, clamped to `[0, total_monthly_spend]`.
    pub potential_savings: f64,
}

impl AnalysisReport {
    pub fn new(analysis: TransactionAnalysis, accepted: Vec<Subscription>) -> Self {
        let total = domain::summarize(&accepted).total_monthly_spend;
        let estimate = domain::from_cents(domain::to_cents(analysis.potential_savings));
        Self {
            subscriptions: accepted,
            insights: analysis.insights,
            total_monthly_spend: total,
            potential_savings: estimate.clamp(0.0, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;

    fn candidate(name: &str, amount: f64, recurring: bool) -> Value {
        json!({
            "name": name,
            "amount": amount,
            "frequency": "monthly",
            "category": "Entertainment",
            "confidence": 0.9,
            "isRecurring": recurring,
            "merchantInfo": { "name": name, "cancellationDifficulty": "easy" }
        })
    }

    fn reply(candidates: Vec<Value>) -> Value {
        json!({
            "subscriptions": candidates,
            "insights": ["Two streaming services"],
            "totalMonthlySpend": 27.98,
            "potentialSavings": 500.0
        })
    }

    fn llm(reply: Value) -> LlmProvider {
        LlmProvider::Dummy(DummyProvider::scripted(reply))
    }

    fn hint(name: &str) -> TransactionHint {
        TransactionHint {
            name: Some(name.into()),
            merchant_name: None,
            amount: 15.99,
            date: Some("2024-01-15".into()),
            category: vec![],
        }
    }

    #[tokio::test]
    async fn valid_output_decodes() {
        let llm = llm(reply(vec![candidate("Netflix", 15.99, true)]));
        let analysis = analyze(&llm, &[hint("NETFLIX.COM")]).await.unwrap();
        assert_eq!(analysis.subscriptions.len(), 1);
        assert_eq!(analysis.subscriptions[0].frequency, Frequency::Monthly);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_schema_error() {
        let mut c = candidate("Netflix", 15.99, true);
        c["confidence"] = json!(1.3);
        let err = analyze(&llm(reply(vec![c])), &[hint("x")]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Schema { .. }), "{err}");
    }

    #[tokio::test]
    async fn unknown_frequency_is_schema_error() {
        let mut c = candidate("Netflix", 15.99, true);
        c["frequency"] = json!("daily");
        let err = analyze(&llm(reply(vec![c])), &[hint("x")]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Schema { .. }), "{err}");
    }

    #[tokio::test]
    async fn provider_failure_is_not_a_schema_error() {
        let llm = LlmProvider::Dummy(DummyProvider::default());
        let err = analyze(&llm, &[hint("x")]).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Provider(_)));
    }

    #[test]
    fn acceptance_keeps_recurring_and_preserves_status() {
        let analysis: TransactionAnalysis = serde_json::from_value(reply(vec![
            candidate("Netflix", 17.99, true),
            candidate("Corner Bakery", 6.50, false),
            candidate("Disney Plus", 8.99, true),
            candidate("disney plus", 9.99, true),
        ]))
        .unwrap();

        let existing = crate::store::seed::demo_subscriptions("u1");
        let accepted = accept(&analysis, "u1", &existing);
        assert_eq!(accepted.len(), 2);

        let netflix = &accepted[0];
        assert_eq!(netflix.id, "netflix-1");
        assert_eq!(netflix.amount, 17.99);
        assert_eq!(netflix.usage, UsageLevel::High);

        let disney = &accepted[1];
        assert_eq!(disney.id, "disney-plus");
        assert_eq!(disney.amount, 8.99);
        assert_eq!(disney.status, SubscriptionStatus::Active);
        assert_eq!(disney.usage, UsageLevel::Medium);
        assert!(disney.validate().is_ok());
    }

    #[test]
    fn report_recomputes_total_and_clamps_savings() {
        let analysis: TransactionAnalysis =
            serde_json::from_value(reply(vec![candidate("Netflix", 15.99, true), candidate("Hulu", 7.99, true)]))
                .unwrap();
        let accepted = accept(&analysis, "u1", &[]);
        let report = AnalysisReport::new(analysis, accepted);
        assert_eq!(report.total_monthly_spend, 23.98);
        assert_eq!(report.potential_savings, 23.98);
    }

    #[test]
    fn hint_requires_a_name() {
        let mut h = hint("x");
        h.name = None;
        assert!(h.validate().is_err());
        h.merchant_name = Some("Spotify".into());
        assert!(h.validate().is_ok());
    }
}
