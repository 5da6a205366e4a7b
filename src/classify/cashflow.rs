//! Six-month cashflow projection.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ClassifyError, finite, generate, unit_interval};
use crate::llm::LlmProvider;
use crate::model::Priority;

const CONTRACT: &str = "cashflow_projection";

pub const PROJECTION_MONTHS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthProjection {
    pub month: String,
    pub projected_income: f64,
    pub projected_expenses: f64,
    pub subscription_costs: f64,
    pub net_cashflow: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub impact: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowProjection {
    pub projections: Vec<MonthProjection>,
    pub insights: Vec<String>,
    /// Highest priority first; ties keep the model's order.
    pub recommendations: Vec<Recommendation>,
}

impl CashflowProjection {
    fn validate(&self) -> Result<(), ClassifyError> {
        if self.projections.len() != PROJECTION_MONTHS {
            return Err(ClassifyError::schema(
                CONTRACT,
                format!("expected {PROJECTION_MONTHS} projections, got {}", self.projections.len()),
            ));
        }
        for p in &self.projections {
            finite(CONTRACT, "projectedIncome", p.projected_income)?;
            finite(CONTRACT, "projectedExpenses", p.projected_expenses)?;
            finite(CONTRACT, "subscriptionCosts", p.subscription_costs)?;
            finite(CONTRACT, "netCashflow", p.net_cashflow)?;
            unit_interval(CONTRACT, "confidence", p.confidence)?;
        }
        for r in &self.recommendations {
            finite(CONTRACT, "impact", r.impact)?;
        }
        Ok(())
    }
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "projections": {
                "type": "array",
                "minItems": PROJECTION_MONTHS,
                "maxItems": PROJECTION_MONTHS,
                "items": {
                    "type": "object",
                    "properties": {
                        "month": { "type": "string" },
                        "projectedIncome": { "type": "number" },
                        "projectedExpenses": { "type": "number" },
                        "subscriptionCosts": { "type": "number" },
                        "netCashflow": { "type": "number" },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                    },
                    "required": ["month", "projectedIncome", "projectedExpenses", "subscriptionCosts", "netCashflow", "confidence"]
                }
            },
            "insights": { "type": "array", "items": { "type": "string" } },
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "action": { "type": "string" },
                        "impact": { "type": "number" },
                        "priority": { "type": "string", "enum": ["high", "medium", "low"] }
                    },
                    "required": ["action", "impact", "priority"]
                }
            }
        },
        "required": ["projections", "insights", "recommendations"]
    })
}

fn prompt(historical: &Value, subscriptions: &Value) -> String {
    let historical = serde_json::to_string_pretty(historical).unwrap_or_default();
    let subscriptions = serde_json::to_string_pretty(subscriptions).unwrap_or_default();
    format!(
        "Create a {PROJECTION_MONTHS}-month cashflow projection based on this data:\n\n\
         Historical financial data:\n{historical}\n\n\
         Current subscriptions:\n{subscriptions}\n\n\
         Generate:\n\
         1. Monthly projections for the next {PROJECTION_MONTHS} months\n\
         2. Include seasonal variations and trends\n\
         3. Factor in subscription costs and potential cancellations\n\
         4. Provide confidence levels for each projection\n\
         5. Identify optimization opportunities\n\
         6. Recommend actions to improve cashflow\n\n\
         Consider:\n\
         - Income stability and growth trends\n\
         - Expense patterns and seasonality\n\
         - Subscription optimization opportunities\n\
         - Emergency fund requirements"
    )
}

pub async fn project(
    llm: &LlmProvider,
    historical: &Value,
    subscriptions: &Value,
) -> Result<CashflowProjection, ClassifyError> {
    let mut projection: CashflowProjection =
        generate(llm, CONTRACT, None, &prompt(historical, subscriptions), &schema()).await?;
    projection.validate()?;
    // Stable: equal priorities keep their relative order.
    projection.recommendations.sort_by_key(|r| r.priority);
    Ok(projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;

    fn month(i: usize) -> Value {
        json!({
            "month": format!("2024-{:02}", i + 1),
            "projectedIncome": 4200.0,
            "projectedExpenses": 3100.0,
            "subscriptionCosts": 128.94,
            "netCashflow": 971.06,
            "confidence": 0.8
        })
    }

    fn reply(months: usize) -> Value {
        json!({
            "projections": (0..months).map(month).collect::<Vec<_>>(),
            "insights": ["Stable income"],
            "recommendations": [
                { "action": "Review news", "impact": 12.99, "priority": "low" },
                { "action": "Cancel gym", "impact": 29.99, "priority": "high" },
                { "action": "Downgrade Adobe", "impact": 43.0, "priority": "medium" },
                { "action": "Cancel news", "impact": 12.99, "priority": "high" }
            ]
        })
    }

    async fn run(reply: Value) -> Result<CashflowProjection, ClassifyError> {
        let llm = LlmProvider::Dummy(DummyProvider::scripted(reply));
        project(&llm, &json!({"income": [4200]}), &json!([])).await
    }

    #[tokio::test]
    async fn recommendations_sorted_stably_by_priority() {
        let p = run(reply(6)).await.unwrap();
        let actions: Vec<_> = p.recommendations.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["Cancel gym", "Cancel news", "Downgrade Adobe", "Review news"]);
    }

    #[tokio::test]
    async fn wrong_month_count_rejected() {
        assert!(matches!(run(reply(5)).await, Err(ClassifyError::Schema { .. })));
        assert!(matches!(run(reply(7)).await, Err(ClassifyError::Schema { .. })));
    }

    #[tokio::test]
    async fn confidence_out_of_range_rejected() {
        let mut r = reply(6);
        r["projections"][2]["confidence"] = json!(1.5);
        assert!(matches!(run(r).await, Err(ClassifyError::Schema { .. })));
    }
}
