//! Subscription domain logic — pure aggregate metrics.
//!
//! Money is summed in integer cents so totals are exact and independent of
//! record order.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::{CancellationEvent, SavingsGoal, Subscription, SubscriptionStatus};

/// Aggregates shown on the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendSummary {
    /// Sum of amounts over non-cancelled subscriptions.
    pub total_monthly_spend: f64,
    /// Subscriptions currently marked unused, in input order.
    pub unused_subscriptions: Vec<Subscription>,
    /// Sum of amounts over the unused subset.
    pub potential_savings: f64,
    /// Category → summed amount over non-cancelled subscriptions.
    pub category_breakdown: BTreeMap<String, f64>,
}

pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Compute the dashboard aggregates for `subscriptions`.
///
/// Records are assumed validated; see [`Subscription::validate`].
pub fn summarize(subscriptions: &[Subscription]) -> SpendSummary {
    let mut total = 0i64;
    let mut unused_total = 0i64;
    let mut unused = Vec::new();
    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();

    for sub in subscriptions {
        if sub.status == SubscriptionStatus::Cancelled {
            continue;
        }
        let cents = to_cents(sub.amount);
        total += cents;
        *by_category.entry(sub.category.clone()).or_default() += cents;
        if sub.status == SubscriptionStatus::Unused {
            unused_total += cents;
            unused.push(sub.clone());
        }
    }

    SpendSummary {
        total_monthly_spend: from_cents(total),
        unused_subscriptions: unused,
        potential_savings: from_cents(unused_total),
        category_breakdown: by_category.into_iter().map(|(k, v)| (k, from_cents(v))).collect(),
    }
}

/// Twelve months of a monthly amount.
pub fn annual_savings(monthly: f64) -> f64 {
    from_cents(to_cents(monthly) * 12)
}

/// Running total saved across cancellation events.
pub fn total_saved(events: &[CancellationEvent]) -> f64 {
    from_cents(events.iter().map(|e| to_cents(e.monthly_amount)).sum())
}

/// Goal completion in percent, clamped to `[0, 100]`.
pub fn goal_progress(goal: &SavingsGoal) -> f64 {
    if goal.target_amount <= 0.0 {
        return 100.0;
    }
    (goal.current_amount / goal.target_amount * 100.0).clamp(0.0, 100.0)
}

/// Additional savings expected by year end if the average monthly rate since
/// the first cancellation holds.
pub fn year_end_projection(events: &[CancellationEvent], today: NaiveDate) -> f64 {
    let Some(first) = events.iter().map(|e| e.at.date_naive()).min() else {
        return 0.0;
    };
    let months_of_data = (today.year() - first.year()) * 12 + today.month() as i32
        - first.month() as i32
        + 1;
    let remaining_months = 12 - today.month() as i64;
    let monthly_average = to_cents(total_saved(events)) / i64::from(months_of_data.max(1));
    from_cents(monthly_average * remaining_months)
}
