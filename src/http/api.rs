//! Route handlers.
//!
//! Each handler receives [`AppState`] via [`State`], resolves the acting user
//! through an extractor, and converts adapter failures into [`ApiError`] at
//! this boundary. Nothing is retried.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::AppState;
use super::auth::{AuthUser, CurrentUser};
use super::error::ApiError;
use super::extract::ApiJson;
use super::webhook;
use crate::assistant;
use crate::bank::sync::{self, WebhookEvent, WebhookOutcome};
use crate::cancel::{CancelError, CancelOutcome, CancelRequest, catalog};
use crate::classify::analysis::{self, AnalysisReport, TransactionHint};
use crate::classify::cashflow::{self, CashflowProjection};
use crate::domain::{self, SpendSummary};
use crate::export::{self, ExportError, ExportFormat, ExportStats};
use crate::model::{
    CancellationEvent, CancellationMethod, ChatMessage, ChatReply, Notification, SavingsGoal,
    Subscription,
};

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub(super) struct AnalyzeRequest {
    #[serde(default)]
    transactions: Vec<TransactionHint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CashflowRequest {
    #[serde(default)]
    historical_data: Value,
    /// Falls back to the user's stored subscriptions when absent.
    #[serde(default)]
    subscriptions: Option<Value>,
}

#[derive(Deserialize)]
pub(super) struct ExchangeRequest {
    #[serde(default)]
    public_token: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ProgressRequest {
    amount: f64,
}

#[derive(Deserialize)]
pub(super) struct ExportRequest {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubscriptionsView {
    subscriptions: Vec<Subscription>,
    summary: SpendSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GoalView {
    #[serde(flatten)]
    goal: SavingsGoal,
    /// Percent complete, clamped to 100.
    progress: f64,
}

impl From<SavingsGoal> for GoalView {
    fn from(goal: SavingsGoal) -> Self {
        let progress = domain::goal_progress(&goal);
        Self { goal, progress }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SavingsView {
    total_saved: f64,
    annual_savings: f64,
    year_end_projection: f64,
    cancellations: Vec<CancellationEvent>,
    goals: Vec<GoalView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NotificationsView {
    notifications: Vec<Notification>,
    unread_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ExportView {
    format: ExportFormat,
    file_name: String,
    mime_type: &'static str,
    content: String,
    stats: ExportStats,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn storage(state: &AppState) -> impl Fn(crate::store::StoreError) -> ApiError + '_ {
    move |e| ApiError::storage(state.locale.storage_failed(), e)
}

// ── Status ────────────────────────────────────────────────────────────────────

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.store.backend(),
        "llm": state.llm.name(),
        "bank": state.bank.name(),
    }))
}

/// GET /ai-chat
pub(super) async fn chat_status() -> Json<Value> {
    Json(json!({
        "message": "AI Chat API endpoint is running",
        "availableEndpoints": { "POST": "Send a chat message and get AI response" },
    }))
}

// ── Assistant ─────────────────────────────────────────────────────────────────

/// POST /ai-chat
pub(super) async fn chat(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    debug!(%user_id, history = req.conversation_history.len(), "POST /ai-chat");
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest(state.locale.message_required().to_string()));
    }
    let chat_failed = |detail: String| ApiError::Chat {
        message: state.locale.chat_failure().to_string(),
        detail,
    };

    let subscriptions = state.store.list_subscriptions(&user_id).map_err(|e| chat_failed(e.to_string()))?;
    let reply = assistant::respond(
        &state.llm,
        state.locale,
        &subscriptions,
        &req.message,
        &req.conversation_history,
    )
    .await
    .map_err(|e| chat_failed(e.to_string()))?;
    Ok(Json(reply))
}

/// POST /chat/export
pub(super) async fn export_chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ExportRequest>,
) -> Result<Json<ExportView>, ApiError> {
    debug!(messages = req.messages.len(), format = req.format.as_str(), "POST /chat/export");
    let content = export::export(&req.messages, req.format, state.locale).map_err(|e| match e {
        ExportError::Empty | ExportError::Unparseable(_) | ExportError::Parse(_) => {
            ApiError::BadRequest(e.to_string())
        }
        ExportError::Write(_) => ApiError::upstream("export failed", e),
    })?;
    Ok(Json(ExportView {
        format: req.format,
        file_name: req.format.file_name(Utc::now()),
        mime_type: req.format.mime_type(),
        content,
        stats: export::stats(&req.messages),
    }))
}

// ── Classification ────────────────────────────────────────────────────────────

/// POST /analyze-transactions
///
/// Classifies the posted transactions, or the user's stored ones when none
/// are posted, and persists the accepted subscriptions.
pub(super) async fn analyze_transactions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let hints = if req.transactions.is_empty() {
        let stored = state.store.list_transactions(&user_id).map_err(storage(&state))?;
        stored.iter().map(TransactionHint::from).collect()
    } else {
        req.transactions
    };
    debug!(%user_id, transactions = hints.len(), "POST /analyze-transactions");
    if hints.is_empty() {
        return Err(ApiError::BadRequest(state.locale.no_transactions().to_string()));
    }
    for (i, hint) in hints.iter().enumerate() {
        hint.validate()
            .map_err(|e| ApiError::BadRequest(format!("transactions[{i}]: {e}")))?;
    }

    let analysis = analysis::analyze(&state.llm, &hints)
        .await
        .map_err(|e| ApiError::upstream(state.locale.analysis_failed(), e))?;

    let existing = state.store.list_subscriptions(&user_id).map_err(storage(&state))?;
    let accepted = analysis::accept(&analysis, &user_id, &existing);
    for sub in &accepted {
        state.store.upsert_subscription(sub).map_err(storage(&state))?;
    }
    Ok(Json(AnalysisReport::new(analysis, accepted)))
}

/// POST /cashflow-projection
pub(super) async fn cashflow_projection(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CashflowRequest>,
) -> Result<Json<CashflowProjection>, ApiError> {
    debug!(%user_id, "POST /cashflow-projection");
    let subscriptions = match req.subscriptions {
        Some(v) => v,
        None => {
            let stored = state.store.list_subscriptions(&user_id).map_err(storage(&state))?;
            serde_json::to_value(stored).map_err(|e| ApiError::storage(state.locale.storage_failed(), e))?
        }
    };
    let projection = cashflow::project(&state.llm, &req.historical_data, &subscriptions)
        .await
        .map_err(|e| ApiError::upstream(state.locale.projection_failed(), e))?;
    Ok(Json(projection))
}

// ── Cancellation ──────────────────────────────────────────────────────────────

/// GET /cancel-subscription
pub(super) async fn cancel_catalog() -> Json<Value> {
    let entries = catalog::entries();
    Json(json!({
        "message": "Subscription Cancellation API",
        "endpoints": { "POST /cancel-subscription": "Cancel a subscription" },
        "supportedMethods": [
            CancellationMethod::Online.as_str(),
            CancellationMethod::Phone.as_str(),
            CancellationMethod::Email.as_str(),
        ],
        "availableSubscriptions": entries.iter().map(|e| e.id).collect::<Vec<_>>(),
        "subscriptions": entries,
    }))
}

/// POST /cancel-subscription
pub(super) async fn cancel_subscription(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CancelRequest>,
) -> Result<Json<CancelOutcome>, ApiError> {
    debug!(%user_id, subscription_id = req.subscription_id.as_deref().unwrap_or("-"), "POST /cancel-subscription");
    let outcome = state.orchestrator.cancel(&user_id, &req).await.map_err(|e| {
        let (status, message) = match &e {
            CancelError::Validation => (StatusCode::BAD_REQUEST, state.locale.cancel_missing_fields()),
            CancelError::NotFound(_) => (StatusCode::NOT_FOUND, state.locale.cancel_not_found()),
            CancelError::Store(store_err) => {
                warn!(%user_id, error = %store_err, "cancellation could not be recorded");
                (StatusCode::INTERNAL_SERVER_ERROR, state.locale.cancel_server_error())
            }
        };
        ApiError::Cancel { status, message: message.to_string() }
    })?;
    Ok(Json(outcome))
}

// ── Bank link ─────────────────────────────────────────────────────────────────

/// POST /plaid/link-token
pub(super) async fn link_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    debug!(%user_id, "POST /plaid/link-token");
    let token = state
        .bank
        .create_link_token(&user_id)
        .await
        .map_err(|e| ApiError::upstream(state.locale.link_token_failed(), e))?;
    Ok(Json(json!({ "link_token": token })))
}

/// POST /plaid/exchange-token
pub(super) async fn exchange_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<ExchangeRequest>,
) -> Result<Json<Value>, ApiError> {
    debug!(%user_id, "POST /plaid/exchange-token");
    let Some(public_token) = req.public_token.filter(|t| !t.trim().is_empty()) else {
        return Err(ApiError::BadRequest(state.locale.public_token_required().to_string()));
    };
    let Some(sealer) = &state.sealer else {
        return Err(ApiError::upstream(state.locale.bank_link_failed(), "ENCRYPTION_KEY is not set"));
    };

    let summary = sync::link_item(
        state.store.as_ref(),
        &state.bank,
        sealer,
        &user_id,
        &public_token,
        state.config.plaid.import_days,
    )
    .await
    .map_err(|e| ApiError::upstream(state.locale.bank_link_failed(), e))?;

    Ok(Json(json!({
        "success": true,
        "accounts": summary.accounts,
        "transactions": summary.transactions,
        "message": state.locale.bank_link_succeeded(),
    })))
}

/// POST /plaid/webhook
pub(super) async fn plaid_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    match &state.webhook_key {
        Some(key) => {
            let signature = headers.get(webhook::SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            if !webhook::verify(key, &body, signature) {
                return Err(ApiError::Unauthorized("invalid webhook signature".into()));
            }
        }
        None => warn!("accepting unsigned webhook"),
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid webhook body: {e}")))?;
    debug!(webhook_type = %event.webhook_type, "POST /plaid/webhook");

    let Some(sealer) = &state.sealer else {
        return Err(ApiError::upstream(state.locale.webhook_failed(), "ENCRYPTION_KEY is not set"));
    };
    let outcome = sync::handle_webhook(
        state.store.as_ref(),
        &state.bank,
        sealer,
        &event,
        state.config.plaid.webhook_sync_days,
    )
    .await
    .map_err(|e| ApiError::upstream(state.locale.webhook_failed(), e))?;

    match outcome {
        WebhookOutcome::UnknownItem => Err(ApiError::NotFound(state.locale.user_not_found().to_string())),
        WebhookOutcome::Ignored | WebhookOutcome::Synced { .. } => Ok(Json(json!({ "received": true }))),
    }
}

// ── Dashboard data ────────────────────────────────────────────────────────────

/// GET /subscriptions
pub(super) async fn subscriptions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SubscriptionsView>, ApiError> {
    let subscriptions = state.store.list_subscriptions(&user_id).map_err(storage(&state))?;
    let summary = domain::summarize(&subscriptions);
    Ok(Json(SubscriptionsView { subscriptions, summary }))
}

/// GET /savings
pub(super) async fn savings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SavingsView>, ApiError> {
    let cancellations = state.store.list_cancellations(&user_id).map_err(storage(&state))?;
    let goals = state.store.list_goals(&user_id).map_err(storage(&state))?;
    let total_saved = domain::total_saved(&cancellations);
    Ok(Json(SavingsView {
        total_saved,
        annual_savings: domain::annual_savings(total_saved),
        year_end_projection: domain::year_end_projection(&cancellations, Utc::now().date_naive()),
        cancellations,
        goals: goals.into_iter().map(GoalView::from).collect(),
    }))
}

/// POST /savings/goals/{goal_id}/progress
pub(super) async fn goal_progress(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(goal_id): Path<String>,
    ApiJson(req): ApiJson<ProgressRequest>,
) -> Result<Json<GoalView>, ApiError> {
    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(ApiError::BadRequest(format!("amount must be a non-negative number (got {})", req.amount)));
    }
    let Some(mut goal) = state.store.find_goal(&user_id, &goal_id).map_err(storage(&state))? else {
        return Err(ApiError::NotFound(state.locale.goal_not_found().to_string()));
    };
    goal.current_amount =
        domain::from_cents(domain::to_cents(goal.current_amount) + domain::to_cents(req.amount));
    state.store.upsert_goal(&goal).map_err(storage(&state))?;
    info!(%user_id, goal_id = %goal.id, current = goal.current_amount, "savings goal progressed");
    Ok(Json(GoalView::from(goal)))
}

/// GET /notifications
pub(super) async fn notifications(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<NotificationsView>, ApiError> {
    let notifications = state.store.list_notifications(&user_id).map_err(storage(&state))?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();
    Ok(Json(NotificationsView { notifications, unread_count }))
}

/// POST /notifications/{notification_id}/read
pub(super) async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.mark_notification_read(&user_id, &notification_id).map_err(storage(&state))? {
        return Err(ApiError::NotFound(state.locale.notification_not_found().to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

/// DELETE /notifications/{notification_id}
pub(super) async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_notification(&user_id, &notification_id).map_err(storage(&state))? {
        return Err(ApiError::NotFound(state.locale.notification_not_found().to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
