//! Axum HTTP surface.
//!
//! ## URL layout
//!
//! ```text
//! GET    /health
//! GET    /ai-chat                       status
//! POST   /ai-chat
//! POST   /analyze-transactions
//! GET    /cancel-subscription           catalog listing
//! POST   /cancel-subscription
//! POST   /cashflow-projection
//! POST   /plaid/link-token              bearer token required
//! POST   /plaid/exchange-token          bearer token required
//! POST   /plaid/webhook                 signed when a key is configured
//! GET    /subscriptions
//! GET    /savings
//! POST   /savings/goals/{id}/progress
//! GET    /notifications
//! POST   /notifications/{id}/read
//! DELETE /notifications/{id}
//! POST   /chat/export
//! ```

mod api;
pub mod auth;
pub mod error;
pub mod extract;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{delete, get, post},
};
use ed25519_dalek::VerifyingKey;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bank::{self, BankProvider, crypto::TokenSealer};
use crate::cancel::Orchestrator;
use crate::config::Config;
use crate::error::AppError;
use crate::llm::{LlmProvider, providers};
use crate::locale::Locale;
use crate::store::Store;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; everything heavy is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub llm: LlmProvider,
    pub bank: BankProvider,
    /// `None` when no `ENCRYPTION_KEY` is set; bank linking is then refused.
    pub sealer: Option<TokenSealer>,
    /// `None` when no `PLAID_WEBHOOK_KEY` is set; webhooks are then unsigned.
    pub webhook_key: Option<VerifyingKey>,
    pub orchestrator: Orchestrator,
    pub locale: Locale,
}

impl AppState {
    /// Build providers from `config` and wire them to `store`.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let llm = providers::build(&config.llm, config.secrets.llm_api_key.clone())
            .map_err(|e| AppError::Config(format!("llm: {e}")))?;
        let bank = bank::build(&config.plaid, &config.secrets)
            .map_err(|e| AppError::Config(format!("bank: {e}")))?;

        let sealer = match config.secrets.encryption_key.as_deref() {
            Some(secret) => Some(TokenSealer::new(secret).map_err(|e| AppError::Config(e.to_string()))?),
            None => {
                warn!("ENCRYPTION_KEY not set; bank linking is disabled");
                None
            }
        };
        let webhook_key = match config.secrets.webhook_key.as_deref() {
            Some(hex_key) => Some(webhook::parse_key(hex_key).map_err(AppError::Config)?),
            None => {
                warn!("PLAID_WEBHOOK_KEY not set; webhook bodies are not verified");
                None
            }
        };

        let locale = config.server.locale;
        let orchestrator = Orchestrator::new(
            store.clone(),
            Duration::from_millis(config.cancellation.delay_ms),
            locale,
        );

        info!(
            llm = llm.name(),
            bank = bank.name(),
            store = store.backend(),
            "providers ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            llm,
            bank,
            sealer,
            webhook_key,
            orchestrator,
            locale,
        })
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health",                          get(api::health))
        .route("/ai-chat",                         get(api::chat_status).post(api::chat))
        .route("/analyze-transactions",            post(api::analyze_transactions))
        .route("/cancel-subscription",             get(api::cancel_catalog).post(api::cancel_subscription))
        .route("/cashflow-projection",             post(api::cashflow_projection))
        .route("/plaid/link-token",                post(api::link_token))
        .route("/plaid/exchange-token",            post(api::exchange_token))
        .route("/plaid/webhook",                   post(api::plaid_webhook))
        .route("/subscriptions",                   get(api::subscriptions))
        .route("/savings",                         get(api::savings))
        .route("/savings/goals/{goal_id}/progress", post(api::goal_progress))
        .route("/notifications",                   get(api::notifications))
        .route("/notifications/{notification_id}/read", post(api::mark_notification_read))
        .route("/notifications/{notification_id}", delete(api::delete_notification))
        .route("/chat/export",                     post(api::export_chat))
        .with_state(state)
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Serve until `shutdown` is cancelled.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> Result<(), AppError> {
    let bind_addr = state.config.server.bind.clone();
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("http server shut down");
    Ok(())
}
