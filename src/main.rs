//! SubSaver backend entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger once
//!   4. Open the store and seed the demo user
//!   5. Build providers
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Serve HTTP until shutdown

use tokio_util::sync::CancellationToken;
use tracing::info;

use subsaver::error::AppError;
use subsaver::{config, http, logger, store};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.server.log_level, config.server.log_file.as_deref())?;

    info!(
        bind = %config.server.bind,
        data_dir = %config.server.data_dir.display(),
        log_level = %config.server.log_level,
        secrets = ?config.secrets,
        "config loaded"
    );

    let store = store::open(&config)?;
    if let (Some(demo), true) = (&config.server.demo_user, config.server.seed_demo_data) {
        store::seed::seed_demo(store.as_ref(), demo).map_err(|e| AppError::Store(e.to_string()))?;
    }

    let state = http::AppState::new(config, store)?;

    // Ctrl-C cancels the token; the server drains and returns.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    http::serve(state, shutdown).await
}
