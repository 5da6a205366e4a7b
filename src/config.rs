//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `SUBSAVER_BIND`, `SUBSAVER_LOG_LEVEL` and `SUBSAVER_DATA_DIR`
//! overrides. Secrets (`LLM_API_KEY`, `PLAID_CLIENT_ID`, `PLAID_SECRET`,
//! `ENCRYPTION_KEY`, `PLAID_WEBHOOK_KEY`) are read from the environment only.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::locale::Locale;

/// HTTP server and process-level settings (`[server]`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the API listens on.
    pub bind: String,
    pub log_level: String,
    /// Append logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Directory for persistent data (already expanded, no `~`).
    pub data_dir: PathBuf,
    /// User id assumed when a user-scoped route is called without a bearer
    /// token. `None` makes every user-scoped route require authentication.
    pub demo_user: Option<String>,
    /// Seed the demo user with sample subscriptions, goals and notifications.
    pub seed_demo_data: bool,
    pub locale: Locale,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration (`[llm]`).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"dummy"` or `"openai"`.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Bank aggregator configuration (`[plaid]`).
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    /// Active provider: `"dummy"` or `"plaid"`.
    pub provider: String,
    /// `"sandbox"`, `"development"` or `"production"`.
    pub environment: String,
    pub client_name: String,
    pub country_codes: Vec<String>,
    pub language: String,
    /// Callback URL registered on new link tokens.
    pub webhook_url: Option<String>,
    /// History window imported on token exchange.
    pub import_days: i64,
    /// History window re-synced when a webhook reports new transactions.
    pub webhook_sync_days: i64,
    pub timeout_seconds: u64,
}

impl PlaidConfig {
    /// Base URL for the configured environment.
    pub fn base_url(&self) -> &'static str {
        match self.environment.as_str() {
            "production" => "https://production.plaid.com",
            "development" => "https://development.plaid.com",
            _ => "https://sandbox.plaid.com",
        }
    }
}

/// Cancellation orchestrator settings (`[cancellation]`).
#[derive(Debug, Clone)]
pub struct CancellationConfig {
    /// Artificial processing delay before steps are issued.
    pub delay_ms: u64,
}

/// Which persistence backend to open (`[store]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

/// Secrets sourced from the environment. Never read from TOML.
#[derive(Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<String>,
    pub plaid_client_id: Option<String>,
    pub plaid_secret: Option<String>,
    pub encryption_key: Option<String>,
    /// Hex-encoded ed25519 public key used to verify webhook bodies.
    pub webhook_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("llm_api_key", &set(&self.llm_api_key))
            .field("plaid_client_id", &set(&self.plaid_client_id))
            .field("plaid_secret", &set(&self.plaid_secret))
            .field("encryption_key", &set(&self.encryption_key))
            .field("webhook_key", &set(&self.webhook_key))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        let get = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            llm_api_key: get("LLM_API_KEY"),
            plaid_client_id: get("PLAID_CLIENT_ID"),
            plaid_secret: get("PLAID_SECRET"),
            encryption_key: get("ENCRYPTION_KEY"),
            webhook_key: get("PLAID_WEBHOOK_KEY"),
        }
    }
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub plaid: PlaidConfig,
    pub cancellation: CancellationConfig,
    pub store: StoreBackend,
    pub secrets: Secrets,
}

impl Config {
    /// Path of the SQLite database inside `data_dir`.
    pub fn sqlite_path(&self) -> PathBuf {
        self.server.data_dir.join("subsaver.db")
    }
}

/// Env overrides applied on top of the TOML file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub data_dir: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            bind: env::var("SUBSAVER_BIND").ok(),
            log_level: env::var("SUBSAVER_LOG_LEVEL").ok(),
            data_dir: env::var("SUBSAVER_DATA_DIR").ok(),
        }
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    plaid: RawPlaid,
    #[serde(default)]
    cancellation: RawCancellation,
    #[serde(default)]
    store: RawStore,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default)]
    demo_user: Option<String>,
    #[serde(default = "default_false")]
    seed_demo_data: bool,
    #[serde(default)]
    locale: Locale,
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_dummy")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAi,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_dummy(), openai: RawOpenAi::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAi {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAi {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawPlaid {
    #[serde(rename = "default", default = "default_dummy")]
    provider: String,
    #[serde(default = "default_plaid_environment")]
    environment: String,
    #[serde(default = "default_client_name")]
    client_name: String,
    #[serde(default = "default_country_codes")]
    country_codes: Vec<String>,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default = "default_import_days")]
    import_days: i64,
    #[serde(default = "default_webhook_sync_days")]
    webhook_sync_days: i64,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawPlaid {
    fn default() -> Self {
        Self {
            provider: default_dummy(),
            environment: default_plaid_environment(),
            client_name: default_client_name(),
            country_codes: default_country_codes(),
            language: default_language(),
            webhook_url: None,
            import_days: default_import_days(),
            webhook_sync_days: default_webhook_sync_days(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawCancellation {
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

impl Default for RawCancellation {
    fn default() -> Self {
        Self { delay_ms: default_delay_ms() }
    }
}

#[derive(Deserialize)]
struct RawStore {
    #[serde(default = "default_store_backend")]
    backend: String,
}

impl Default for RawStore {
    fn default() -> Self {
        Self { backend: default_store_backend() }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_data_dir() -> String { "~/.subsaver".to_string() }
fn default_dummy() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_plaid_environment() -> String { "sandbox".to_string() }
fn default_client_name() -> String { "SubSaver".to_string() }
fn default_country_codes() -> Vec<String> { vec!["US".to_string()] }
fn default_language() -> String { "en".to_string() }
fn default_import_days() -> i64 { 180 }
fn default_webhook_sync_days() -> i64 { 30 }
fn default_delay_ms() -> u64 { 2000 }
fn default_store_backend() -> String { "memory".to_string() }
fn default_false() -> bool { false }

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    load_from(Path::new("config/default.toml"), &Overrides::from_env(), Secrets::from_env())
}

/// Internal loader — tests pass overrides and secrets directly instead of
/// mutating process env vars.
pub fn load_from(path: &Path, overrides: &Overrides, secrets: Secrets) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse(&raw, overrides, secrets)
        .map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
}

fn parse(raw: &str, overrides: &Overrides, secrets: Secrets) -> Result<Config, AppError> {
    let parsed: RawConfig =
        toml::from_str(raw).map_err(|e| AppError::Config(format!("parse error: {e}")))?;

    let s = parsed.server;
    let data_dir = expand_home(overrides.data_dir.as_deref().unwrap_or(&s.data_dir));
    let log_file = s.log_file.map(|p| {
        let path = expand_home(&p);
        if path.is_absolute() { path } else { data_dir.join(path) }
    });

    let store = match parsed.store.backend.as_str() {
        "memory" => StoreBackend::Memory,
        "sqlite" => StoreBackend::Sqlite,
        other => {
            return Err(AppError::Config(format!(
                "unknown store backend '{other}' (expected 'memory' or 'sqlite')"
            )));
        }
    };

    let plaid = parsed.plaid;
    if plaid.import_days <= 0 || plaid.webhook_sync_days <= 0 {
        return Err(AppError::Config("plaid history windows must be positive".into()));
    }

    Ok(Config {
        server: ServerConfig {
            bind: overrides.bind.clone().unwrap_or(s.bind),
            log_level: overrides.log_level.clone().unwrap_or(s.log_level),
            log_file,
            data_dir,
            demo_user: s.demo_user.filter(|u| !u.trim().is_empty()),
            seed_demo_data: s.seed_demo_data,
            locale: s.locale,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        plaid: PlaidConfig {
            provider: plaid.provider,
            environment: plaid.environment,
            client_name: plaid.client_name,
            country_codes: plaid.country_codes,
            language: plaid.language,
            webhook_url: plaid.webhook_url,
            import_days: plaid.import_days,
            webhook_sync_days: plaid.webhook_sync_days,
            timeout_seconds: plaid.timeout_seconds,
        },
        cancellation: CancellationConfig { delay_ms: parsed.cancellation.delay_ms },
        store,
        secrets,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Config for tests — dummy providers, in-memory store, no delay,
    /// `demo` as the fallback user.
    pub fn test_default(data_dir: &Path) -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                log_level: "info".into(),
                log_file: None,
                data_dir: data_dir.to_path_buf(),
                demo_user: Some("demo".into()),
                seed_demo_data: true,
                locale: Locale::default(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            plaid: PlaidConfig {
                provider: "dummy".into(),
                environment: "sandbox".into(),
                client_name: "SubSaver".into(),
                country_codes: vec!["US".into()],
                language: "en".into(),
                webhook_url: None,
                import_days: 180,
                webhook_sync_days: 30,
                timeout_seconds: 1,
            },
            cancellation: CancellationConfig { delay_ms: 0 },
            store: StoreBackend::Memory,
            secrets: Secrets {
                encryption_key: Some("test-encryption-key".into()),
                ..Secrets::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[server]
bind = "0.0.0.0:9000"
data_dir = "~/.subsaver"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default(), Secrets::default()).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.server.log_level, "info");
        assert_eq!(cfg.llm.provider, "dummy");
        assert_eq!(cfg.plaid.import_days, 180);
        assert_eq!(cfg.plaid.webhook_sync_days, 30);
        assert_eq!(cfg.cancellation.delay_ms, 2000);
        assert_eq!(cfg.store, StoreBackend::Memory);
        assert!(cfg.server.demo_user.is_none());
    }

    #[test]
    fn overrides_win_over_file() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            bind: Some("127.0.0.1:1".into()),
            log_level: Some("debug".into()),
            data_dir: Some("/tmp/subsaver-test".into()),
        };
        let cfg = load_from(f.path(), &overrides, Secrets::default()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:1");
        assert_eq!(cfg.server.log_level, "debug");
        assert_eq!(cfg.server.data_dir, PathBuf::from("/tmp/subsaver-test"));
        assert_eq!(cfg.sqlite_path(), PathBuf::from("/tmp/subsaver-test/subsaver.db"));
    }

    #[test]
    fn full_config_parses_sections() {
        let f = write_toml(
            r#"
[server]
demo_user = "demo"
seed_demo_data = true
locale = "en"

[llm]
default = "openai"

[llm.openai]
model = "gpt-4o-mini"

[plaid]
default = "plaid"
environment = "production"
webhook_url = "https://example.test/plaid/webhook"

[cancellation]
delay_ms = 0

[store]
backend = "sqlite"
"#,
        );
        let cfg = load_from(f.path(), &Overrides::default(), Secrets::default()).unwrap();
        assert_eq!(cfg.server.demo_user.as_deref(), Some("demo"));
        assert_eq!(cfg.server.locale, Locale::En);
        assert_eq!(cfg.llm.openai.model, "gpt-4o-mini");
        assert_eq!(cfg.plaid.base_url(), "https://production.plaid.com");
        assert_eq!(cfg.cancellation.delay_ms, 0);
        assert_eq!(cfg.store, StoreBackend::Sqlite);
    }

    #[test]
    fn unknown_store_backend_errors() {
        let f = write_toml("[server]\n[store]\nbackend = \"redis\"\n");
        let err = load_from(f.path(), &Overrides::default(), Secrets::default()).unwrap_err();
        assert!(err.to_string().contains("unknown store backend"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(
            Path::new("/nonexistent/config.toml"),
            &Overrides::default(),
            Secrets::default(),
        );
        assert!(result.unwrap_err().to_string().contains("config error"));
    }

    #[test]
    fn secrets_debug_hides_values() {
        let s = Secrets { plaid_secret: Some("hunter2".into()), ..Secrets::default() };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<set>"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        assert!(expand_home("~/.subsaver").starts_with(&home));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
