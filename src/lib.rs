// Library root. The binary entry point is src/main.rs; integration tests
// under tests/ drive the router and stores through this crate.

pub mod assistant;
pub mod bank;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod http;
pub mod llm;
pub mod locale;
pub mod logger;
pub mod model;
pub mod store;
