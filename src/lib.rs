//! State, persistence and assistant services behind the PawHaven web app.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod commands;
pub mod community;
pub mod config;
pub mod consent;
pub mod error;
pub mod favorites;
pub mod forms;
pub mod gated;
pub mod models;
pub mod preferences;
pub mod state;
pub mod storage;
pub mod vets;

pub use config::AppConfig;
pub use state::AppState;

/// Initializes `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

/// Reads configuration from the environment, opens storage and builds the
/// application state.
pub async fn run() -> Result<AppState, anyhow::Error> {
    init_logging();
    let config = AppConfig::from_env()?;
    AppState::new(&config).await
}
