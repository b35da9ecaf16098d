// --- File: crates/bookwerk_config/src/lib.rs ---
//! Unified configuration loading for Bookwerk.
//!
//! Configuration is layered: an optional `config/default` file, an optional
//! environment-specific file selected by `RUN_ENV`, then `APP__`-prefixed
//! environment variables (e.g. `APP__SERVER__PORT=8086`,
//! `APP__GCAL__CLIENT_SECRET=...`). Dotenv is loaded exactly once.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;

pub mod models;
pub use models::{AppConfig, BookingConfig, DatabaseConfig, GcalConfig, ServerConfig};

static DOTENV: OnceCell<()> = OnceCell::new();

/// Load `.env` into the process environment exactly once.
pub fn ensure_dotenv_loaded() {
    DOTENV.get_or_init(|| {
        // Missing .env is fine; real deployments use actual env vars.
        let _ = dotenv::dotenv();
    });
}

/// Loads the application configuration.
///
/// Dependent crates call this so they do not need to know where the
/// configuration comes from.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize::<AppConfig>()
}
