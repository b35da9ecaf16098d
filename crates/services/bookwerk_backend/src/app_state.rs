// --- File: crates/services/bookwerk_backend/src/app_state.rs ---
use bookwerk_config::AppConfig;
use bookwerk_db::DbClient;
use std::sync::Arc;

/// Application state shared by the backend's own routes (health, config
/// introspection). The booking engine carries its own state; this struct only
/// holds what the service shell needs.
#[derive(Clone)]
pub struct AppState {
    /// Kept so later shell routes (config introspection, admin toggles) can
    /// reach the loaded configuration without re-plumbing.
    #[allow(dead_code)]
    pub config: Arc<AppConfig>,
    pub db: DbClient,
}
