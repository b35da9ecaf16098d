// --- File: crates/bookwerk_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g., DATABASE_URL loaded via APP__DATABASE__URL
}

// --- External Calendar (Google-style OAuth provider) Config ---
// Holds non-secret provider config. The client secret is loaded via env var
// override (APP__GCAL__CLIENT_SECRET).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// OAuth token endpoint. Overridable for tests.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Calendar API base URL. Overridable for tests.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Timeout for provider calls, seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

// --- Booking Engine Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingConfig {
    /// The single business timezone every scope operates in.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Fallback slot granularity when a scope profile has none, minutes.
    #[serde(default = "default_granularity_minutes")]
    pub granularity_minutes: i64,
    /// Maximum availability query range, days.
    #[serde(default = "default_max_window_days")]
    pub max_window_days: i64,
    /// How long a PENDING booking holds its slot before it is swept, minutes.
    #[serde(default = "default_pending_hold_minutes")]
    pub pending_hold_minutes: i64,
    /// Timeout for the best-effort external event creation, seconds.
    #[serde(default = "default_event_timeout_secs")]
    pub event_timeout_secs: u64,
}

fn default_time_zone() -> String {
    "Europe/Berlin".to_string()
}

fn default_granularity_minutes() -> i64 {
    30
}

fn default_max_window_days() -> i64 {
    60
}

fn default_pending_hold_minutes() -> i64 {
    30
}

fn default_event_timeout_secs() -> u64 {
    10
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            granularity_minutes: default_granularity_minutes(),
            max_window_days: default_max_window_days(),
            pending_hold_minutes: default_pending_hold_minutes(),
            event_timeout_secs: default_event_timeout_secs(),
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub booking: Option<BookingConfig>,
}

impl AppConfig {
    /// Booking settings with defaults filled in when the section is absent.
    pub fn booking_or_default(&self) -> BookingConfig {
        self.booking.clone().unwrap_or_default()
    }
}
