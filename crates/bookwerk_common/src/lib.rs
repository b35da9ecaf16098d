// --- File: crates/bookwerk_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error taxonomy and HTTP status mapping
pub mod http; // Shared HTTP client with bounded timeout
pub mod logging; // Tracing subscriber setup
pub mod models; // Domain value types shared across crates
pub mod services; // Service abstractions for external collaborators

// Re-export error types for easier access
pub use error::{BookwerkError, HttpStatusCode};

// Re-export the HTTP client helper
pub use http::create_client;

// Re-export the domain value types
pub use models::{DayHours, Scope, ScopeId, WeekSchedule};
