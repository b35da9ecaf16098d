// --- File: crates/bookwerk_common/src/http.rs ---
use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;

/// Default timeout for HTTP requests in seconds.
///
/// Every call to the external calendar provider goes through a client with a
/// bounded timeout so a slow provider cannot stall slot generation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Creates a new HTTP client with a bounded timeout.
///
/// A `timeout_secs` of zero falls back to [`DEFAULT_TIMEOUT_SECS`]; an
/// unbounded client is never handed out.
pub fn create_client(timeout_secs: u64) -> Result<Client, ReqwestError> {
    let timeout_secs = if timeout_secs == 0 {
        DEFAULT_TIMEOUT_SECS
    } else {
        timeout_secs
    };
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
