// --- File: crates/bookwerk_common/src/error.rs ---
use thiserror::Error;

/// The base error type for Bookwerk glue code.
///
/// Crates define their own specific error enums (`DbError`, `GcalError`,
/// `BookingError`); this taxonomy covers the places where errors from several
/// of them meet, such as server startup and health reporting.
#[derive(Error, Debug)]
pub enum BookwerkError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a conflict (e.g., slot already taken)
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to a timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
///
/// Implemented by error types that surface through the caller-facing API so
/// handlers map them consistently.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for BookwerkError {
    fn status_code(&self) -> u16 {
        match self {
            BookwerkError::HttpError(_) => 500,
            BookwerkError::ParseError(_) => 400,
            BookwerkError::ConfigError(_) => 500,
            BookwerkError::ValidationError(_) => 400,
            BookwerkError::DatabaseError(_) => 500,
            BookwerkError::ExternalServiceError { .. } => 502,
            BookwerkError::ConflictError(_) => 409,
            BookwerkError::NotFoundError(_) => 404,
            BookwerkError::TimeoutError(_) => 504,
            BookwerkError::InternalError(_) => 500,
        }
    }
}

// Common error conversions
impl From<reqwest::Error> for BookwerkError {
    fn from(err: reqwest::Error) -> Self {
        BookwerkError::HttpError(err.to_string())
    }
}

impl From<std::io::Error> for BookwerkError {
    fn from(err: std::io::Error) -> Self {
        BookwerkError::InternalError(err.to_string())
    }
}
