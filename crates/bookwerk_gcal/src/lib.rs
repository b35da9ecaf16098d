// --- File: crates/bookwerk_gcal/src/lib.rs ---
// Declare modules within this crate
pub mod client;
pub mod service;
pub mod token;

pub use client::{GcalApi, GcalApiError, HttpGcalApi};
pub use service::{GcalCalendarService, GcalError};
pub use token::{TokenManager, TokenOutcome};
