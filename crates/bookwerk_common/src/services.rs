// --- File: crates/bookwerk_common/src/services.rs ---
//! Service abstractions for external collaborators.
//!
//! This module provides trait definitions for the external services the
//! booking engine consumes. The traits allow dependency injection and easier
//! testing by decoupling the engine from specific provider implementations.

use crate::models::ScopeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for
/// Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// Outcome of asking the external calendar for a scope's busy intervals.
///
/// Everything but `Busy` means "no external contribution"; the aggregator
/// must degrade to internal-only data instead of failing the availability
/// computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalBusy {
    /// Busy intervals reported by the provider, as UTC `[start, end)` pairs.
    Busy(Vec<(DateTime<Utc>, DateTime<Utc>)>),
    /// The scope has no calendar connection. Benign.
    NoConnection,
    /// The connection exists but its credentials are permanently invalid;
    /// the scope owner has to re-authorize.
    ReauthRequired,
    /// Transient provider trouble (transport, parse, timeout).
    Unavailable,
}

/// Connection state reported to the scope owner's UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    NeedsReauth,
    NotConnected,
}

/// An event to create on the scope's external calendar after a successful
/// booking commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// The start time of the event.
    pub start_time: DateTime<Utc>,
    /// The end time of the event.
    pub end_time: DateTime<Utc>,
    /// The summary or title of the event.
    pub summary: String,
    /// An optional description of the event.
    pub description: Option<String>,
}

/// Represents the result of a calendar event operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventResult {
    /// The ID of the event.
    pub event_id: Option<String>,
    /// The status of the event.
    pub status: String,
}

/// A trait for external calendar operations, keyed by scope.
///
/// Implementations own credential resolution for the scope: callers never see
/// tokens, only outcomes.
pub trait CalendarService: Send + Sync {
    /// Error type returned by calendar service operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the scope's busy intervals within a time range.
    ///
    /// Never fails for provider trouble: credential and transport problems
    /// are folded into the [`ExternalBusy`] outcome.
    #[allow(clippy::type_complexity)]
    fn read_busy(
        &self,
        scope_id: &ScopeId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, ExternalBusy, Self::Error>;

    /// Create a calendar event on the scope's calendar.
    fn create_event(
        &self,
        scope_id: &ScopeId,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error>;

    /// Mark a previously created event as cancelled.
    fn cancel_event(
        &self,
        scope_id: &ScopeId,
        event_id: &str,
    ) -> BoxFuture<'_, (), Self::Error>;

    /// Report the connection state for the scope owner's UI.
    fn connection_state(&self, scope_id: &ScopeId) -> BoxFuture<'_, ConnectionState, Self::Error>;
}
