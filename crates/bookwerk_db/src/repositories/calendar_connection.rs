//! Repository for external calendar connections
//!
//! One row per scope, holding the opaque calendar id and the OAuth
//! access/refresh credential pair. Token rotation is the only mutation the
//! engine performs here; rows are written by the out-of-scope authorization
//! callback and deleted when the owner disconnects.

use crate::error::DbError;
use bookwerk_common::models::ScopeId;

/// A scope's connection to its external calendar.
///
/// A row is only usable when all credential fields are present together; the
/// schema enforces that by making them NOT NULL. `needs_reauth` is set when
/// the provider definitively rejects the refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConnection {
    pub scope_id: ScopeId,
    pub calendar_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds at which the access token expires.
    pub expires_at: i64,
    pub needs_reauth: bool,
}

/// Repository for calendar connections.
pub trait CalendarConnectionRepository {
    /// Initialize the database schema.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Find the connection for a scope, if any.
    fn find_by_scope(
        &self,
        scope_id: &ScopeId,
    ) -> impl std::future::Future<Output = Result<Option<CalendarConnection>, DbError>> + Send;

    /// Create or replace the connection for a scope. Clears `needs_reauth`;
    /// called by the authorization callback after a fresh handshake.
    fn upsert(
        &self,
        connection: CalendarConnection,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Persist a rotated token pair after a successful refresh exchange.
    /// When the provider did not issue a new refresh token the stored one is
    /// kept.
    fn save_rotated_tokens(
        &self,
        scope_id: &ScopeId,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: i64,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Mark the connection as needing re-authorization. The row is kept so
    /// the owner UI can show what was connected.
    fn mark_needs_reauth(
        &self,
        scope_id: &ScopeId,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Delete the connection (owner disconnected).
    fn delete(
        &self,
        scope_id: &ScopeId,
    ) -> impl std::future::Future<Output = Result<bool, DbError>> + Send;
}
