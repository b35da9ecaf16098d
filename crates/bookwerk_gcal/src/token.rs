// --- File: crates/bookwerk_gcal/src/token.rs ---
//! Access-token lifecycle for calendar connections.
//!
//! The token manager is the only component that mutates connection rows: it
//! persists rotated tokens after a successful refresh and marks a connection
//! for re-authorization when the provider definitively rejects its refresh
//! token. Transient provider trouble never touches the row.

use crate::client::{GcalApi, GcalApiError};
use crate::service::GcalError;
use bookwerk_common::models::ScopeId;
use bookwerk_db::{CalendarConnection, CalendarConnectionRepository, SqlCalendarConnectionRepository};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Refresh slightly before the recorded expiry so a token never dies mid-call.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Outcome of resolving an access token for a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    /// A usable token plus the calendar it belongs to.
    Valid {
        access_token: String,
        calendar_id: String,
    },
    /// The scope has no calendar connection.
    NoConnection,
    /// The connection's refresh token is dead; the owner must reconnect.
    ReauthRequired,
    /// The provider could not be reached for the refresh exchange.
    Unavailable,
}

/// Per-scope token lifecycle manager.
pub struct TokenManager {
    connections: SqlCalendarConnectionRepository,
    api: Arc<dyn GcalApi>,
    // One async mutex per scope so concurrent refreshes collapse into a
    // single exchange; providers rotate refresh tokens and a duplicate
    // exchange can invalidate the stored one.
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(connections: SqlCalendarConnectionRepository, api: Arc<dyn GcalApi>) -> Self {
        Self {
            connections,
            api,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, scope_id: &ScopeId) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(scope_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn is_fresh(connection: &CalendarConnection) -> bool {
        Utc::now().timestamp() + EXPIRY_SKEW_SECS < connection.expires_at
    }

    /// Resolve a usable access token for the scope.
    ///
    /// Returns the stored token unchanged while it is fresh; otherwise runs a
    /// single-flight refresh exchange and persists the rotation.
    pub async fn access_token_for(&self, scope_id: &ScopeId) -> Result<TokenOutcome, GcalError> {
        let Some(connection) = self.connections.find_by_scope(scope_id).await? else {
            return Ok(TokenOutcome::NoConnection);
        };
        if connection.needs_reauth {
            return Ok(TokenOutcome::ReauthRequired);
        }
        if Self::is_fresh(&connection) {
            return Ok(TokenOutcome::Valid {
                access_token: connection.access_token,
                calendar_id: connection.calendar_id,
            });
        }

        self.refresh_for(scope_id).await
    }

    /// Force a refresh exchange for the scope, e.g. after the provider
    /// rejected a token that looked fresh.
    pub async fn refresh_for(&self, scope_id: &ScopeId) -> Result<TokenOutcome, GcalError> {
        let lock = self.lock_for(scope_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent caller may have finished the
        // refresh while we waited.
        let Some(connection) = self.connections.find_by_scope(scope_id).await? else {
            return Ok(TokenOutcome::NoConnection);
        };
        if connection.needs_reauth {
            return Ok(TokenOutcome::ReauthRequired);
        }
        if Self::is_fresh(&connection) {
            return Ok(TokenOutcome::Valid {
                access_token: connection.access_token,
                calendar_id: connection.calendar_id,
            });
        }

        debug!("Refreshing access token for {}", scope_id);
        match self.api.refresh_access_token(&connection.refresh_token).await {
            Ok(response) => {
                let expires_at = Utc::now().timestamp() + response.expires_in;
                self.connections
                    .save_rotated_tokens(
                        scope_id,
                        &response.access_token,
                        response.refresh_token.as_deref(),
                        expires_at,
                    )
                    .await?;
                Ok(TokenOutcome::Valid {
                    access_token: response.access_token,
                    calendar_id: connection.calendar_id,
                })
            }
            Err(GcalApiError::InvalidGrant) => {
                warn!(
                    "Refresh token for {} rejected by provider, marking for re-authorization",
                    scope_id
                );
                self.connections.mark_needs_reauth(scope_id).await?;
                Ok(TokenOutcome::ReauthRequired)
            }
            Err(e) => {
                // Transient failure: keep the row as-is and let the caller
                // degrade to internal-only data.
                warn!("Token refresh for {} failed transiently: {}", scope_id, e);
                Ok(TokenOutcome::Unavailable)
            }
        }
    }
}
