// --- File: crates/bookwerk_gcal/src/service.rs ---
//! Calendar service implementation for the external provider.
//!
//! Implements the [`CalendarService`] trait on top of the REST client and the
//! token manager. Credential and transport trouble is folded into the
//! [`ExternalBusy`] outcome for reads so availability computation can always
//! proceed on internal data.

use crate::client::{GcalApi, GcalApiError, PeriodEdge};
use crate::token::{TokenManager, TokenOutcome};
use bookwerk_common::models::ScopeId;
use bookwerk_common::services::{
    BoxFuture, BoxedError, CalendarEvent, CalendarEventResult, CalendarService, ConnectionState,
    ExternalBusy,
};
use bookwerk_db::{CalendarConnectionRepository, DbError, SqlCalendarConnectionRepository};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors from calendar service operations.
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("Provider API error: {0}")]
    Api(#[from] GcalApiError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Scope has no calendar connection")]
    NoConnection,
    #[error("Calendar connection requires re-authorization")]
    ReauthRequired,
    #[error("Calendar provider unavailable")]
    Unavailable,
}

/// External calendar service for a Google-style provider.
pub struct GcalCalendarService {
    tokens: TokenManager,
    api: Arc<dyn GcalApi>,
    connections: SqlCalendarConnectionRepository,
    time_zone: Tz,
}

impl GcalCalendarService {
    pub fn new(
        connections: SqlCalendarConnectionRepository,
        api: Arc<dyn GcalApi>,
        time_zone: Tz,
    ) -> Self {
        Self {
            tokens: TokenManager::new(connections.clone(), api.clone()),
            api,
            connections,
            time_zone,
        }
    }

    /// Business-local midnight of a date as a UTC instant.
    ///
    /// All-day events carry no timezone of their own; they are pinned to the
    /// business timezone per the single-timezone-per-business assumption.
    fn local_midnight(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        self.time_zone
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn edge_to_utc(&self, edge: &PeriodEdge) -> Option<DateTime<Utc>> {
        match edge {
            PeriodEdge::Timed(dt) => Some(*dt),
            PeriodEdge::AllDay(date) => self.local_midnight(*date),
        }
    }

    async fn read_busy_inner(
        &self,
        scope_id: &ScopeId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<ExternalBusy, GcalError> {
        let (access_token, calendar_id) = match self.tokens.access_token_for(scope_id).await? {
            TokenOutcome::Valid {
                access_token,
                calendar_id,
            } => (access_token, calendar_id),
            TokenOutcome::NoConnection => return Ok(ExternalBusy::NoConnection),
            TokenOutcome::ReauthRequired => return Ok(ExternalBusy::ReauthRequired),
            TokenOutcome::Unavailable => return Ok(ExternalBusy::Unavailable),
        };

        let periods = match self
            .api
            .query_free_busy(&access_token, &calendar_id, start_time, end_time)
            .await
        {
            Ok(periods) => periods,
            Err(e) if e.is_auth_rejection() => {
                // The stored token looked fresh but was revoked; force one
                // refresh and retry once.
                match self.tokens.refresh_for(scope_id).await? {
                    TokenOutcome::Valid { access_token, calendar_id } => {
                        match self
                            .api
                            .query_free_busy(&access_token, &calendar_id, start_time, end_time)
                            .await
                        {
                            Ok(periods) => periods,
                            Err(e) => {
                                warn!("Free/busy retry for {} failed: {}", scope_id, e);
                                return Ok(ExternalBusy::Unavailable);
                            }
                        }
                    }
                    TokenOutcome::ReauthRequired => return Ok(ExternalBusy::ReauthRequired),
                    _ => return Ok(ExternalBusy::Unavailable),
                }
            }
            Err(e) => {
                warn!("Free/busy query for {} failed: {}", scope_id, e);
                return Ok(ExternalBusy::Unavailable);
            }
        };

        let mut intervals = Vec::with_capacity(periods.len());
        for period in &periods {
            let (Some(start), Some(end)) = (
                self.edge_to_utc(&period.start),
                self.edge_to_utc(&period.end),
            ) else {
                warn!("Skipping busy period with unusable edge: {:?}", period);
                continue;
            };
            intervals.push((start, end));
        }
        intervals.sort_by_key(|interval| interval.0);
        Ok(ExternalBusy::Busy(intervals))
    }

    async fn create_event_inner(
        &self,
        scope_id: &ScopeId,
        event: CalendarEvent,
    ) -> Result<CalendarEventResult, GcalError> {
        let (access_token, calendar_id) = match self.tokens.access_token_for(scope_id).await? {
            TokenOutcome::Valid {
                access_token,
                calendar_id,
            } => (access_token, calendar_id),
            TokenOutcome::NoConnection => return Err(GcalError::NoConnection),
            TokenOutcome::ReauthRequired => return Err(GcalError::ReauthRequired),
            TokenOutcome::Unavailable => return Err(GcalError::Unavailable),
        };

        let event_id = self
            .api
            .insert_event(&access_token, &calendar_id, event)
            .await?;
        Ok(CalendarEventResult {
            event_id: Some(event_id),
            status: "confirmed".to_string(),
        })
    }

    async fn cancel_event_inner(&self, scope_id: &ScopeId, event_id: &str) -> Result<(), GcalError> {
        let (access_token, calendar_id) = match self.tokens.access_token_for(scope_id).await? {
            TokenOutcome::Valid {
                access_token,
                calendar_id,
            } => (access_token, calendar_id),
            TokenOutcome::NoConnection => return Err(GcalError::NoConnection),
            TokenOutcome::ReauthRequired => return Err(GcalError::ReauthRequired),
            TokenOutcome::Unavailable => return Err(GcalError::Unavailable),
        };

        self.api
            .cancel_event(&access_token, &calendar_id, event_id)
            .await?;
        Ok(())
    }
}

impl CalendarService for GcalCalendarService {
    type Error = BoxedError;

    fn read_busy(
        &self,
        scope_id: &ScopeId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, ExternalBusy, Self::Error> {
        let scope_id = scope_id.clone();

        Box::pin(async move {
            match self.read_busy_inner(&scope_id, start_time, end_time).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    // Internal trouble (e.g. the connection row is unreadable)
                    // still must not fail availability computation.
                    warn!("Busy read for {} degraded to unavailable: {}", scope_id, e);
                    Ok(ExternalBusy::Unavailable)
                }
            }
        })
    }

    fn create_event(
        &self,
        scope_id: &ScopeId,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let scope_id = scope_id.clone();

        Box::pin(async move {
            self.create_event_inner(&scope_id, event)
                .await
                .map_err(|e| BoxedError(Box::new(e)))
        })
    }

    fn cancel_event(&self, scope_id: &ScopeId, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let scope_id = scope_id.clone();
        let event_id = event_id.to_string();

        Box::pin(async move {
            self.cancel_event_inner(&scope_id, &event_id)
                .await
                .map_err(|e| BoxedError(Box::new(e)))
        })
    }

    fn connection_state(&self, scope_id: &ScopeId) -> BoxFuture<'_, ConnectionState, Self::Error> {
        let scope_id = scope_id.clone();

        Box::pin(async move {
            let connection = self
                .connections
                .find_by_scope(&scope_id)
                .await
                .map_err(|e| BoxedError(Box::new(e)))?;
            Ok(match connection {
                None => ConnectionState::NotConnected,
                Some(connection) if connection.needs_reauth => ConnectionState::NeedsReauth,
                Some(_) => ConnectionState::Connected,
            })
        })
    }
}
