// --- File: crates/bookwerk_gcal/src/client.rs ---
//! REST client for the external calendar provider.
//!
//! The provider is consumed through four calls: the OAuth refresh exchange,
//! the free/busy query, event insertion and event cancellation. They are
//! behind the [`GcalApi`] trait so the token manager and the calendar service
//! can be tested without a network.

use bookwerk_common::services::{BoxFuture, CalendarEvent};
use bookwerk_config::GcalConfig;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors from provider calls.
#[derive(Error, Debug)]
pub enum GcalApiError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider returned status {code}: {body}")]
    Status { code: u16, body: String },
    /// The refresh token was definitively rejected. This is the only variant
    /// that justifies marking a connection for re-authorization.
    #[error("Refresh token rejected by provider")]
    InvalidGrant,
    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl GcalApiError {
    /// Whether the failed call should be retried once with a fresh token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, GcalApiError::Status { code: 401 | 403, .. })
    }
}

/// Response of the refresh exchange.
///
/// Providers treat refresh tokens as single-use-per-rotation and may or may
/// not return a replacement; absence means the old one stays valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// One edge of a reported busy period. All-day events carry only a date and
/// are expanded to business-local midnight by the calendar service.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PeriodEdge {
    Timed(DateTime<Utc>),
    AllDay(NaiveDate),
}

/// A busy period as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BusyPeriod {
    pub start: PeriodEdge,
    pub end: PeriodEdge,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: String,
}

/// The provider operations the rest of the crate depends on.
pub trait GcalApi: Send + Sync {
    /// Exchange a refresh token for a fresh access token.
    fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> BoxFuture<'_, TokenRefreshResponse, GcalApiError>;

    /// Query the calendar's busy periods within a time window.
    fn query_free_busy(
        &self,
        access_token: &str,
        calendar_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyPeriod>, GcalApiError>;

    /// Insert an event, returning its provider id.
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, String, GcalApiError>;

    /// Mark an event as cancelled.
    fn cancel_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> BoxFuture<'_, (), GcalApiError>;
}

/// reqwest-backed implementation of [`GcalApi`].
pub struct HttpGcalApi {
    http: reqwest::Client,
    config: GcalConfig,
}

impl HttpGcalApi {
    pub fn new(config: GcalConfig) -> Result<Self, reqwest::Error> {
        let http = bookwerk_common::http::create_client(config.timeout_secs)?;
        Ok(Self { http, config })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GcalApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GcalApiError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

impl GcalApi for HttpGcalApi {
    fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> BoxFuture<'_, TokenRefreshResponse, GcalApiError> {
        let refresh_token = refresh_token.to_string();

        Box::pin(async move {
            let params = [
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                (
                    "client_secret",
                    self.config.client_secret.as_deref().unwrap_or_default(),
                ),
            ];

            let response = self
                .http
                .post(&self.config.token_uri)
                .form(&params)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // OAuth providers report a dead refresh token as
                // invalid_grant with a 400; anything else stays transient.
                let oauth_error: OAuthErrorBody =
                    serde_json::from_str(&body).unwrap_or(OAuthErrorBody {
                        error: String::new(),
                    });
                if oauth_error.error == "invalid_grant" {
                    return Err(GcalApiError::InvalidGrant);
                }
                return Err(GcalApiError::Status {
                    code: status.as_u16(),
                    body,
                });
            }

            response
                .json::<TokenRefreshResponse>()
                .await
                .map_err(|e| GcalApiError::Parse(e.to_string()))
        })
    }

    fn query_free_busy(
        &self,
        access_token: &str,
        calendar_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyPeriod>, GcalApiError> {
        let access_token = access_token.to_string();
        let calendar_id = calendar_id.to_string();

        Box::pin(async move {
            let body = serde_json::json!({
                "timeMin": start_time.to_rfc3339(),
                "timeMax": end_time.to_rfc3339(),
                "timeZone": "UTC",
                "items": [{ "id": calendar_id }],
            });

            let response = self
                .http
                .post(format!("{}/freeBusy", self.config.api_base))
                .bearer_auth(&access_token)
                .json(&body)
                .send()
                .await?;
            let response = Self::check_status(response).await?;

            let parsed: FreeBusyResponse = response
                .json()
                .await
                .map_err(|e| GcalApiError::Parse(e.to_string()))?;

            let busy = parsed
                .calendars
                .into_iter()
                .find(|(id, _)| id == &calendar_id)
                .map(|(_, calendar)| calendar.busy)
                .unwrap_or_default();

            debug!("Provider reported {} busy periods", busy.len());
            Ok(busy)
        })
    }

    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, String, GcalApiError> {
        let access_token = access_token.to_string();
        let calendar_id = calendar_id.to_string();

        Box::pin(async move {
            let body = serde_json::json!({
                "summary": event.summary,
                "description": event.description,
                "start": { "dateTime": event.start_time.to_rfc3339(), "timeZone": "UTC" },
                "end": { "dateTime": event.end_time.to_rfc3339(), "timeZone": "UTC" },
            });

            let response = self
                .http
                .post(format!(
                    "{}/calendars/{}/events",
                    self.config.api_base, calendar_id
                ))
                .bearer_auth(&access_token)
                .json(&body)
                .send()
                .await?;
            let response = Self::check_status(response).await?;

            let inserted: InsertedEvent = response
                .json()
                .await
                .map_err(|e| GcalApiError::Parse(e.to_string()))?;
            Ok(inserted.id)
        })
    }

    fn cancel_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> BoxFuture<'_, (), GcalApiError> {
        let access_token = access_token.to_string();
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();

        Box::pin(async move {
            let body = serde_json::json!({ "status": "cancelled" });

            let response = self
                .http
                .patch(format!(
                    "{}/calendars/{}/events/{}",
                    self.config.api_base, calendar_id, event_id
                ))
                .bearer_auth(&access_token)
                .json(&body)
                .send()
                .await?;

            // A 404 means the event is already gone; that is success for a
            // cancellation.
            if response.status().as_u16() == 404 {
                return Ok(());
            }
            Self::check_status(response).await?;
            Ok(())
        })
    }
}
