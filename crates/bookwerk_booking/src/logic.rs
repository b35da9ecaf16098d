// --- File: crates/bookwerk_booking/src/logic.rs ---
//! Busy-interval aggregation and availability computation.
//!
//! The aggregator unions internal bookings with the scope's external busy
//! intervals into one merged busy set per window. External trouble of any
//! kind degrades to an internal-only answer; it never fails the computation.

use crate::slots::{generate_slots, AvailabilitySlot};
use bookwerk_common::error::HttpStatusCode;
use bookwerk_common::models::{Scope, ScopeId};
use bookwerk_common::services::{BoxedError, CalendarService, ExternalBusy};
use bookwerk_config::BookingConfig;
use bookwerk_db::{
    BookingRepository, DbError, ScopeProfileRepository, SqlBookingRepository,
    SqlScopeProfileRepository,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No scheduling profile for scope {0}")]
    UnknownScope(ScopeId),
    #[error("Requested time slot is no longer available")]
    SlotNoLongerAvailable,
    #[error("Booking not found: {0}")]
    NotFound(String),
    #[error("Booking {0} can no longer be cancelled")]
    NotCancellable(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpStatusCode for BookingError {
    fn status_code(&self) -> u16 {
        match self {
            BookingError::Validation(_) => 400,
            BookingError::UnknownScope(_) => 404,
            BookingError::SlotNoLongerAvailable => 409,
            BookingError::NotFound(_) => 404,
            BookingError::NotCancellable(_) => 409,
            BookingError::Database(_) => 500,
            BookingError::Internal(_) => 500,
        }
    }
}

// --- Data Structures ---

/// Where a busy interval came from. Ephemeral, produced only during
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusySource {
    Internal,
    External,
}

/// A time range during which the scope cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: BusySource,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, source: BusySource) -> Self {
        Self { start, end, source }
    }
}

/// Available slots of a single day.
#[derive(Debug, Clone)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<AvailabilitySlot>,
}

/// Clip intervals to the window, drop degenerate ones, sort and merge.
///
/// Merging joins any interval whose start is at or before the running merged
/// end; a merged run keeps the source of its earliest member. Touching busy
/// intervals may merge, which never changes which slots are blocked because
/// the slot overlap test is strict.
pub fn clip_and_merge(
    intervals: Vec<BusyInterval>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<BusyInterval> {
    let mut clipped: Vec<BusyInterval> = intervals
        .into_iter()
        .filter_map(|interval| {
            let start = interval.start.max(window_start);
            let end = interval.end.min(window_end);
            // Zero-length and inverted intervals are dropped here.
            (start < end).then_some(BusyInterval::new(start, end, interval.source))
        })
        .collect();

    if clipped.is_empty() {
        return clipped;
    }
    clipped.sort_by_key(|interval| interval.start);

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(clipped.len());
    for interval in clipped {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Engine-wide scheduling settings derived from [`BookingConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub time_zone: Tz,
    pub default_granularity_minutes: i64,
    pub max_window_days: i64,
    pub pending_hold: Duration,
    pub event_timeout: std::time::Duration,
}

impl EngineSettings {
    pub fn from_config(config: &BookingConfig) -> Self {
        let time_zone = Tz::from_str(&config.time_zone).unwrap_or_else(|_| {
            warn!(
                "Unknown business time zone {:?}, falling back to Europe/Berlin",
                config.time_zone
            );
            Tz::Europe__Berlin
        });
        Self {
            time_zone,
            default_granularity_minutes: config.granularity_minutes,
            max_window_days: config.max_window_days,
            pending_hold: Duration::minutes(config.pending_hold_minutes),
            event_timeout: std::time::Duration::from_secs(config.event_timeout_secs),
        }
    }
}

/// The availability and booking engine for one deployment.
///
/// Holds the internal booking store, the scope profiles and (optionally) the
/// external calendar service. All caller-facing operations live on this
/// struct; handlers stay thin.
pub struct BookingEngine {
    pub(crate) bookings: SqlBookingRepository,
    pub(crate) profiles: SqlScopeProfileRepository,
    pub(crate) calendar: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
    pub(crate) settings: EngineSettings,
}

impl BookingEngine {
    pub fn new(
        bookings: SqlBookingRepository,
        profiles: SqlScopeProfileRepository,
        calendar: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            bookings,
            profiles,
            calendar,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// A business-local wall-clock minute on `date` as a UTC instant.
    ///
    /// Minutes past midnight spill into the next day. Returns `None` for
    /// local times skipped by a DST transition.
    pub(crate) fn minute_on_date(&self, date: NaiveDate, minute: i64) -> Option<DateTime<Utc>> {
        let (date, minute) = if minute >= 24 * 60 {
            (date.succ_opt()?, minute - 24 * 60)
        } else {
            (date, minute)
        };
        let time = NaiveTime::from_hms_opt((minute / 60) as u32, (minute % 60) as u32, 0)?;
        self.settings
            .time_zone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Merge internal bookings and the external busy set for the window.
    ///
    /// Always succeeds for external trouble; only an internal storage failure
    /// propagates.
    pub async fn aggregate_busy(
        &self,
        scope_id: &ScopeId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, BookingError> {
        let tz = self.settings.time_zone;
        let from_date = window_start.with_timezone(&tz).date_naive();
        let to_date = window_end.with_timezone(&tz).date_naive();

        let mut intervals: Vec<BusyInterval> = Vec::new();
        for booking in self
            .bookings
            .active_in_window(scope_id, from_date, to_date)
            .await?
        {
            let (Some(start), Some(end)) = (
                self.minute_on_date(booking.date, booking.start_minute),
                self.minute_on_date(booking.date, booking.end_minute()),
            ) else {
                warn!("Skipping booking {} with unrepresentable time", booking.id);
                continue;
            };
            intervals.push(BusyInterval::new(start, end, BusySource::Internal));
        }

        match &self.calendar {
            Some(calendar) => match calendar.read_busy(scope_id, window_start, window_end).await {
                Ok(ExternalBusy::Busy(periods)) => {
                    intervals.extend(
                        periods
                            .into_iter()
                            .map(|(start, end)| {
                                BusyInterval::new(start, end, BusySource::External)
                            }),
                    );
                }
                Ok(ExternalBusy::NoConnection) => {
                    debug!("Scope {} has no external calendar connection", scope_id);
                }
                Ok(ExternalBusy::ReauthRequired) => {
                    warn!(
                        "External calendar for {} needs re-authorization, using internal bookings only",
                        scope_id
                    );
                }
                Ok(ExternalBusy::Unavailable) => {
                    warn!(
                        "External calendar for {} unavailable, using internal bookings only",
                        scope_id
                    );
                }
                Err(e) => {
                    warn!(
                        "External busy read for {} failed ({}), using internal bookings only",
                        scope_id, e
                    );
                }
            },
            None => debug!("No external calendar service configured"),
        }

        Ok(clip_and_merge(intervals, window_start, window_end))
    }

    /// Per-day availability for the scope over an inclusive date range.
    pub async fn availability(
        &self,
        scope: &Scope,
        from_date: NaiveDate,
        to_date: NaiveDate,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayAvailability>, BookingError> {
        if duration_minutes <= 0 {
            return Err(BookingError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }
        if to_date < from_date {
            return Err(BookingError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        let window_days = (to_date - from_date).num_days() + 1;
        if window_days > self.settings.max_window_days {
            return Err(BookingError::Validation(format!(
                "date range exceeds {} days",
                self.settings.max_window_days
            )));
        }

        let scope_id = scope.id();
        let profile = self
            .profiles
            .find_by_scope(&scope_id)
            .await?
            .ok_or_else(|| BookingError::UnknownScope(scope_id.clone()))?;
        let granularity = if profile.granularity_minutes > 0 {
            profile.granularity_minutes
        } else {
            self.settings.default_granularity_minutes
        };

        // Release slots held by abandoned payment flows before answering.
        let swept = self
            .bookings
            .expire_pending(now - self.settings.pending_hold)
            .await?;
        if swept > 0 {
            debug!("Expired {} stale pending bookings for availability", swept);
        }

        let window_start = self
            .minute_on_date(from_date, 0)
            .ok_or_else(|| BookingError::Validation("unrepresentable start date".to_string()))?;
        let window_end = self
            .minute_on_date(to_date, 24 * 60)
            .ok_or_else(|| BookingError::Validation("unrepresentable end date".to_string()))?;

        let busy = self
            .aggregate_busy(&scope_id, window_start, window_end)
            .await?;
        let vacations = self
            .profiles
            .vacations_in_window(&scope_id, from_date, to_date)
            .await?;

        let mut days = Vec::with_capacity(window_days as usize);
        let mut date = from_date;
        while date <= to_date {
            let on_vacation = vacations
                .iter()
                .any(|vacation| vacation.start_date <= date && date <= vacation.end_date);

            let slots = if on_vacation {
                Vec::new()
            } else {
                match profile.week.for_weekday(date.weekday()) {
                    Some(hours) => generate_slots(
                        date,
                        hours,
                        &busy,
                        duration_minutes,
                        granularity,
                        self.settings.time_zone,
                        Some(now),
                    )
                    .collect(),
                    None => Vec::new(),
                }
            };
            days.push(DayAvailability { date, slots });

            let Some(next) = date.succ_opt() else { break };
            date = next;
        }

        Ok(days)
    }
}
