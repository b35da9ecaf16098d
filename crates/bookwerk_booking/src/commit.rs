// --- File: crates/bookwerk_booking/src/commit.rs ---
//! The booking commit guard.
//!
//! Turning a chosen slot into a persisted booking happens in three layers:
//! request validation against the scope profile, a fresh busy-set check over
//! the exact slot interval, and the storage-level conditional insert. The
//! last one is authoritative; the fresh check only exists to answer with an
//! accurate 409 (and to include external busy data the insert cannot see).
//!
//! The external calendar event is created after the commit on a spawned
//! task with a bounded timeout. Its failure is logged for manual follow-up
//! and never rolls back the booking: the internal row is the source of truth
//! for slot occupancy.

use crate::logic::{BookingEngine, BookingError};
use bookwerk_common::models::Scope;
use bookwerk_common::services::{CalendarEvent, ConnectionState};
use bookwerk_db::{
    Booking, BookingRepository, BookingStatus, InsertOutcome, NewBooking, ScopeProfileRepository,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use tracing::{debug, info, warn};

/// A customer's request to book a specific slot.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub customer_name: String,
    pub service_name: String,
    pub notes: Option<String>,
    /// When set, the booking starts PENDING and is confirmed by the payment
    /// flow; otherwise it is created CONFIRMED directly.
    pub payment_required: bool,
}

impl BookingEngine {
    /// Validate, re-check freshness, and atomically commit a booking.
    pub async fn commit(
        &self,
        scope: &Scope,
        request: CommitRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let scope_id = scope.id();

        if request.duration_minutes <= 0 {
            return Err(BookingError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }
        if request.customer_name.trim().is_empty() {
            return Err(BookingError::Validation(
                "customer_name must not be empty".to_string(),
            ));
        }

        let profile = self
            .profiles
            .find_by_scope(&scope_id)
            .await?
            .ok_or_else(|| BookingError::UnknownScope(scope_id.clone()))?;

        let hours = profile
            .week
            .for_weekday(request.date.weekday())
            .and_then(|hours| hours.window())
            .ok_or_else(|| {
                BookingError::Validation("the scope is closed on the requested day".to_string())
            })?;
        let (work_start, work_end) = hours;

        let open_minute = i64::from(work_start.hour()) * 60 + i64::from(work_start.minute());
        let close_minute = i64::from(work_end.hour()) * 60 + i64::from(work_end.minute());
        let start_minute =
            i64::from(request.start_time.hour()) * 60 + i64::from(request.start_time.minute());
        let end_minute = start_minute + request.duration_minutes;

        if start_minute < open_minute || end_minute > close_minute {
            return Err(BookingError::Validation(
                "the requested slot is outside working hours".to_string(),
            ));
        }

        let granularity = if profile.granularity_minutes > 0 {
            profile.granularity_minutes
        } else {
            self.settings.default_granularity_minutes
        };
        if (start_minute - open_minute) % granularity != 0 {
            return Err(BookingError::Validation(format!(
                "start time must align to the {}-minute scheduling grid",
                granularity
            )));
        }

        let vacations = self
            .profiles
            .vacations_in_window(&scope_id, request.date, request.date)
            .await?;
        if !vacations.is_empty() {
            return Err(BookingError::Validation(
                "the scope is on vacation on the requested day".to_string(),
            ));
        }

        let slot_start = self
            .minute_on_date(request.date, start_minute)
            .ok_or_else(|| {
                BookingError::Validation("the requested start time does not exist".to_string())
            })?;
        let slot_end = self.minute_on_date(request.date, end_minute).ok_or_else(|| {
            BookingError::Validation("the requested end time does not exist".to_string())
        })?;
        if slot_start < now {
            return Err(BookingError::Validation(
                "the requested slot is in the past".to_string(),
            ));
        }

        // Fresh read over the exact interval; never a stale availability
        // result from an earlier call.
        let busy = self.aggregate_busy(&scope_id, slot_start, slot_end).await?;
        if busy
            .iter()
            .any(|interval| slot_start < interval.end && slot_end > interval.start)
        {
            debug!(
                "Slot {} - {} for {} already busy at commit time",
                slot_start, slot_end, scope_id
            );
            return Err(BookingError::SlotNoLongerAvailable);
        }

        let status = if request.payment_required {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };

        let outcome = self
            .bookings
            .insert_if_free(NewBooking {
                scope_id: scope_id.clone(),
                date: request.date,
                start_minute,
                duration_minutes: request.duration_minutes,
                status,
                customer_name: request.customer_name,
                service_name: request.service_name,
                notes: request.notes,
            })
            .await?;

        let booking = match outcome {
            InsertOutcome::Inserted(booking) => booking,
            // Lost the race between the fresh check and the insert.
            InsertOutcome::Conflict => return Err(BookingError::SlotNoLongerAvailable),
        };

        info!(
            "Committed booking {} for {} on {} at minute {}",
            booking.id, scope_id, booking.date, booking.start_minute
        );

        self.spawn_external_event(&booking, slot_start, slot_end);
        Ok(booking)
    }

    /// Best-effort creation of the corresponding external calendar event.
    fn spawn_external_event(
        &self,
        booking: &Booking,
        slot_start: DateTime<Utc>,
        slot_end: DateTime<Utc>,
    ) {
        let Some(calendar) = self.calendar.clone() else {
            return;
        };
        let bookings = self.bookings.clone();
        let timeout = self.settings.event_timeout;
        let booking_id = booking.id.clone();
        let scope_id = booking.scope_id.clone();
        let event = CalendarEvent {
            start_time: slot_start,
            end_time: slot_end,
            summary: format!("{} - {}", booking.service_name, booking.customer_name),
            description: booking.notes.clone(),
        };

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, calendar.create_event(&scope_id, event)).await {
                Ok(Ok(result)) => {
                    if let Some(event_id) = result.event_id {
                        if let Err(e) = bookings
                            .set_external_event_id(&booking_id, &event_id)
                            .await
                        {
                            warn!(
                                "Booking {} committed but event id {} could not be stored: {}",
                                booking_id, event_id, e
                            );
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(
                        "Booking {} committed but external event creation failed, needs manual follow-up: {}",
                        booking_id, e
                    );
                }
                Err(_) => {
                    warn!(
                        "Booking {} committed but external event creation timed out, needs manual follow-up",
                        booking_id
                    );
                }
            }
        });
    }

    /// Cancel a booking that is still PENDING or CONFIRMED.
    pub async fn cancel_booking(&self, booking_id: &str) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_id.to_string()))?;

        if !self.bookings.cancel(booking_id).await? {
            return Err(BookingError::NotCancellable(booking_id.to_string()));
        }
        info!("Cancelled booking {}", booking_id);

        if let (Some(calendar), Some(event_id)) =
            (self.calendar.clone(), booking.external_event_id.clone())
        {
            let timeout = self.settings.event_timeout;
            let scope_id = booking.scope_id.clone();
            let booking_id = booking_id.to_string();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, calendar.cancel_event(&scope_id, &event_id))
                    .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(
                        "Booking {} cancelled but external event {} was not: {}",
                        booking_id, event_id, e
                    ),
                    Err(_) => warn!(
                        "Booking {} cancelled but external event {} cancellation timed out",
                        booking_id, event_id
                    ),
                }
            });
        }

        let mut cancelled = booking;
        cancelled.status = BookingStatus::Cancelled;
        Ok(cancelled)
    }

    /// Bookings of the scope for the owner's calendar view.
    pub async fn list_bookings(
        &self,
        scope: &Scope,
        from_date: NaiveDate,
        to_date: NaiveDate,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, BookingError> {
        if to_date < from_date {
            return Err(BookingError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        Ok(self
            .bookings
            .list_in_window(&scope.id(), from_date, to_date, include_cancelled)
            .await?)
    }

    /// The scope's external connection state for the owner UI.
    pub async fn connection_state(&self, scope: &Scope) -> Result<ConnectionState, BookingError> {
        let Some(calendar) = &self.calendar else {
            return Ok(ConnectionState::NotConnected);
        };
        calendar
            .connection_state(&scope.id())
            .await
            .map_err(|e| BookingError::Internal(e.to_string()))
    }
}
