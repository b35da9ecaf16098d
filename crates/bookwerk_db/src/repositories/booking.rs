//! Repository for appointment bookings
//!
//! The booking table is the system of record for slot occupancy. All writes
//! go through [`BookingRepository::insert_if_free`], an atomic conditional
//! insert that refuses overlapping active bookings at the storage layer.

use crate::error::DbError;
use bookwerk_common::models::ScopeId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking.
///
/// Only the initial insert happens here; PENDING → CONFIRMED is driven by the
/// payment flow and cancellation by its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(DbError::DecodeError(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }

    /// Statuses that occupy their slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed
        )
    }
}

/// A persisted booking row.
///
/// Times are business-local: `date` plus `start_minute` minutes since local
/// midnight. The configured business timezone turns them into instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub scope_id: ScopeId,
    pub date: NaiveDate,
    pub start_minute: i64,
    pub duration_minutes: i64,
    pub status: BookingStatus,
    pub customer_name: String,
    pub service_name: String,
    pub notes: Option<String>,
    pub external_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn end_minute(&self) -> i64 {
        self.start_minute + self.duration_minutes
    }
}

/// Payload for creating a booking. The id and created_at are assigned by the
/// repository.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub scope_id: ScopeId,
    pub date: NaiveDate,
    pub start_minute: i64,
    pub duration_minutes: i64,
    pub status: BookingStatus,
    pub customer_name: String,
    pub service_name: String,
    pub notes: Option<String>,
}

/// Result of the atomic conditional insert.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Booking),
    /// An active booking already overlaps the requested interval.
    Conflict,
}

/// Repository for bookings.
pub trait BookingRepository {
    /// Initialize the database schema.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Insert a booking if and only if no active booking for the same scope
    /// overlaps `[start_minute, start_minute + duration_minutes)` on the same
    /// date. Executed as a single statement so concurrent committers cannot
    /// both succeed.
    fn insert_if_free(
        &self,
        booking: NewBooking,
    ) -> impl std::future::Future<Output = Result<InsertOutcome, DbError>> + Send;

    /// All active (PENDING/CONFIRMED/COMPLETED) bookings of the scope with a
    /// date inside `[from_date, to_date]`, ordered by date and start.
    fn active_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<Booking>, DbError>> + Send;

    /// Bookings of the scope in the date window for the owner's calendar
    /// view, optionally including cancelled ones.
    fn list_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
        include_cancelled: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Booking>, DbError>> + Send;

    /// Find a booking by id.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Booking>, DbError>> + Send;

    /// Cancel a booking that is still PENDING or CONFIRMED. Returns `false`
    /// when the row is missing or already finished.
    fn cancel(&self, id: &str) -> impl std::future::Future<Output = Result<bool, DbError>> + Send;

    /// Attach the external calendar event id created for this booking.
    fn set_external_event_id(
        &self,
        id: &str,
        event_id: &str,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Cancel PENDING bookings created before `older_than`, releasing slots
    /// held by abandoned payment flows. Returns the number of rows swept.
    fn expire_pending(
        &self,
        older_than: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, DbError>> + Send;
}
