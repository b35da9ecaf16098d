// --- File: crates/bookwerk_booking/src/handlers.rs ---
use crate::logic::{BookingEngine, BookingError, DayAvailability};
use crate::commit::CommitRequest;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use bookwerk_common::error::HttpStatusCode;
use bookwerk_common::models::Scope;
use bookwerk_common::services::ConnectionState;
use bookwerk_db::Booking;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// Define shared state needed by booking handlers
#[derive(Clone)]
pub struct BookingState {
    pub engine: Arc<BookingEngine>,
}

// --- Wire Types ---

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AvailabilityQuery {
    /// Workshop the request targets
    pub workshop_id: String,
    /// Set when booking a specific employee instead of the workshop itself
    #[serde(default)]
    pub employee_id: Option<String>,
    /// Start date in YYYY-MM-DD format
    pub start_date: String,
    /// End date in YYYY-MM-DD format (inclusive)
    pub end_date: String,
    /// Appointment duration in minutes
    pub duration_minutes: i64,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SlotDto {
    /// Slot start, RFC3339 in the business timezone
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DaySlots {
    pub date: String,
    pub slots: Vec<SlotDto>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AvailabilityResponse {
    pub days: Vec<DaySlots>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateBookingRequest {
    pub workshop_id: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    /// Appointment date in YYYY-MM-DD format
    pub date: String,
    /// Appointment start in HH:MM, business-local
    pub start_time: String,
    pub duration_minutes: i64,
    pub customer_name: String,
    pub service_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// When true the booking is created PENDING until payment confirms it
    #[serde(default)]
    pub payment_required: bool,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BookingDto {
    pub id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub status: String,
    pub customer_name: String,
    pub service_name: String,
    pub notes: Option<String>,
    pub external_event_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BookingsQuery {
    pub workshop_id: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub include_cancelled: Option<bool>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BookingsResponse {
    pub bookings: Vec<BookingDto>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CancellationResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct CalendarStatusQuery {
    pub workshop_id: String,
    #[serde(default)]
    pub employee_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CalendarStatusResponse {
    pub state: ConnectionState,
}

// --- Helpers ---

fn resolve_scope(workshop_id: String, employee_id: Option<String>) -> Scope {
    match employee_id {
        Some(employee_id) => Scope::Employee {
            employee_id,
            workshop_id,
        },
        None => Scope::Workshop { workshop_id },
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, (StatusCode, String)> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid {} format (YYYY-MM-DD)", field),
        )
    })
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime, (StatusCode, String)> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid {} format (HH:MM)", field),
        )
    })
}

fn map_engine_error(error: BookingError) -> (StatusCode, String) {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, error.to_string())
}

fn minute_as_hhmm(minute: i64) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

fn booking_to_dto(booking: &Booking) -> BookingDto {
    BookingDto {
        id: booking.id.clone(),
        date: booking.date.format("%Y-%m-%d").to_string(),
        start_time: minute_as_hhmm(booking.start_minute),
        end_time: minute_as_hhmm(booking.end_minute()),
        duration_minutes: booking.duration_minutes,
        status: booking.status.as_str().to_string(),
        customer_name: booking.customer_name.clone(),
        service_name: booking.service_name.clone(),
        notes: booking.notes.clone(),
        external_event_id: booking.external_event_id.clone(),
    }
}

fn day_to_dto(day: &DayAvailability, engine: &BookingEngine) -> DaySlots {
    let tz = engine.settings().time_zone;
    DaySlots {
        date: day.date.format("%Y-%m-%d").to_string(),
        slots: day
            .slots
            .iter()
            .map(|slot| SlotDto {
                start_time: slot.start.with_timezone(&tz).to_rfc3339(),
                end_time: slot.end.with_timezone(&tz).to_rfc3339(),
            })
            .collect(),
    }
}

// --- Handlers ---

/// Handler to get per-day available time slots.
#[axum::debug_handler]
pub async fn get_availability_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    let from_date = parse_date(&query.start_date, "start_date")?;
    let to_date = parse_date(&query.end_date, "end_date")?;
    let scope = resolve_scope(query.workshop_id, query.employee_id);

    let days = state
        .engine
        .availability(&scope, from_date, to_date, query.duration_minutes, Utc::now())
        .await
        .map_err(map_engine_error)?;

    Ok(Json(AvailabilityResponse {
        days: days.iter().map(|day| day_to_dto(day, &state.engine)).collect(),
    }))
}

/// Handler to commit a chosen slot into a booking.
#[axum::debug_handler]
pub async fn create_booking_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDto>), (StatusCode, String)> {
    let date = parse_date(&payload.date, "date")?;
    let start_time = parse_time(&payload.start_time, "start_time")?;
    let scope = resolve_scope(payload.workshop_id, payload.employee_id);

    let booking = state
        .engine
        .commit(
            &scope,
            CommitRequest {
                date,
                start_time,
                duration_minutes: payload.duration_minutes,
                customer_name: payload.customer_name,
                service_name: payload.service_name,
                notes: payload.notes,
                payment_required: payload.payment_required,
            },
            Utc::now(),
        )
        .await
        .map_err(map_engine_error)?;

    Ok((StatusCode::CREATED, Json(booking_to_dto(&booking))))
}

/// Handler to cancel a booking.
#[axum::debug_handler]
pub async fn cancel_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<CancellationResponse>, (StatusCode, String)> {
    state
        .engine
        .cancel_booking(&booking_id)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(CancellationResponse {
        success: true,
        message: "Booking cancelled successfully.".to_string(),
    }))
}

/// Handler to list a scope's bookings.
#[axum::debug_handler]
pub async fn list_bookings_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsResponse>, (StatusCode, String)> {
    let from_date = parse_date(&query.start_date, "start_date")?;
    let to_date = parse_date(&query.end_date, "end_date")?;
    let scope = resolve_scope(query.workshop_id, query.employee_id);

    let bookings = state
        .engine
        .list_bookings(
            &scope,
            from_date,
            to_date,
            query.include_cancelled.unwrap_or(false),
        )
        .await
        .map_err(map_engine_error)?;

    Ok(Json(BookingsResponse {
        bookings: bookings.iter().map(booking_to_dto).collect(),
    }))
}

/// Handler to report the scope's calendar connection state.
#[axum::debug_handler]
pub async fn calendar_status_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<CalendarStatusQuery>,
) -> Result<Json<CalendarStatusResponse>, (StatusCode, String)> {
    let scope = resolve_scope(query.workshop_id, query.employee_id);

    let connection_state = state
        .engine
        .connection_state(&scope)
        .await
        .map_err(map_engine_error)?;

    Ok(Json(CalendarStatusResponse {
        state: connection_state,
    }))
}
