// File: crates/bookwerk_booking/src/doc.rs

#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{
    AvailabilityQuery, AvailabilityResponse, BookingDto, BookingsQuery, BookingsResponse,
    CalendarStatusQuery, CalendarStatusResponse, CancellationResponse, CreateBookingRequest,
    DaySlots, SlotDto,
};

#[utoipa::path(
    get,
    path = "/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Per-day available slot lists", body = AvailabilityResponse),
        (status = 400, description = "Malformed dates, inverted range, or invalid duration", body = String),
        (status = 404, description = "Unknown scope", body = String),
        (status = 500, description = "Internal error", body = String)
    )
)]
fn doc_get_availability_handler() {}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body(content = CreateBookingRequest, example = json!({
        "workshop_id": "w-1042",
        "date": "2025-06-02",
        "start_time": "09:30",
        "duration_minutes": 30,
        "customer_name": "Erika Mustermann",
        "service_name": "Wheel change",
        "payment_required": true
    })),
    responses(
        (status = 201, description = "Booking committed", body = BookingDto),
        (status = 400, description = "Validation failed", body = String),
        (status = 404, description = "Unknown scope", body = String),
        (status = 409, description = "Requested time slot is no longer available", body = String)
    )
)]
fn doc_create_booking_handler() {}

#[utoipa::path(
    post,
    path = "/bookings/{booking_id}/cancel",
    params(
        ("booking_id" = String, Path, description = "The ID of the booking to cancel")
    ),
    responses(
        (status = 200, description = "Cancellation result", body = CancellationResponse),
        (status = 404, description = "Booking not found", body = String),
        (status = 409, description = "Booking can no longer be cancelled", body = String)
    )
)]
fn doc_cancel_booking_handler() {}

#[utoipa::path(
    get,
    path = "/bookings",
    params(BookingsQuery),
    responses(
        (status = 200, description = "Bookings of the scope in the window", body = BookingsResponse),
        (status = 400, description = "Malformed dates", body = String)
    )
)]
fn doc_list_bookings_handler() {}

#[utoipa::path(
    get,
    path = "/calendar/status",
    params(CalendarStatusQuery),
    responses(
        (status = 200, description = "Connection state of the scope's external calendar", body = CalendarStatusResponse)
    )
)]
fn doc_calendar_status_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_get_availability_handler,
        doc_create_booking_handler,
        doc_cancel_booking_handler,
        doc_list_bookings_handler,
        doc_calendar_status_handler
    ),
    components(
        schemas(
            AvailabilityResponse,
            DaySlots,
            SlotDto,
            CreateBookingRequest,
            BookingDto,
            BookingsResponse,
            CancellationResponse,
            CalendarStatusResponse
        )
    ),
    tags(
        (name = "booking", description = "Availability and booking API")
    ),
    servers(
        (url = "/api", description = "Main API prefix")
    )
)]
pub struct BookingApiDoc;
