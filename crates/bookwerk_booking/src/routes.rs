// --- File: crates/bookwerk_booking/src/routes.rs ---

use crate::handlers::{
    calendar_status_handler, cancel_booking_handler, create_booking_handler,
    get_availability_handler, list_bookings_handler, BookingState,
};
use crate::logic::BookingEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all routes for the booking engine.
pub fn routes(engine: Arc<BookingEngine>) -> Router {
    let state = Arc::new(BookingState { engine });

    Router::new()
        .route("/availability", get(get_availability_handler))
        .route(
            "/bookings",
            get(list_bookings_handler).post(create_booking_handler),
        )
        .route("/bookings/{booking_id}/cancel", post(cancel_booking_handler))
        .route("/calendar/status", get(calendar_status_handler))
        .with_state(state)
}
