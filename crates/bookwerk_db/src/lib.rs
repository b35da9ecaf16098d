//! Database integration for Bookwerk
//!
//! This crate provides a database client built on SQLx plus the repositories
//! the booking engine uses: bookings (with the atomic conditional insert that
//! protects the no-overlap invariant), calendar connections (token rotation),
//! and scope scheduling profiles. It supports SQLite, PostgreSQL, and MySQL
//! through feature flags; SQLite is the default.

pub mod client;
pub mod error;
pub mod repositories;

// Re-export the client and repository types for ease of use
pub use client::DbClient;
pub use error::DbError;
pub use repositories::{
    Booking, BookingRepository, BookingStatus, CalendarConnection, CalendarConnectionRepository,
    InsertOutcome, NewBooking, ScopeProfile, ScopeProfileRepository, SqlBookingRepository,
    SqlCalendarConnectionRepository, SqlScopeProfileRepository, VacationRange,
};

/// Initialize every table the engine needs. Called once at startup.
pub async fn init_all_schemas(db_client: &DbClient) -> Result<(), DbError> {
    SqlBookingRepository::new(db_client.clone()).init_schema().await?;
    SqlCalendarConnectionRepository::new(db_client.clone())
        .init_schema()
        .await?;
    SqlScopeProfileRepository::new(db_client.clone())
        .init_schema()
        .await?;
    Ok(())
}
