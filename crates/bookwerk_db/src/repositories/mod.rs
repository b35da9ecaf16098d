//! Database repositories for Bookwerk
//!
//! Each repository pairs a trait with its SQL implementation so the rest of
//! the system can be tested without a live provider.

pub mod booking;
pub mod booking_sql;
pub mod calendar_connection;
pub mod calendar_connection_sql;
pub mod scope_profile;
pub mod scope_profile_sql;

pub use booking::{Booking, BookingRepository, BookingStatus, InsertOutcome, NewBooking};
pub use booking_sql::SqlBookingRepository;
pub use calendar_connection::{CalendarConnection, CalendarConnectionRepository};
pub use calendar_connection_sql::SqlCalendarConnectionRepository;
pub use scope_profile::{ScopeProfile, ScopeProfileRepository, VacationRange};
pub use scope_profile_sql::SqlScopeProfileRepository;
