//! Repository for scope scheduling profiles
//!
//! Working hours, slot granularity and vacation ranges per bookable scope.
//! Read-only input to slot generation; the settings UI writes these rows.

use crate::error::DbError;
use bookwerk_common::models::{ScopeId, WeekSchedule};
use chrono::NaiveDate;

/// Scheduling profile of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeProfile {
    pub scope_id: ScopeId,
    pub week: WeekSchedule,
    pub granularity_minutes: i64,
}

/// A closed date range during which the scope takes no bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacationRange {
    pub scope_id: ScopeId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Repository for scope profiles and vacations.
pub trait ScopeProfileRepository {
    /// Initialize the database schema.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Load the profile for a scope, if configured.
    fn find_by_scope(
        &self,
        scope_id: &ScopeId,
    ) -> impl std::future::Future<Output = Result<Option<ScopeProfile>, DbError>> + Send;

    /// Create or replace the profile for a scope.
    fn upsert(
        &self,
        profile: ScopeProfile,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Vacation ranges of the scope overlapping `[from_date, to_date]`.
    fn vacations_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<VacationRange>, DbError>> + Send;

    /// Record a vacation range.
    fn add_vacation(
        &self,
        vacation: VacationRange,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;
}
