// --- File: crates/bookwerk_booking/src/slots.rs ---
//! Candidate slot generation for a single day.
//!
//! The generator walks granularity-aligned start times inside the working
//! hours window and yields every candidate that is fully disjoint from the
//! merged busy set. It is a lazy iterator so callers can cap result counts
//! cheaply, and `Clone` makes a sequence restartable from the beginning.

use crate::logic::BusyInterval;
use bookwerk_common::models::DayHours;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

/// A candidate bookable interval. Ephemeral: it only becomes persistent as a
/// Booking through the commit guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilitySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Lazy, finite, restartable sequence of available slots for one day.
#[derive(Clone)]
pub struct SlotIter {
    cursor: DateTime<Utc>,
    window_end: DateTime<Utc>,
    duration: Duration,
    step: Duration,
    busy: Arc<[(DateTime<Utc>, DateTime<Utc>)]>,
    not_before: Option<DateTime<Utc>>,
}

impl Iterator for SlotIter {
    type Item = AvailabilitySlot;

    fn next(&mut self) -> Option<AvailabilitySlot> {
        while self.cursor + self.duration <= self.window_end {
            let start = self.cursor;
            let end = start + self.duration;
            self.cursor += self.step;

            if let Some(not_before) = self.not_before {
                if start < not_before {
                    continue;
                }
            }

            // Strict overlap test: a slot may touch a busy boundary.
            let overlaps = self
                .busy
                .iter()
                .any(|(busy_start, busy_end)| start < *busy_end && end > *busy_start);
            if overlaps {
                continue;
            }

            return Some(AvailabilitySlot { start, end });
        }
        None
    }
}

/// Empty sequence, for closed days and degenerate inputs.
fn empty_iter() -> SlotIter {
    let epoch = Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now);
    SlotIter {
        cursor: epoch,
        window_end: epoch,
        duration: Duration::minutes(1),
        step: Duration::minutes(1),
        busy: Arc::from(Vec::<(DateTime<Utc>, DateTime<Utc>)>::new().into_boxed_slice()),
        not_before: None,
    }
}

/// Generate candidate slots for `date` under the given weekday profile.
///
/// The sequence is empty when the day is closed, the working window is
/// malformed, or the duration does not fit the window. `not_before` filters
/// out candidates starting before that instant (callers pass "now").
pub fn generate_slots(
    date: NaiveDate,
    hours: &DayHours,
    busy: &[BusyInterval],
    duration_minutes: i64,
    granularity_minutes: i64,
    time_zone: Tz,
    not_before: Option<DateTime<Utc>>,
) -> SlotIter {
    if duration_minutes <= 0 || granularity_minutes <= 0 {
        return empty_iter();
    }
    let Some((work_start, work_end)) = hours.window() else {
        return empty_iter();
    };

    // Resolve the local working window to UTC instants. Days where the local
    // time does not exist (DST transition) produce no slots.
    let Some(window_start) = time_zone
        .from_local_datetime(&date.and_time(work_start))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
    else {
        return empty_iter();
    };
    let Some(window_end) = time_zone
        .from_local_datetime(&date.and_time(work_end))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
    else {
        return empty_iter();
    };

    let busy_pairs: Vec<(DateTime<Utc>, DateTime<Utc>)> = busy
        .iter()
        .map(|interval| (interval.start, interval.end))
        .collect();

    SlotIter {
        cursor: window_start,
        window_end,
        duration: Duration::minutes(duration_minutes),
        step: Duration::minutes(granularity_minutes),
        busy: Arc::from(busy_pairs.into_boxed_slice()),
        not_before,
    }
}
