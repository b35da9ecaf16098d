// --- File: crates/bookwerk_common/src/models.rs ---
//! Domain value types shared across the Bookwerk crates.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The bookable unit: either a workshop as a whole or a single employee
/// within a workshop.
///
/// The variant is resolved once at the API boundary; every downstream
/// component operates on the flattened [`ScopeId`] and never re-branches on
/// the scope kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Workshop { workshop_id: String },
    Employee { employee_id: String, workshop_id: String },
}

impl Scope {
    /// The flattened identifier used as the key for bookings, calendar
    /// connections and working-hours profiles.
    pub fn id(&self) -> ScopeId {
        match self {
            Scope::Workshop { workshop_id } => ScopeId(format!("workshop:{}", workshop_id)),
            Scope::Employee { employee_id, .. } => ScopeId(format!("employee:{}", employee_id)),
        }
    }

    /// The workshop this scope belongs to.
    pub fn workshop_id(&self) -> &str {
        match self {
            Scope::Workshop { workshop_id } => workshop_id,
            Scope::Employee { workshop_id, .. } => workshop_id,
        }
    }
}

/// Flattened scope identifier (`workshop:<id>` or `employee:<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub String);

impl ScopeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        ScopeId(value.to_string())
    }
}

/// Working hours for a single weekday.
///
/// Times are business-local `HH:MM` strings, the format the settings UI
/// writes. A day with `open == false`, a malformed time, or an empty window
/// produces no slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: bool,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl DayHours {
    /// The parsed `[start, end)` window, or `None` when the day is closed or
    /// the stored times are unusable.
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        if !self.open {
            return None;
        }
        let start = NaiveTime::parse_from_str(&self.start, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end, "%H:%M").ok()?;
        if end <= start {
            return None;
        }
        Some((start, end))
    }
}

/// A full week of working hours, keyed by lowercase weekday name in the
/// stored JSON. Missing days are closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule {
    #[serde(default)]
    pub monday: Option<DayHours>,
    #[serde(default)]
    pub tuesday: Option<DayHours>,
    #[serde(default)]
    pub wednesday: Option<DayHours>,
    #[serde(default)]
    pub thursday: Option<DayHours>,
    #[serde(default)]
    pub friday: Option<DayHours>,
    #[serde(default)]
    pub saturday: Option<DayHours>,
    #[serde(default)]
    pub sunday: Option<DayHours>,
}

impl WeekSchedule {
    pub fn for_weekday(&self, weekday: Weekday) -> Option<&DayHours> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }
}
