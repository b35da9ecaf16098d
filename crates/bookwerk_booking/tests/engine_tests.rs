//! Engine tests against an in-memory database and a scripted external
//! calendar. These cover the aggregation/commit semantics that need real
//! storage underneath: graceful degradation, the end-to-end availability
//! scenario, conflict-safe commits and the cancellation flow.

use bookwerk_booking::{BookingEngine, BookingError, CommitRequest, EngineSettings};
use bookwerk_common::models::{DayHours, Scope, ScopeId, WeekSchedule};
use bookwerk_common::services::{
    BoxFuture, BoxedError, CalendarEvent, CalendarEventResult, CalendarService, ConnectionState,
    ExternalBusy,
};
use bookwerk_config::BookingConfig;
use bookwerk_db::{
    BookingRepository, BookingStatus, DbClient, InsertOutcome, NewBooking, ScopeProfile,
    ScopeProfileRepository, SqlBookingRepository, SqlScopeProfileRepository, VacationRange,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

const TZ: Tz = Tz::Europe__Berlin;

/// Scripted external calendar: serves a fixed busy outcome and records
/// created/cancelled events.
struct ScriptedCalendar {
    outcome: ExternalBusy,
    created: Mutex<Vec<CalendarEvent>>,
    cancelled: Mutex<Vec<String>>,
}

impl ScriptedCalendar {
    fn new(outcome: ExternalBusy) -> Self {
        Self {
            outcome,
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    fn cancelled_ids(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

impl CalendarService for ScriptedCalendar {
    type Error = BoxedError;

    fn read_busy(
        &self,
        _scope_id: &ScopeId,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, ExternalBusy, Self::Error> {
        let outcome = self.outcome.clone();
        Box::pin(async move { Ok(outcome) })
    }

    fn create_event(
        &self,
        _scope_id: &ScopeId,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        Box::pin(async move {
            self.created.lock().unwrap().push(event);
            Ok(CalendarEventResult {
                event_id: Some("ext-evt-1".to_string()),
                status: "confirmed".to_string(),
            })
        })
    }

    fn cancel_event(&self, _scope_id: &ScopeId, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.cancelled.lock().unwrap().push(event_id);
            Ok(())
        })
    }

    fn connection_state(&self, _scope_id: &ScopeId) -> BoxFuture<'_, ConnectionState, Self::Error> {
        Box::pin(async { Ok(ConnectionState::Connected) })
    }
}

fn workshop_scope() -> Scope {
    Scope::Workshop {
        workshop_id: "w1".to_string(),
    }
}

fn weekday_hours() -> WeekSchedule {
    let open = DayHours {
        open: true,
        start: "08:00".to_string(),
        end: "12:00".to_string(),
    };
    WeekSchedule {
        monday: Some(open.clone()),
        tuesday: Some(open.clone()),
        wednesday: Some(open.clone()),
        thursday: Some(open.clone()),
        friday: Some(open),
        ..WeekSchedule::default()
    }
}

async fn engine_with(
    calendar: Option<Arc<ScriptedCalendar>>,
) -> (BookingEngine, SqlBookingRepository, SqlScopeProfileRepository) {
    let db_path =
        std::env::temp_dir().join(format!("bookwerk-engine-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", db_path.display());
    let client = DbClient::from_url(&url).await.expect("create db client");

    let bookings = SqlBookingRepository::new(client.clone());
    bookings.init_schema().await.expect("init bookings schema");
    let profiles = SqlScopeProfileRepository::new(client);
    profiles.init_schema().await.expect("init profiles schema");

    profiles
        .upsert(ScopeProfile {
            scope_id: workshop_scope().id(),
            week: weekday_hours(),
            granularity_minutes: 30,
        })
        .await
        .expect("seed profile");

    let settings = EngineSettings::from_config(&BookingConfig::default());
    let calendar_service: Option<Arc<dyn CalendarService<Error = BoxedError>>> = calendar
        .map(|calendar| calendar as Arc<dyn CalendarService<Error = BoxedError>>);
    let engine = BookingEngine::new(
        bookings.clone(),
        profiles.clone(),
        calendar_service,
        settings,
    );
    (engine, bookings, profiles)
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn local(h: u32, m: u32) -> DateTime<Utc> {
    TZ.with_ymd_and_hms(2025, 6, 2, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// An engine "now" before the test date so no slots are filtered as past.
fn early_clock() -> DateTime<Utc> {
    TZ.with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

async fn seed_confirmed_booking(bookings: &SqlBookingRepository, start_minute: i64, duration: i64) {
    let outcome = bookings
        .insert_if_free(NewBooking {
            scope_id: workshop_scope().id(),
            date: monday(),
            start_minute,
            duration_minutes: duration,
            status: BookingStatus::Confirmed,
            customer_name: "Seeded".to_string(),
            service_name: "Wheel change".to_string(),
            notes: None,
        })
        .await
        .expect("seed booking");
    assert!(matches!(outcome, InsertOutcome::Inserted(_)));
}

#[tokio::test]
async fn availability_merges_internal_and_external_busy_data() {
    // Spec scenario: open 08:00-12:00, 30-minute duration and granularity,
    // internal booking 09:00-09:30, external busy 10:00-10:30.
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Busy(vec![(
        local(10, 0),
        local(10, 30),
    )])));
    let (engine, bookings, _) = engine_with(Some(calendar)).await;
    seed_confirmed_booking(&bookings, 9 * 60, 30).await;

    let days = engine
        .availability(&workshop_scope(), monday(), monday(), 30, early_clock())
        .await
        .expect("availability");

    assert_eq!(days.len(), 1);
    let starts: Vec<_> = days[0].slots.iter().map(|slot| slot.start).collect();
    assert_eq!(
        starts,
        vec![
            local(8, 0),
            local(8, 30),
            local(9, 30),
            local(10, 30),
            local(11, 0),
            local(11, 30),
        ]
    );
}

#[tokio::test]
async fn availability_degrades_gracefully_when_reader_unavailable() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Unavailable));
    let (engine, bookings, _) = engine_with(Some(calendar)).await;
    seed_confirmed_booking(&bookings, 9 * 60, 30).await;

    let days = engine
        .availability(&workshop_scope(), monday(), monday(), 30, early_clock())
        .await
        .expect("availability must not fail on provider trouble");

    // The internal booking still blocks its slot
    let starts: Vec<_> = days[0].slots.iter().map(|slot| slot.start).collect();
    assert!(!starts.contains(&local(9, 0)));
    assert!(starts.contains(&local(8, 0)));
    assert_eq!(starts.len(), 7);
}

#[tokio::test]
async fn availability_treats_reauth_required_like_no_external_data() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::ReauthRequired));
    let (engine, _, _) = engine_with(Some(calendar)).await;

    let days = engine
        .availability(&workshop_scope(), monday(), monday(), 30, early_clock())
        .await
        .expect("availability");
    assert_eq!(days[0].slots.len(), 8);
}

#[tokio::test]
async fn closed_and_vacation_days_have_empty_slot_lists() {
    let (engine, _, profiles) = engine_with(None).await;

    // Sunday is not in the schedule
    let sunday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let days = engine
        .availability(
            &workshop_scope(),
            sunday,
            sunday,
            30,
            TZ.with_ymd_and_hms(2025, 5, 1, 0, 0, 0)
                .unwrap()
                .with_timezone(&Utc),
        )
        .await
        .expect("availability");
    assert!(days[0].slots.is_empty());

    // A vacation range closes an otherwise open day
    profiles
        .add_vacation(VacationRange {
            scope_id: workshop_scope().id(),
            start_date: monday(),
            end_date: monday(),
        })
        .await
        .expect("add vacation");
    let days = engine
        .availability(&workshop_scope(), monday(), monday(), 30, early_clock())
        .await
        .expect("availability");
    assert!(days[0].slots.is_empty());
}

#[tokio::test]
async fn aggregation_is_idempotent_without_intervening_writes() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Busy(vec![(
        local(10, 0),
        local(11, 0),
    )])));
    let (engine, bookings, _) = engine_with(Some(calendar)).await;
    seed_confirmed_booking(&bookings, 9 * 60, 45).await;

    let scope_id = workshop_scope().id();
    let first = engine
        .aggregate_busy(&scope_id, local(0, 0), local(23, 0))
        .await
        .expect("aggregate");
    let second = engine
        .aggregate_busy(&scope_id, local(0, 0), local(23, 0))
        .await
        .expect("aggregate");
    assert_eq!(first, second);
}

#[tokio::test]
async fn commit_persists_and_reports_conflicts_for_the_same_slot() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Busy(Vec::new())));
    let (engine, _, _) = engine_with(Some(calendar.clone())).await;

    let request = CommitRequest {
        date: monday(),
        start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        duration_minutes: 30,
        customer_name: "Erika Mustermann".to_string(),
        service_name: "Wheel change".to_string(),
        notes: Some("summer tires".to_string()),
        payment_required: false,
    };

    let booking = engine
        .commit(&workshop_scope(), request.clone(), early_clock())
        .await
        .expect("commit");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.start_minute, 9 * 60 + 30);

    // Same slot again: the freshly aggregated internal busy set rejects it
    let second = engine
        .commit(&workshop_scope(), request, early_clock())
        .await;
    assert!(matches!(second, Err(BookingError::SlotNoLongerAvailable)));

    // The spawned best-effort event creation reaches the scripted provider
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(calendar.created_count(), 1);
}

#[tokio::test]
async fn commit_validates_working_hours_grid_and_scope() {
    let (engine, _, _) = engine_with(None).await;

    let base = CommitRequest {
        date: monday(),
        start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        duration_minutes: 30,
        customer_name: "Erika Mustermann".to_string(),
        service_name: "Wheel change".to_string(),
        notes: None,
        payment_required: false,
    };

    // Before opening
    let result = engine
        .commit(&workshop_scope(), base.clone(), early_clock())
        .await;
    assert!(matches!(result, Err(BookingError::Validation(_))));

    // Duration overruns closing time
    let mut overrun = base.clone();
    overrun.start_time = NaiveTime::from_hms_opt(11, 30, 0).unwrap();
    overrun.duration_minutes = 60;
    let result = engine
        .commit(&workshop_scope(), overrun, early_clock())
        .await;
    assert!(matches!(result, Err(BookingError::Validation(_))));

    // Off the scheduling grid
    let mut misaligned = base.clone();
    misaligned.start_time = NaiveTime::from_hms_opt(9, 10, 0).unwrap();
    let result = engine
        .commit(&workshop_scope(), misaligned, early_clock())
        .await;
    assert!(matches!(result, Err(BookingError::Validation(_))));

    // Sunday is closed
    let mut closed_day = base.clone();
    closed_day.date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    closed_day.start_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let result = engine
        .commit(&workshop_scope(), closed_day, early_clock())
        .await;
    assert!(matches!(result, Err(BookingError::Validation(_))));

    // Unknown scope
    let unknown = Scope::Employee {
        employee_id: "nobody".to_string(),
        workshop_id: "w1".to_string(),
    };
    let mut valid_slot = base;
    valid_slot.start_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let result = engine.commit(&unknown, valid_slot, early_clock()).await;
    assert!(matches!(result, Err(BookingError::UnknownScope(_))));
}

#[tokio::test]
async fn cancelling_frees_the_slot_and_cancels_the_external_event() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Busy(Vec::new())));
    let (engine, bookings, _) = engine_with(Some(calendar.clone())).await;

    let request = CommitRequest {
        date: monday(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        duration_minutes: 30,
        customer_name: "Erika Mustermann".to_string(),
        service_name: "Tire repair".to_string(),
        notes: None,
        payment_required: false,
    };
    let booking = engine
        .commit(&workshop_scope(), request.clone(), early_clock())
        .await
        .expect("commit");

    // Wait for the spawned event creation to attach the external id
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let stored = bookings
        .find_by_id(&booking.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(stored.external_event_id.as_deref(), Some("ext-evt-1"));

    let cancelled = engine.cancel_booking(&booking.id).await.expect("cancel");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(calendar.cancelled_ids(), vec!["ext-evt-1".to_string()]);

    // A second cancellation is rejected
    let again = engine.cancel_booking(&booking.id).await;
    assert!(matches!(again, Err(BookingError::NotCancellable(_))));

    // The slot is bookable again
    engine
        .commit(&workshop_scope(), request, early_clock())
        .await
        .expect("slot free after cancellation");
}

#[tokio::test]
async fn pending_bookings_hold_the_slot_until_swept() {
    let (engine, _, profiles) = engine_with(None).await;

    // Far-future date so slots stay in the future while we advance the clock
    let future_monday = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
    profiles
        .upsert(ScopeProfile {
            scope_id: workshop_scope().id(),
            week: weekday_hours(),
            granularity_minutes: 30,
        })
        .await
        .expect("profile");

    let request = CommitRequest {
        date: future_monday,
        start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        duration_minutes: 30,
        customer_name: "Erika Mustermann".to_string(),
        service_name: "Wheel change".to_string(),
        notes: None,
        payment_required: true,
    };
    let booking = engine
        .commit(&workshop_scope(), request, Utc::now())
        .await
        .expect("commit pending");
    assert_eq!(booking.status, BookingStatus::Pending);

    // While the hold is active the slot is blocked
    let days = engine
        .availability(&workshop_scope(), future_monday, future_monday, 30, Utc::now())
        .await
        .expect("availability");
    let starts: Vec<_> = days[0]
        .slots
        .iter()
        .map(|slot| slot.start.with_timezone(&TZ).format("%H:%M").to_string())
        .collect();
    assert!(!starts.contains(&"08:00".to_string()));

    // A query after the hold has elapsed sweeps the stale reservation
    let after_hold = Utc::now() + chrono::Duration::minutes(31);
    let days = engine
        .availability(&workshop_scope(), future_monday, future_monday, 30, after_hold)
        .await
        .expect("availability");
    let starts: Vec<_> = days[0]
        .slots
        .iter()
        .map(|slot| slot.start.with_timezone(&TZ).format("%H:%M").to_string())
        .collect();
    assert!(starts.contains(&"08:00".to_string()));
}

#[tokio::test]
async fn connection_state_passes_through_or_defaults_to_not_connected() {
    let calendar = Arc::new(ScriptedCalendar::new(ExternalBusy::Busy(Vec::new())));
    let (engine, _, _) = engine_with(Some(calendar)).await;
    let state = engine
        .connection_state(&workshop_scope())
        .await
        .expect("state");
    assert_eq!(state, ConnectionState::Connected);

    let (engine, _, _) = engine_with(None).await;
    let state = engine
        .connection_state(&workshop_scope())
        .await
        .expect("state");
    assert_eq!(state, ConnectionState::NotConnected);
}
