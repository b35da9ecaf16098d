//! Integration tests for the booking repository against a throwaway SQLite
//! database. The conditional insert is the storage-level guarantee behind the
//! engine's no-overlap invariant, so it is exercised here directly, including
//! under concurrency.

use bookwerk_common::models::ScopeId;
use bookwerk_db::{
    BookingRepository, BookingStatus, DbClient, InsertOutcome, NewBooking, SqlBookingRepository,
};
use chrono::{Duration, NaiveDate, Utc};

async fn test_repository() -> SqlBookingRepository {
    let db_path = std::env::temp_dir().join(format!("bookwerk-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", db_path.display());
    let client = DbClient::from_url(&url).await.expect("create db client");
    let repository = SqlBookingRepository::new(client);
    repository.init_schema().await.expect("init schema");
    repository
}

fn new_booking(scope: &str, start_minute: i64, duration_minutes: i64) -> NewBooking {
    NewBooking {
        scope_id: ScopeId::from(scope),
        date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        start_minute,
        duration_minutes,
        status: BookingStatus::Confirmed,
        customer_name: "Test Customer".to_string(),
        service_name: "Wheel change".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn insert_if_free_accepts_disjoint_and_touching_bookings() {
    let repository = test_repository().await;

    // 09:00-09:30
    let first = repository
        .insert_if_free(new_booking("workshop:w1", 540, 30))
        .await
        .expect("insert");
    assert!(matches!(first, InsertOutcome::Inserted(_)));

    // Touching boundary 09:30-10:00 is allowed
    let touching = repository
        .insert_if_free(new_booking("workshop:w1", 570, 30))
        .await
        .expect("insert");
    assert!(matches!(touching, InsertOutcome::Inserted(_)));

    // 08:30-09:00 touching from below is allowed too
    let before = repository
        .insert_if_free(new_booking("workshop:w1", 510, 30))
        .await
        .expect("insert");
    assert!(matches!(before, InsertOutcome::Inserted(_)));
}

#[tokio::test]
async fn insert_if_free_rejects_overlaps() {
    let repository = test_repository().await;

    let first = repository
        .insert_if_free(new_booking("workshop:w1", 540, 60))
        .await
        .expect("insert");
    assert!(matches!(first, InsertOutcome::Inserted(_)));

    // Identical interval
    assert!(matches!(
        repository
            .insert_if_free(new_booking("workshop:w1", 540, 60))
            .await
            .expect("insert"),
        InsertOutcome::Conflict
    ));
    // Straddling the start
    assert!(matches!(
        repository
            .insert_if_free(new_booking("workshop:w1", 510, 60))
            .await
            .expect("insert"),
        InsertOutcome::Conflict
    ));
    // Fully contained
    assert!(matches!(
        repository
            .insert_if_free(new_booking("workshop:w1", 555, 15))
            .await
            .expect("insert"),
        InsertOutcome::Conflict
    ));
    // Containing
    assert!(matches!(
        repository
            .insert_if_free(new_booking("workshop:w1", 480, 240))
            .await
            .expect("insert"),
        InsertOutcome::Conflict
    ));

    // A different scope is unaffected
    assert!(matches!(
        repository
            .insert_if_free(new_booking("employee:e1", 540, 60))
            .await
            .expect("insert"),
        InsertOutcome::Inserted(_)
    ));
}

#[tokio::test]
async fn cancelled_bookings_release_their_slot() {
    let repository = test_repository().await;

    let inserted = match repository
        .insert_if_free(new_booking("workshop:w1", 600, 30))
        .await
        .expect("insert")
    {
        InsertOutcome::Inserted(booking) => booking,
        InsertOutcome::Conflict => panic!("first insert must succeed"),
    };

    assert!(repository.cancel(&inserted.id).await.expect("cancel"));
    // Second cancel is a no-op
    assert!(!repository.cancel(&inserted.id).await.expect("cancel"));

    // The slot is free again
    assert!(matches!(
        repository
            .insert_if_free(new_booking("workshop:w1", 600, 30))
            .await
            .expect("insert"),
        InsertOutcome::Inserted(_)
    ));
}

#[tokio::test]
async fn concurrent_commits_for_one_slot_admit_exactly_one() {
    let repository = test_repository().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            let mut booking = new_booking("workshop:w1", 720, 45);
            booking.customer_name = format!("Customer {}", i);
            repository.insert_if_free(booking).await
        }));
    }

    let mut inserted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("join").expect("insert") {
            InsertOutcome::Inserted(_) => inserted += 1,
            InsertOutcome::Conflict => conflicts += 1,
        }
    }

    assert_eq!(inserted, 1, "exactly one concurrent commit may win");
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn expire_pending_sweeps_only_stale_pending_rows() {
    let repository = test_repository().await;

    let mut as_pending = new_booking("workshop:w1", 480, 30);
    as_pending.status = BookingStatus::Pending;
    let pending = match repository.insert_if_free(as_pending).await.expect("insert") {
        InsertOutcome::Inserted(booking) => booking,
        InsertOutcome::Conflict => panic!("insert must succeed"),
    };

    let mut confirmed = new_booking("workshop:w1", 520, 30);
    confirmed.status = BookingStatus::Confirmed;
    assert!(matches!(
        repository.insert_if_free(confirmed).await.expect("insert"),
        InsertOutcome::Inserted(_)
    ));

    // Nothing is older than an hour ago
    let swept = repository
        .expire_pending(Utc::now() - Duration::hours(1))
        .await
        .expect("expire");
    assert_eq!(swept, 0);

    // A cutoff in the future catches the pending row but not the confirmed one
    let swept = repository
        .expire_pending(Utc::now() + Duration::minutes(1))
        .await
        .expect("expire");
    assert_eq!(swept, 1);

    let reloaded = repository
        .find_by_id(&pending.id)
        .await
        .expect("find")
        .expect("booking exists");
    assert_eq!(reloaded.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn window_queries_filter_by_scope_status_and_date() {
    let repository = test_repository().await;
    let scope = ScopeId::from("workshop:w1");

    let kept = repository
        .insert_if_free(new_booking("workshop:w1", 540, 30))
        .await
        .expect("insert");
    assert!(matches!(kept, InsertOutcome::Inserted(_)));

    let cancelled = match repository
        .insert_if_free(new_booking("workshop:w1", 600, 30))
        .await
        .expect("insert")
    {
        InsertOutcome::Inserted(booking) => booking,
        InsertOutcome::Conflict => panic!("insert must succeed"),
    };
    repository.cancel(&cancelled.id).await.expect("cancel");

    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let active = repository
        .active_in_window(&scope, date, date)
        .await
        .expect("query");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].start_minute, 540);

    let listed = repository
        .list_in_window(&scope, date, date, true)
        .await
        .expect("query");
    assert_eq!(listed.len(), 2);

    let listed = repository
        .list_in_window(&scope, date, date, false)
        .await
        .expect("query");
    assert_eq!(listed.len(), 1);

    // Outside the window
    let other_day = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
    let active = repository
        .active_in_window(&scope, other_day, other_day)
        .await
        .expect("query");
    assert!(active.is_empty());
}
