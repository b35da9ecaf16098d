//! SQL implementation of the booking repository

use crate::error::DbError;
use crate::repositories::booking::{
    Booking, BookingRepository, BookingStatus, InsertOutcome, NewBooking,
};
use crate::DbClient;
use bookwerk_common::models::ScopeId;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error};

/// SQL implementation of the booking repository
#[derive(Debug, Clone)]
pub struct SqlBookingRepository {
    db_client: DbClient,
}

impl SqlBookingRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_booking(row: &AnyRow) -> Result<Booking, DbError> {
    let date_str: String = row
        .try_get("date")
        .map_err(|e| DbError::DecodeError(e.to_string()))?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| DbError::DecodeError(format!("bad booking date {}: {}", date_str, e)))?;

    let status_str: String = row
        .try_get("status")
        .map_err(|e| DbError::DecodeError(e.to_string()))?;

    let created_str: String = row
        .try_get("created_at")
        .map_err(|e| DbError::DecodeError(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map_err(|e| DbError::DecodeError(format!("bad created_at {}: {}", created_str, e)))?
        .with_timezone(&Utc);

    Ok(Booking {
        id: row
            .try_get("id")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        scope_id: ScopeId(
            row.try_get("scope_id")
                .map_err(|e| DbError::DecodeError(e.to_string()))?,
        ),
        date,
        start_minute: row
            .try_get("start_minute")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        duration_minutes: row
            .try_get("duration_minutes")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        status: BookingStatus::parse(&status_str)?,
        customer_name: row
            .try_get("customer_name")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        service_name: row
            .try_get("service_name")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        notes: row.try_get("notes").ok(),
        external_event_id: row.try_get("external_event_id").ok(),
        created_at,
    })
}

const BOOKING_COLUMNS: &str = "id, scope_id, date, start_minute, duration_minutes, status, \
     customer_name, service_name, notes, external_event_id, created_at";

impl BookingRepository for SqlBookingRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing booking schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                scope_id TEXT NOT NULL,
                date TEXT NOT NULL,
                start_minute INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL,
                status TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                service_name TEXT NOT NULL,
                notes TEXT,
                external_event_id TEXT,
                created_at TEXT NOT NULL
            )
        "#;
        self.db_client.execute(query).await?;

        self.db_client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_bookings_scope_date ON bookings(scope_id, date)",
            )
            .await?;

        Ok(())
    }

    async fn insert_if_free(&self, booking: NewBooking) -> Result<InsertOutcome, DbError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let created_str = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let date_str = booking.date.format("%Y-%m-%d").to_string();

        debug!(
            "Attempting conditional insert for scope {} on {} at minute {}",
            booking.scope_id, date_str, booking.start_minute
        );

        // The NOT EXISTS guard and the insert run as one statement; this is
        // what closes the race between two committers for the same interval.
        let query = r#"
            INSERT INTO bookings (id, scope_id, date, start_minute, duration_minutes, status,
                                  customer_name, service_name, notes, external_event_id, created_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10
            WHERE NOT EXISTS (
                SELECT 1 FROM bookings
                WHERE scope_id = $2
                  AND date = $3
                  AND status IN ('PENDING', 'CONFIRMED', 'COMPLETED')
                  AND start_minute < $4 + $5
                  AND start_minute + duration_minutes > $4
            )
        "#;

        let result = sqlx::query(query)
            .bind(&id)
            .bind(booking.scope_id.as_str())
            .bind(&date_str)
            .bind(booking.start_minute)
            .bind(booking.duration_minutes)
            .bind(booking.status.as_str())
            .bind(&booking.customer_name)
            .bind(&booking.service_name)
            .bind(&booking.notes)
            .bind(&created_str)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed conditional booking insert: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Conflict);
        }

        Ok(InsertOutcome::Inserted(Booking {
            id,
            scope_id: booking.scope_id,
            date: booking.date,
            start_minute: booking.start_minute,
            duration_minutes: booking.duration_minutes,
            status: booking.status,
            customer_name: booking.customer_name,
            service_name: booking.service_name,
            notes: booking.notes,
            external_event_id: None,
            created_at,
        }))
    }

    async fn active_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<Booking>, DbError> {
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE scope_id = $1
              AND date >= $2 AND date <= $3
              AND status IN ('PENDING', 'CONFIRMED', 'COMPLETED')
            ORDER BY date, start_minute
            "#
        );

        let rows = sqlx::query(&query)
            .bind(scope_id.as_str())
            .bind(from_date.format("%Y-%m-%d").to_string())
            .bind(to_date.format("%Y-%m-%d").to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to query active bookings: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn list_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, DbError> {
        let status_filter = if include_cancelled {
            ""
        } else {
            "AND status != 'CANCELLED'"
        };
        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE scope_id = $1
              AND date >= $2 AND date <= $3
              {status_filter}
            ORDER BY date, start_minute
            "#
        );

        let rows = sqlx::query(&query)
            .bind(scope_id.as_str())
            .bind(from_date.format("%Y-%m-%d").to_string())
            .bind(to_date.format("%Y-%m-%d").to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list bookings: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(row_to_booking).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, DbError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn cancel(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED' \
             WHERE id = $1 AND status IN ('PENDING', 'CONFIRMED')",
        )
        .bind(id)
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to cancel booking {}: {}", id, e);
            DbError::QueryError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_external_event_id(&self, id: &str, event_id: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE bookings SET external_event_id = $1 WHERE id = $2")
            .bind(event_id)
            .bind(id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn expire_pending(&self, older_than: DateTime<Utc>) -> Result<u64, DbError> {
        // created_at is stored as RFC3339 UTC with a fixed format, so string
        // comparison orders chronologically.
        let cutoff = older_than.to_rfc3339_opts(SecondsFormat::Secs, true);
        let result = sqlx::query(
            "UPDATE bookings SET status = 'CANCELLED' \
             WHERE status = 'PENDING' AND created_at < $1",
        )
        .bind(&cutoff)
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to expire pending bookings: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        if result.rows_affected() > 0 {
            debug!("Expired {} pending bookings", result.rows_affected());
        }
        Ok(result.rows_affected())
    }
}
