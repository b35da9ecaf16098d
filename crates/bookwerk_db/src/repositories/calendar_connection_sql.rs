//! SQL implementation of the calendar connection repository

use crate::error::DbError;
use crate::repositories::calendar_connection::{CalendarConnection, CalendarConnectionRepository};
use crate::DbClient;
use bookwerk_common::models::ScopeId;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error};

/// SQL implementation of the calendar connection repository
#[derive(Debug, Clone)]
pub struct SqlCalendarConnectionRepository {
    db_client: DbClient,
}

impl SqlCalendarConnectionRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_connection(row: &AnyRow) -> Result<CalendarConnection, DbError> {
    let needs_reauth: i64 = row
        .try_get("needs_reauth")
        .map_err(|e| DbError::DecodeError(e.to_string()))?;
    Ok(CalendarConnection {
        scope_id: ScopeId(
            row.try_get("scope_id")
                .map_err(|e| DbError::DecodeError(e.to_string()))?,
        ),
        calendar_id: row
            .try_get("calendar_id")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        access_token: row
            .try_get("access_token")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        refresh_token: row
            .try_get("refresh_token")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        expires_at: row
            .try_get("expires_at")
            .map_err(|e| DbError::DecodeError(e.to_string()))?,
        needs_reauth: needs_reauth != 0,
    })
}

impl CalendarConnectionRepository for SqlCalendarConnectionRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing calendar connection schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS calendar_connections (
                scope_id TEXT PRIMARY KEY,
                calendar_id TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                needs_reauth INTEGER NOT NULL DEFAULT 0
            )
        "#;
        self.db_client.execute(query).await?;
        Ok(())
    }

    async fn find_by_scope(
        &self,
        scope_id: &ScopeId,
    ) -> Result<Option<CalendarConnection>, DbError> {
        let row = sqlx::query(
            "SELECT scope_id, calendar_id, access_token, refresh_token, expires_at, needs_reauth \
             FROM calendar_connections WHERE scope_id = $1",
        )
        .bind(scope_id.as_str())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to load calendar connection: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        row.as_ref().map(row_to_connection).transpose()
    }

    async fn upsert(&self, connection: CalendarConnection) -> Result<(), DbError> {
        debug!("Upserting calendar connection for {}", connection.scope_id);

        // Delete-then-insert keeps the statement portable across the Any
        // driver's backends.
        sqlx::query("DELETE FROM calendar_connections WHERE scope_id = $1")
            .bind(connection.scope_id.as_str())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO calendar_connections \
             (scope_id, calendar_id, access_token, refresh_token, expires_at, needs_reauth) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(connection.scope_id.as_str())
        .bind(&connection.calendar_id)
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.expires_at)
        .bind(i64::from(connection.needs_reauth))
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to upsert calendar connection: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        Ok(())
    }

    async fn save_rotated_tokens(
        &self,
        scope_id: &ScopeId,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: i64,
    ) -> Result<(), DbError> {
        debug!("Persisting rotated tokens for {}", scope_id);

        let result = match refresh_token {
            Some(refresh_token) => {
                sqlx::query(
                    "UPDATE calendar_connections \
                     SET access_token = $1, refresh_token = $2, expires_at = $3, needs_reauth = 0 \
                     WHERE scope_id = $4",
                )
                .bind(access_token)
                .bind(refresh_token)
                .bind(expires_at)
                .bind(scope_id.as_str())
                .execute(self.db_client.pool())
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE calendar_connections \
                     SET access_token = $1, expires_at = $2, needs_reauth = 0 \
                     WHERE scope_id = $3",
                )
                .bind(access_token)
                .bind(expires_at)
                .bind(scope_id.as_str())
                .execute(self.db_client.pool())
                .await
            }
        };

        result.map_err(|e| {
            error!("Failed to persist rotated tokens: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        Ok(())
    }

    async fn mark_needs_reauth(&self, scope_id: &ScopeId) -> Result<(), DbError> {
        sqlx::query("UPDATE calendar_connections SET needs_reauth = 1 WHERE scope_id = $1")
            .bind(scope_id.as_str())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to mark connection for reauth: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, scope_id: &ScopeId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM calendar_connections WHERE scope_id = $1")
            .bind(scope_id.as_str())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
