//! SQL implementation of the scope profile repository

use crate::error::DbError;
use crate::repositories::scope_profile::{ScopeProfile, ScopeProfileRepository, VacationRange};
use crate::DbClient;
use bookwerk_common::models::{ScopeId, WeekSchedule};
use chrono::NaiveDate;
use sqlx::Row;
use tracing::{debug, error};

/// SQL implementation of the scope profile repository
#[derive(Debug, Clone)]
pub struct SqlScopeProfileRepository {
    db_client: DbClient,
}

impl SqlScopeProfileRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DbError::DecodeError(format!("bad date {}: {}", value, e)))
}

impl ScopeProfileRepository for SqlScopeProfileRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing scope profile schema");

        self.db_client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS scope_profiles (
                    scope_id TEXT PRIMARY KEY,
                    week TEXT NOT NULL,
                    granularity_minutes INTEGER NOT NULL
                )
                "#,
            )
            .await?;

        self.db_client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS scope_vacations (
                    id INTEGER PRIMARY KEY,
                    scope_id TEXT NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL
                )
                "#,
            )
            .await?;

        Ok(())
    }

    async fn find_by_scope(&self, scope_id: &ScopeId) -> Result<Option<ScopeProfile>, DbError> {
        let row = sqlx::query(
            "SELECT scope_id, week, granularity_minutes FROM scope_profiles WHERE scope_id = $1",
        )
        .bind(scope_id.as_str())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to load scope profile: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let week_json: String = row
            .try_get("week")
            .map_err(|e| DbError::DecodeError(e.to_string()))?;
        let week: WeekSchedule = serde_json::from_str(&week_json)
            .map_err(|e| DbError::DecodeError(format!("bad working-hours JSON: {}", e)))?;

        Ok(Some(ScopeProfile {
            scope_id: ScopeId(
                row.try_get("scope_id")
                    .map_err(|e| DbError::DecodeError(e.to_string()))?,
            ),
            week,
            granularity_minutes: row
                .try_get("granularity_minutes")
                .map_err(|e| DbError::DecodeError(e.to_string()))?,
        }))
    }

    async fn upsert(&self, profile: ScopeProfile) -> Result<(), DbError> {
        debug!("Upserting scope profile for {}", profile.scope_id);

        let week_json = serde_json::to_string(&profile.week)
            .map_err(|e| DbError::DecodeError(format!("unserializable week: {}", e)))?;

        sqlx::query("DELETE FROM scope_profiles WHERE scope_id = $1")
            .bind(profile.scope_id.as_str())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO scope_profiles (scope_id, week, granularity_minutes) VALUES ($1, $2, $3)",
        )
        .bind(profile.scope_id.as_str())
        .bind(&week_json)
        .bind(profile.granularity_minutes)
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to upsert scope profile: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        Ok(())
    }

    async fn vacations_in_window(
        &self,
        scope_id: &ScopeId,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<VacationRange>, DbError> {
        let rows = sqlx::query(
            "SELECT scope_id, start_date, end_date FROM scope_vacations \
             WHERE scope_id = $1 AND start_date <= $2 AND end_date >= $3",
        )
        .bind(scope_id.as_str())
        .bind(to_date.format("%Y-%m-%d").to_string())
        .bind(from_date.format("%Y-%m-%d").to_string())
        .fetch_all(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to query vacations: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        rows.iter()
            .map(|row| {
                let start: String = row
                    .try_get("start_date")
                    .map_err(|e| DbError::DecodeError(e.to_string()))?;
                let end: String = row
                    .try_get("end_date")
                    .map_err(|e| DbError::DecodeError(e.to_string()))?;
                Ok(VacationRange {
                    scope_id: ScopeId(
                        row.try_get("scope_id")
                            .map_err(|e| DbError::DecodeError(e.to_string()))?,
                    ),
                    start_date: parse_date(&start)?,
                    end_date: parse_date(&end)?,
                })
            })
            .collect()
    }

    async fn add_vacation(&self, vacation: VacationRange) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO scope_vacations (scope_id, start_date, end_date) VALUES ($1, $2, $3)",
        )
        .bind(vacation.scope_id.as_str())
        .bind(vacation.start_date.format("%Y-%m-%d").to_string())
        .bind(vacation.end_date.format("%Y-%m-%d").to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to add vacation: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        Ok(())
    }
}
