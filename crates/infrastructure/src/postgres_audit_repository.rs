//! PostgreSQL-backed audit trail.
//!
//! The `detail` column is JSONB; values cross the wire as text and are cast
//! in SQL so the column stays queryable from psql.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditRepository};
use crewdeck_core::{AppError, AppResult, CompanyId, UserId};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, FromRow)]
struct AuditRow {
    id: uuid::Uuid,
    company_id: Option<uuid::Uuid>,
    actor_user_id: Option<uuid::Uuid>,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    detail: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditRow) -> AppResult<Self> {
        let detail = serde_json::from_str(&row.detail)
            .map_err(|error| AppError::Internal(format!("invalid stored audit detail: {error}")))?;

        Ok(Self {
            id: row.id,
            company_id: row.company_id.map(CompanyId::from_uuid),
            actor_user_id: row.actor_user_id.map(UserId::from_uuid),
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            detail,
            recorded_at: row.recorded_at,
        })
    }
}

/// PostgreSQL adapter for [`AuditRepository`].
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO audit_events
                (id, company_id, actor_user_id, action, resource_type, resource_id, detail, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb, $8)
            ",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(event.company_id.map(|id| id.as_uuid()))
        .bind(event.actor_user_id.map(|id| id.as_uuid()))
        .bind(event.action.as_str())
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record audit event: {error}")))?;

        Ok(())
    }

    async fn list(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        let rows = sqlx::query_as::<_, AuditRow>(
            r"
            SELECT id, company_id, actor_user_id, action, resource_type,
                   resource_id, detail::text AS detail, recorded_at
            FROM audit_events
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::text IS NULL OR action = $2)
            ORDER BY recorded_at DESC
            LIMIT $3
            ",
        )
        .bind(query.company_id.map(|id| id.as_uuid()))
        .bind(query.action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit events: {error}")))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
