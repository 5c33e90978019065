//! PostgreSQL-backed office store and office access graph.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::{OfficeAccess, OfficeAccessRepository, OfficeRepository};
use crewdeck_core::{AppError, AppResult, CompanyId, OfficeId, UserId};
use crewdeck_domain::Office;

use crate::postgres_role_repository::{begin, commit};

#[derive(Debug, FromRow)]
struct OfficeRow {
    id: uuid::Uuid,
    company_id: uuid::Uuid,
    name: String,
}

impl TryFrom<OfficeRow> for Office {
    type Error = AppError;

    fn try_from(row: OfficeRow) -> AppResult<Self> {
        Office::new(
            OfficeId::from_uuid(row.id),
            CompanyId::from_uuid(row.company_id),
            row.name,
        )
        .map_err(|error| AppError::Internal(format!("invalid stored office: {error}")))
    }
}

/// PostgreSQL adapter for [`OfficeRepository`].
#[derive(Clone)]
pub struct PostgresOfficeRepository {
    pool: PgPool,
}

impl PostgresOfficeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfficeRepository for PostgresOfficeRepository {
    async fn insert(&self, office: &Office) -> AppResult<()> {
        sqlx::query("INSERT INTO offices (id, company_id, name) VALUES ($1, $2, $3)")
            .bind(office.id().as_uuid())
            .bind(office.company_id().as_uuid())
            .bind(office.name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to create office: {error}")))?;

        Ok(())
    }

    async fn update(&self, office: &Office) -> AppResult<()> {
        sqlx::query("UPDATE offices SET name = $2 WHERE id = $1")
            .bind(office.id().as_uuid())
            .bind(office.name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to update office: {error}")))?;

        Ok(())
    }

    async fn delete_with_access(&self, office_id: OfficeId) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query("UPDATE users SET current_office_id = NULL WHERE current_office_id = $1")
            .bind(office_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear current office: {error}"))
            })?;

        sqlx::query("DELETE FROM office_access WHERE office_id = $1")
            .bind(office_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete office access: {error}"))
            })?;

        sqlx::query("DELETE FROM offices WHERE id = $1")
            .bind(office_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete office: {error}")))?;

        commit(transaction).await
    }

    async fn find(&self, office_id: OfficeId) -> AppResult<Option<Office>> {
        let row = sqlx::query_as::<_, OfficeRow>(
            "SELECT id, company_id, name FROM offices WHERE id = $1",
        )
        .bind(office_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load office: {error}")))?;

        row.map(Office::try_from).transpose()
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Office>> {
        let rows = sqlx::query_as::<_, OfficeRow>(
            "SELECT id, company_id, name FROM offices WHERE company_id = $1 ORDER BY name",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list offices: {error}")))?;

        rows.into_iter().map(Office::try_from).collect()
    }
}

/// PostgreSQL adapter for [`OfficeAccessRepository`].
#[derive(Clone)]
pub struct PostgresOfficeAccessRepository {
    pool: PgPool,
}

impl PostgresOfficeAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfficeAccessRepository for PostgresOfficeAccessRepository {
    async fn grant(&self, access: &OfficeAccess) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO office_access (user_id, office_id, granted_by, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, office_id) DO NOTHING
            ",
        )
        .bind(access.user_id.as_uuid())
        .bind(access.office_id.as_uuid())
        .bind(access.granted_by.map(|id| id.as_uuid()))
        .bind(access.granted_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to grant office access: {error}")))?;

        Ok(())
    }

    async fn revoke_and_clear_current(
        &self,
        user_id: UserId,
        office_id: OfficeId,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query("DELETE FROM office_access WHERE user_id = $1 AND office_id = $2")
            .bind(user_id.as_uuid())
            .bind(office_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to revoke office access: {error}"))
            })?;

        sqlx::query(
            "UPDATE users SET current_office_id = NULL WHERE id = $1 AND current_office_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(office_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear current office: {error}")))?;

        commit(transaction).await
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Office>> {
        let rows = sqlx::query_as::<_, OfficeRow>(
            r"
            SELECT offices.id, offices.company_id, offices.name
            FROM offices
            JOIN office_access
                ON office_access.office_id = offices.id
            WHERE office_access.user_id = $1
            ORDER BY offices.name
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list office access: {error}")))?;

        rows.into_iter().map(Office::try_from).collect()
    }

    async fn has_access(&self, user_id: UserId, office_id: OfficeId) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM office_access WHERE user_id = $1 AND office_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(office_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check office access: {error}")))?;

        Ok(count > 0)
    }

    async fn set_current_office(
        &self,
        user_id: UserId,
        office_id: Option<OfficeId>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET current_office_id = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(office_id.map(|id| id.as_uuid()))
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to set current office: {error}")))?;

        Ok(())
    }
}
