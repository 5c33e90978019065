//! PostgreSQL-backed company store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::CompanyRepository;
use crewdeck_core::{AppError, AppResult, CompanyId};
use crewdeck_domain::Company;

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: uuid::Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for Company {
    type Error = AppError;

    fn try_from(row: CompanyRow) -> AppResult<Self> {
        Company::new(CompanyId::from_uuid(row.id), row.name, row.created_at)
            .map_err(|error| AppError::Internal(format!("invalid stored company: {error}")))
    }
}

/// PostgreSQL adapter for [`CompanyRepository`].
#[derive(Clone)]
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn insert(&self, company: &Company) -> AppResult<()> {
        sqlx::query("INSERT INTO companies (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(company.id().as_uuid())
            .bind(company.name().as_str())
            .bind(company.created_at())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to create company: {error}")))?;

        Ok(())
    }

    async fn update(&self, company: &Company) -> AppResult<()> {
        sqlx::query("UPDATE companies SET name = $2 WHERE id = $1")
            .bind(company.id().as_uuid())
            .bind(company.name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to update company: {error}")))?;

        Ok(())
    }

    async fn find(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, created_at FROM companies WHERE id = $1",
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load company: {error}")))?;

        row.map(Company::try_from).transpose()
    }

    async fn list_all(&self) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, created_at FROM companies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list companies: {error}")))?;

        rows.into_iter().map(Company::try_from).collect()
    }
}
