//! PostgreSQL-backed user store.
//!
//! Password hashes live on the user row but only leave this adapter through
//! [`UserRepository::password_hash`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::UserRepository;
use crewdeck_core::{AppError, AppResult, CompanyId, OfficeId, UserId};
use crewdeck_domain::{EmailAddress, User};

const USER_SELECT: &str = "SELECT id, email, display_name, current_office_id, created_at FROM users";

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    display_name: String,
    current_office_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        let email = EmailAddress::new(row.email)
            .map_err(|error| AppError::Internal(format!("invalid stored email: {error}")))?;

        User::new(
            UserId::from_uuid(row.id),
            email,
            row.display_name,
            row.current_office_id.map(OfficeId::from_uuid),
            row.created_at,
        )
        .map_err(|error| AppError::Internal(format!("invalid stored user: {error}")))
    }
}

/// PostgreSQL adapter for [`UserRepository`].
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, display_name, password_hash, current_office_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.display_name().as_str())
        .bind(password_hash)
        .bind(user.current_office_id().map(|id| id.as_uuid()))
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(map_email_conflict)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE users
            SET display_name = $2, current_office_id = $3
            WHERE id = $1
            ",
        )
        .bind(user.id().as_uuid())
        .bind(user.display_name().as_str())
        .bind(user.current_office_id().map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update user: {error}")))?;

        Ok(())
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(User::try_from).transpose()
    }

    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load credentials: {error}")))
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT DISTINCT users.id, users.email, users.display_name,
                            users.current_office_id, users.created_at
            FROM users
            JOIN role_assignments
                ON role_assignments.user_id = users.id
            WHERE role_assignments.company_id = $1
            ORDER BY users.display_name
            ",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        rows.into_iter().map(User::try_from).collect()
    }
}

fn map_email_conflict(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict("a user with this email address already exists".to_owned());
    }

    AppError::Internal(format!("failed to create user: {error}"))
}
