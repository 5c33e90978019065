//! PostgreSQL-backed invite store.
//!
//! The one-live-pending-invite rule is enforced twice: by row locks inside
//! [`InviteRepository::insert_pending`], and by a partial unique index on
//! `(company_id, email) WHERE status = 'pending'` as a backstop against
//! concurrent inserts.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::{InviteAcceptance, InviteRepository};
use crewdeck_core::{AppError, AppResult, CompanyId, InviteId, OfficeId, RoleId, UserId};
use crewdeck_domain::{EmailAddress, Invite, InviteStatus};

use crate::postgres_role_repository::{begin, commit};

const INVITE_SELECT: &str = r"
    SELECT id, company_id, email, role_ids, current_office_id, allowed_office_ids,
           status, token_hash, expires_at, invited_by, is_existing_user_invite, created_at
    FROM invites
";

#[derive(Debug, FromRow)]
struct InviteRow {
    id: uuid::Uuid,
    company_id: uuid::Uuid,
    email: String,
    role_ids: Vec<uuid::Uuid>,
    current_office_id: uuid::Uuid,
    allowed_office_ids: Vec<uuid::Uuid>,
    status: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    invited_by: Option<uuid::Uuid>,
    is_existing_user_invite: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<InviteRow> for Invite {
    type Error = AppError;

    fn try_from(row: InviteRow) -> AppResult<Self> {
        let email = EmailAddress::new(row.email)
            .map_err(|error| AppError::Internal(format!("invalid stored email: {error}")))?;
        let status = InviteStatus::from_str(&row.status)
            .map_err(|error| AppError::Internal(format!("invalid stored invite: {error}")))?;

        Ok(Invite::from_storage(
            InviteId::from_uuid(row.id),
            CompanyId::from_uuid(row.company_id),
            email,
            row.role_ids.into_iter().map(RoleId::from_uuid).collect(),
            OfficeId::from_uuid(row.current_office_id),
            row.allowed_office_ids
                .into_iter()
                .map(OfficeId::from_uuid)
                .collect(),
            status,
            row.token_hash,
            row.expires_at,
            row.invited_by.map(UserId::from_uuid),
            row.is_existing_user_invite,
            row.created_at,
        ))
    }
}

/// PostgreSQL adapter for [`InviteRepository`].
#[derive(Clone)]
pub struct PostgresInviteRepository {
    pool: PgPool,
}

impl PostgresInviteRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn pending_invite_id(
        &self,
        company_id: CompanyId,
        email: &EmailAddress,
    ) -> AppResult<Option<InviteId>> {
        let id = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM invites WHERE company_id = $1 AND email = $2 AND status = 'pending'",
        )
        .bind(company_id.as_uuid())
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up invite: {error}")))?;

        Ok(id.map(InviteId::from_uuid))
    }
}

#[async_trait]
impl InviteRepository for PostgresInviteRepository {
    async fn insert_pending(&self, invite: &Invite, now: DateTime<Utc>) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let existing = sqlx::query_as::<_, (uuid::Uuid, DateTime<Utc>)>(
            r"
            SELECT id, expires_at FROM invites
            WHERE company_id = $1 AND email = $2 AND status = 'pending'
            FOR UPDATE
            ",
        )
        .bind(invite.company_id().as_uuid())
        .bind(invite.email().as_str())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up invite: {error}")))?;

        if let Some((existing_id, expires_at)) = existing {
            if now <= expires_at {
                return Err(AppError::DuplicateInvite {
                    existing_invite_id: InviteId::from_uuid(existing_id),
                });
            }

            sqlx::query("UPDATE invites SET status = 'superseded' WHERE id = $1")
                .bind(existing_id)
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to supersede invite: {error}"))
                })?;
        }

        let inserted = sqlx::query(
            r"
            INSERT INTO invites
                (id, company_id, email, role_ids, current_office_id, allowed_office_ids,
                 status, token_hash, expires_at, invited_by, is_existing_user_invite, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(invite.id().as_uuid())
        .bind(invite.company_id().as_uuid())
        .bind(invite.email().as_str())
        .bind(invite.role_ids().iter().map(|id| id.as_uuid()).collect::<Vec<_>>())
        .bind(invite.current_office_id().as_uuid())
        .bind(
            invite
                .allowed_office_ids()
                .iter()
                .map(|id| id.as_uuid())
                .collect::<Vec<_>>(),
        )
        .bind(invite.status().as_str())
        .bind(invite.token_hash())
        .bind(invite.expires_at())
        .bind(invite.invited_by().map(|id| id.as_uuid()))
        .bind(invite.is_existing_user_invite())
        .bind(invite.created_at())
        .execute(&mut *transaction)
        .await;

        if let Err(error) = inserted {
            if is_unique_violation(&error) {
                // Lost a race against a concurrent insert; report the winner.
                drop(transaction);
                if let Some(existing_invite_id) = self
                    .pending_invite_id(invite.company_id(), invite.email())
                    .await?
                {
                    return Err(AppError::DuplicateInvite { existing_invite_id });
                }
                return Err(AppError::Conflict(
                    "a pending invite already exists for this email".to_owned(),
                ));
            }
            return Err(AppError::Internal(format!(
                "failed to create invite: {error}"
            )));
        }

        commit(transaction).await
    }

    async fn update(&self, invite: &Invite) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE invites
            SET role_ids = $2, current_office_id = $3, allowed_office_ids = $4,
                status = $5, token_hash = $6, expires_at = $7
            WHERE id = $1
            ",
        )
        .bind(invite.id().as_uuid())
        .bind(invite.role_ids().iter().map(|id| id.as_uuid()).collect::<Vec<_>>())
        .bind(invite.current_office_id().as_uuid())
        .bind(
            invite
                .allowed_office_ids()
                .iter()
                .map(|id| id.as_uuid())
                .collect::<Vec<_>>(),
        )
        .bind(invite.status().as_str())
        .bind(invite.token_hash())
        .bind(invite.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update invite: {error}")))?;

        Ok(())
    }

    async fn find(&self, invite_id: InviteId) -> AppResult<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!("{INVITE_SELECT} WHERE id = $1"))
            .bind(invite_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load invite: {error}")))?;

        row.map(Invite::try_from).transpose()
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!("{INVITE_SELECT} WHERE token_hash = $1"))
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load invite: {error}")))?;

        row.map(Invite::try_from).transpose()
    }

    async fn list_pending_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "{INVITE_SELECT} WHERE company_id = $1 AND status = 'pending' ORDER BY created_at DESC"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list invites: {error}")))?;

        rows.into_iter().map(Invite::try_from).collect()
    }

    async fn accept(&self, acceptance: &InviteAcceptance) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        if let Some(new_user) = &acceptance.new_user {
            let user = &new_user.user;
            sqlx::query(
                r"
                INSERT INTO users (id, email, display_name, password_hash, current_office_id, created_at)
                VALUES ($1, $2, $3, $4, NULL, $5)
                ",
            )
            .bind(user.id().as_uuid())
            .bind(user.email().as_str())
            .bind(user.display_name().as_str())
            .bind(new_user.password_hash.as_str())
            .bind(user.created_at())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    AppError::Conflict("a user with this email address already exists".to_owned())
                } else {
                    AppError::Internal(format!("failed to create user: {error}"))
                }
            })?;
        }

        for grant in &acceptance.office_grants {
            sqlx::query(
                r"
                INSERT INTO office_access (user_id, office_id, granted_by, granted_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, office_id) DO NOTHING
                ",
            )
            .bind(grant.user_id.as_uuid())
            .bind(grant.office_id.as_uuid())
            .bind(grant.granted_by.map(|id| id.as_uuid()))
            .bind(grant.granted_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to grant office access: {error}"))
            })?;
        }

        for assignment in &acceptance.role_assignments {
            sqlx::query(
                r"
                INSERT INTO role_assignments (user_id, role_id, company_id, assigned_by, assigned_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(assignment.user_id.as_uuid())
            .bind(assignment.role_id.as_uuid())
            .bind(assignment.company_id.map(|id| id.as_uuid()))
            .bind(assignment.assigned_by.map(|id| id.as_uuid()))
            .bind(assignment.assigned_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to record assignment: {error}")))?;
        }

        sqlx::query("UPDATE users SET current_office_id = $2 WHERE id = $1")
            .bind(acceptance.user_id.as_uuid())
            .bind(acceptance.current_office_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to set current office: {error}"))
            })?;

        let flipped = sqlx::query(
            "UPDATE invites SET status = 'accepted' WHERE id = $1 AND status = 'pending'",
        )
        .bind(acceptance.invite.id().as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to accept invite: {error}")))?;

        // Another acceptance got there first.
        if flipped.rows_affected() == 0 {
            return Err(AppError::InviteConsumed);
        }

        commit(transaction).await
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error)
            if database_error.code().as_deref() == Some("23505")
    )
}
