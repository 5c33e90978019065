//! PostgreSQL-backed role assignment graph.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crewdeck_application::{RoleAssignment, RoleAssignmentRepository};
use crewdeck_core::{AccessScope, AppError, AppResult, CompanyId, RoleId, UserId};
use crewdeck_domain::{Company, Role};

use crate::role_rows::{RoleRow, fold_roles};

#[derive(Debug, FromRow)]
struct AssignmentRow {
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    company_id: Option<uuid::Uuid>,
    assigned_by: Option<uuid::Uuid>,
    assigned_at: DateTime<Utc>,
}

impl From<AssignmentRow> for RoleAssignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            role_id: RoleId::from_uuid(row.role_id),
            company_id: row.company_id.map(CompanyId::from_uuid),
            assigned_by: row.assigned_by.map(UserId::from_uuid),
            assigned_at: row.assigned_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: uuid::Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

/// PostgreSQL adapter for [`RoleAssignmentRepository`].
#[derive(Clone)]
pub struct PostgresRoleAssignmentRepository {
    pool: PgPool,
}

impl PostgresRoleAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleAssignmentRepository {
    async fn insert(&self, assignment: &RoleAssignment) -> AppResult<()> {
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
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record assignment: {error}")))?;

        Ok(())
    }

    async fn remove(&self, user_id: UserId, role_id: RoleId, scope: AccessScope) -> AppResult<()> {
        sqlx::query(
            r"
            DELETE FROM role_assignments
            WHERE user_id = $1 AND role_id = $2 AND company_id IS NOT DISTINCT FROM $3
            ",
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(scope.company_id().map(|id| id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove assignment: {error}")))?;

        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId, scope: AccessScope) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r"
            SELECT
                roles.id,
                roles.name,
                roles.display_name,
                roles.description,
                roles.scope_kind,
                roles.company_id,
                roles.is_default,
                role_permissions.permission
            FROM role_assignments
            JOIN roles
                ON roles.id = role_assignments.role_id
            LEFT JOIN role_permissions
                ON role_permissions.role_id = roles.id
            WHERE role_assignments.user_id = $1
              AND role_assignments.company_id IS NOT DISTINCT FROM $2
            ORDER BY roles.name, role_permissions.position
            ",
        )
        .bind(user_id.as_uuid())
        .bind(scope.company_id().map(|id| id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user roles: {error}")))?;

        fold_roles(rows)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        scope: AccessScope,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r"
            SELECT user_id, role_id, company_id, assigned_by, assigned_at
            FROM role_assignments
            WHERE user_id = $1 AND company_id IS NOT DISTINCT FROM $2
            ORDER BY assigned_at
            ",
        )
        .bind(user_id.as_uuid())
        .bind(scope.company_id().map(|id| id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r"
            SELECT user_id, role_id, company_id, assigned_by, assigned_at
            FROM role_assignments
            WHERE company_id = $1
            ORDER BY assigned_at
            ",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }

    async fn companies_for_user(&self, user_id: UserId) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r"
            SELECT DISTINCT companies.id, companies.name, companies.created_at
            FROM companies
            JOIN role_assignments
                ON role_assignments.company_id = companies.id
            WHERE role_assignments.user_id = $1
            ORDER BY companies.name
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list companies: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Company::new(CompanyId::from_uuid(row.id), row.name, row.created_at)
                    .map_err(|error| AppError::Internal(format!("invalid stored company: {error}")))
            })
            .collect()
    }
}
