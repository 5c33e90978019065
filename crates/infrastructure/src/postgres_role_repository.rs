//! PostgreSQL-backed role definition store.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crewdeck_application::RoleRepository;
use crewdeck_core::{AppError, AppResult, CompanyId, RoleId};
use crewdeck_domain::Role;

use crate::role_rows::{RoleRow, fold_roles};

const ROLE_SELECT: &str = r"
    SELECT
        roles.id,
        roles.name,
        roles.display_name,
        roles.description,
        roles.scope_kind,
        roles.company_id,
        roles.is_default,
        role_permissions.permission
    FROM roles
    LEFT JOIN role_permissions
        ON role_permissions.role_id = roles.id
";

/// PostgreSQL adapter for [`RoleRepository`].
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r"
            INSERT INTO roles (id, name, display_name, description, scope_kind, company_id, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.display_name().as_str())
        .bind(role.description())
        .bind(role.scope().kind_str())
        .bind(role.scope().company_id().map(|id| id.as_uuid()))
        .bind(role.is_default())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_slug_conflict(error, role.name()))?;

        insert_permissions(&mut transaction, role).await?;
        commit(transaction).await
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r"
            UPDATE roles
            SET display_name = $2, description = $3, is_default = $4
            WHERE id = $1
            ",
        )
        .bind(role.id().as_uuid())
        .bind(role.display_name().as_str())
        .bind(role.description())
        .bind(role.is_default())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear role permissions: {error}"))
            })?;

        insert_permissions(&mut transaction, role).await?;
        commit(transaction).await
    }

    async fn delete(&self, role: &Role, force: bool) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        // Lock the role row so the count stays valid for this transaction.
        sqlx::query("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to lock role: {error}")))?;

        let assignment_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM role_assignments WHERE role_id = $1",
        )
        .bind(role.id().as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))?;

        if assignment_count > 0 && !force {
            return Err(AppError::RoleInUse {
                role: role.name().to_owned(),
                assignment_count,
            });
        }

        sqlx::query("DELETE FROM role_assignments WHERE role_id = $1")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete role assignments: {error}"))
            })?;

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        commit(transaction).await
    }

    async fn find(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT} WHERE roles.id = $1 ORDER BY role_permissions.position"
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        Ok(fold_roles(rows)?.pop())
    }

    async fn find_by_name(
        &self,
        name: &str,
        company_id: Option<CompanyId>,
    ) -> AppResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT}
             WHERE roles.name = $1 AND roles.company_id IS NOT DISTINCT FROM $2
             ORDER BY role_permissions.position"
        ))
        .bind(name)
        .bind(company_id.map(|id| id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        Ok(fold_roles(rows)?.pop())
    }

    async fn assignment_count(&self, role_id: RoleId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM role_assignments WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))
    }

    async fn list_for_company_scope(&self, company_id: CompanyId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT}
             WHERE roles.scope_kind = 'system' OR roles.company_id = $1
             ORDER BY roles.name, role_permissions.position"
        ))
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        fold_roles(rows)
    }

    async fn list_for_platform_scope(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "{ROLE_SELECT}
             WHERE roles.company_id IS NULL
             ORDER BY roles.name, role_permissions.position"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        fold_roles(rows)
    }

    async fn taken_slugs(&self, company_id: Option<CompanyId>) -> AppResult<HashSet<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM roles WHERE company_id IS NOT DISTINCT FROM $1",
        )
        .bind(company_id.map(|id| id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role names: {error}")))?;

        Ok(names.into_iter().collect())
    }
}

async fn insert_permissions(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
) -> AppResult<()> {
    for (position, permission) in role.permissions().iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO role_permissions (role_id, permission, position)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, permission) DO NOTHING
            ",
        )
        .bind(role.id().as_uuid())
        .bind(permission.as_str())
        .bind(position as i32)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist role permissions: {error}"))
        })?;
    }
    Ok(())
}

pub(crate) async fn begin(pool: &PgPool) -> AppResult<Transaction<'_, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

pub(crate) async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

fn map_slug_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "a role named '{role_name}' already exists in this scope"
        ));
    }

    AppError::Internal(format!("failed to create role: {error}"))
}
