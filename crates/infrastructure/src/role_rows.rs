//! Shared row shape and folding for role queries.
//!
//! Role queries join `roles` against `role_permissions`, producing one row
//! per permission; folding rebuilds [`Role`] values in query order.

use crewdeck_core::{AppError, AppResult, CompanyId, RoleId};
use crewdeck_domain::{PermissionSet, Role, RoleScope};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub(crate) struct RoleRow {
    pub id: uuid::Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub scope_kind: String,
    pub company_id: Option<uuid::Uuid>,
    pub is_default: bool,
    pub permission: Option<String>,
}

/// Folds join rows (ordered by role, then permission position) into roles.
pub(crate) fn fold_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();
    let mut pending: Option<(RoleRow, Vec<String>)> = None;

    for row in rows {
        match &mut pending {
            Some((current, permissions)) if current.id == row.id => {
                if let Some(permission) = row.permission {
                    permissions.push(permission);
                }
            }
            _ => {
                if let Some(parts) = pending.take() {
                    roles.push(build_role(parts)?);
                }
                let mut permissions = Vec::new();
                if let Some(permission) = row.permission.clone() {
                    permissions.push(permission);
                }
                pending = Some((row, permissions));
            }
        }
    }
    if let Some(parts) = pending.take() {
        roles.push(build_role(parts)?);
    }

    Ok(roles)
}

fn build_role((row, permissions): (RoleRow, Vec<String>)) -> AppResult<Role> {
    let scope = RoleScope::from_storage(&row.scope_kind, row.company_id.map(CompanyId::from_uuid))?;
    let permissions = PermissionSet::parse_all(permissions)
        .map_err(|error| AppError::Internal(format!("invalid stored permission: {error}")))?;

    Role::new(
        RoleId::from_uuid(row.id),
        row.name,
        row.display_name,
        row.description,
        scope,
        permissions,
        row.is_default,
    )
    .map_err(|error| AppError::Internal(format!("invalid stored role: {error}")))
}
