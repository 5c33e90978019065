use crewdeck_application::RoleAssignment;
use crewdeck_domain::{KnownPermission, PermissionSet, Role};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for role creation.
///
/// `scope_kind` defaults to `"company"`; `"system"` and `"platform"` are
/// reserved for platform operators.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
    pub scope_kind: Option<String>,
}

/// Incoming payload for role updates; the slug never changes.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// API representation of a role definition.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub scope_kind: String,
    pub company_id: Option<String>,
    pub permissions: Vec<String>,
    pub is_default: bool,
    pub is_editable: bool,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role_id: String,
}

/// Incoming payload for role unassignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/remove-role-assignment-request.ts"
)]
pub struct RemoveRoleAssignmentRequest {
    pub user_id: String,
    pub role_id: String,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub role_id: String,
    pub company_id: Option<String>,
    pub assigned_by: Option<String>,
    pub assigned_at: String,
}

/// A user's effective permission patterns in the session scope.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub permissions: Vec<String>,
}

/// One entry of the known-permission catalog that drives the role editor.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/permission-catalog-entry-response.ts"
)]
pub struct PermissionCatalogEntryResponse {
    pub key: String,
    pub label: String,
    pub category: String,
    pub category_label: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id().to_string(),
            name: role.name().to_owned(),
            display_name: role.display_name().as_str().to_owned(),
            description: role.description().map(ToOwned::to_owned),
            scope_kind: role.scope().kind_str().to_owned(),
            company_id: role.scope().company_id().map(|id| id.to_string()),
            permissions: permission_strings(role.permissions()),
            is_default: role.is_default(),
            is_editable: role.scope().is_tenant_managed(),
        }
    }
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            user_id: assignment.user_id.to_string(),
            role_id: assignment.role_id.to_string(),
            company_id: assignment.company_id.map(|id| id.to_string()),
            assigned_by: assignment.assigned_by.map(|id| id.to_string()),
            assigned_at: assignment.assigned_at.to_rfc3339(),
        }
    }
}

impl From<PermissionSet> for EffectivePermissionsResponse {
    fn from(set: PermissionSet) -> Self {
        Self {
            permissions: permission_strings(&set),
        }
    }
}

impl From<KnownPermission> for PermissionCatalogEntryResponse {
    fn from(known: KnownPermission) -> Self {
        Self {
            key: known.as_str().to_owned(),
            label: known.label().to_owned(),
            category: known.category().as_str().to_owned(),
            category_label: known.category().label().to_owned(),
        }
    }
}

fn permission_strings(set: &PermissionSet) -> Vec<String> {
    set.iter()
        .map(|permission| permission.as_str().to_owned())
        .collect()
}
