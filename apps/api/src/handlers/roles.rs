use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use crewdeck_application::{CreateRoleInput, UpdateRoleInput};
use crewdeck_core::{ActorContext, AppError, RoleId};
use crewdeck_domain::RoleScope;
use serde::Deserialize;
use uuid::Uuid;

use crate::dto::{CreateRoleRequest, RoleResponse, UpdateRoleRequest};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteRoleQuery {
    #[serde(default)]
    pub force: bool,
}

/// GET /api/roles - List the roles visible in the session scope.
pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state.role_service.list(&actor).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// POST /api/roles - Create a role.
pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let scope = requested_scope(&actor, payload.scope_kind.as_deref())?;

    let role = state
        .role_service
        .create(
            &actor,
            CreateRoleInput {
                name: payload.name,
                display_name: payload.display_name,
                description: payload.description,
                permissions: payload.permissions,
                is_default: payload.is_default,
                scope,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(role.into())))
}

/// GET /api/roles/{role_id} - Fetch one role.
pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_service
        .get(&actor, RoleId::from_uuid(role_id))
        .await?;
    Ok(Json(role.into()))
}

/// PUT /api/roles/{role_id} - Replace the mutable fields of a role.
pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_service
        .update(
            &actor,
            RoleId::from_uuid(role_id),
            UpdateRoleInput {
                display_name: payload.display_name,
                description: payload.description,
                permissions: payload.permissions,
                is_default: payload.is_default,
            },
        )
        .await?;

    Ok(Json(role.into()))
}

/// DELETE /api/roles/{role_id}?force=true - Delete a role.
pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
    Query(query): Query<DeleteRoleQuery>,
) -> ApiResult<StatusCode> {
    state
        .role_service
        .delete(&actor, RoleId::from_uuid(role_id), query.force)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/roles/{role_id}/clone - Clone a role into an editable copy.
pub async fn clone_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let clone = state
        .role_service
        .clone_role(&actor, RoleId::from_uuid(role_id))
        .await?;

    Ok((StatusCode::CREATED, Json(clone.into())))
}

fn requested_scope(actor: &ActorContext, scope_kind: Option<&str>) -> Result<RoleScope, AppError> {
    match scope_kind.unwrap_or("company") {
        "company" => Ok(RoleScope::Company(actor.require_company()?)),
        "system" => Ok(RoleScope::System),
        "platform" => Ok(RoleScope::Platform),
        other => Err(AppError::Validation(format!(
            "unknown role scope kind '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crewdeck_core::{AccessScope, ActorContext, AppError, CompanyId, UserId};
    use crewdeck_domain::RoleScope;

    use super::requested_scope;

    fn company_actor(company_id: CompanyId) -> ActorContext {
        ActorContext::new(
            UserId::new(),
            "admin@example.com",
            "Admin",
            AccessScope::Company(company_id),
        )
    }

    #[test]
    fn scope_defaults_to_the_actors_company() {
        let company_id = CompanyId::new();
        let scope = requested_scope(&company_actor(company_id), None);
        assert_eq!(scope.ok(), Some(RoleScope::Company(company_id)));
    }

    #[test]
    fn platform_scope_kind_needs_no_company() {
        let actor = ActorContext::new(
            UserId::new(),
            "operator@example.com",
            "Operator",
            AccessScope::Platform,
        );
        assert_eq!(
            requested_scope(&actor, Some("platform")).ok(),
            Some(RoleScope::Platform)
        );
        assert!(matches!(
            requested_scope(&actor, Some("company")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_scope_kind_is_rejected() {
        let result = requested_scope(&company_actor(CompanyId::new()), Some("galaxy"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
