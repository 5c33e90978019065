use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use crewdeck_core::ActorContext;

use crate::dto::{AssignRoleRequest, RemoveRoleAssignmentRequest, RoleAssignmentResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{parse_role_id, parse_user_id};

/// GET /api/role-assignments - List every assignment in the session company.
pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state.assignment_service.list_for_company(&actor).await?;
    Ok(Json(
        assignments
            .into_iter()
            .map(RoleAssignmentResponse::from)
            .collect(),
    ))
}

/// POST /api/role-assignments - Grant a role to a user.
pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(&payload.user_id)?;
    let role_id = parse_role_id(&payload.role_id)?;

    state.assignment_service.assign(&actor, user_id, role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/role-unassignments - Revoke a role from a user.
pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<RemoveRoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(&payload.user_id)?;
    let role_id = parse_role_id(&payload.role_id)?;

    state.assignment_service.revoke(&actor, user_id, role_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
