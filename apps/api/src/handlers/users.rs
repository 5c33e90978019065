use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use crewdeck_core::{ActorContext, OfficeId, UserId};
use uuid::Uuid;

use crate::dto::{
    EffectivePermissionsResponse, OfficeResponse, RoleResponse, SetCurrentOfficeRequest,
    UpdateUserRequest, UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_office_id;

/// GET /api/users - List the members of the session company.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.user_service.list_for_company(&actor).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/users/{user_id} - Fetch one user profile.
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .get(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok(Json(user.into()))
}

/// PUT /api/users/{user_id} - Rename a user.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .update_display_name(&actor, UserId::from_uuid(user_id), payload.display_name)
        .await?;
    Ok(Json(user.into()))
}

/// GET /api/users/{user_id}/roles - Roles the user holds in the session scope.
pub async fn user_roles_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .assignment_service
        .roles_for_user(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// GET /api/users/{user_id}/offices - Offices the user may work in.
pub async fn user_offices_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<OfficeResponse>>> {
    let offices = state
        .office_service
        .offices_for_user(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok(Json(offices.into_iter().map(OfficeResponse::from).collect()))
}

/// GET /api/me/permissions - The session user's own effective permissions.
///
/// Advisory only; mutating handlers re-check authorization server-side.
pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state
        .authorization_service
        .effective_permissions(actor.user_id(), actor.scope())
        .await?;
    Ok(Json(permissions.into()))
}

/// GET /api/users/{user_id}/permissions - Effective permissions in scope.
pub async fn user_permissions_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state
        .assignment_service
        .effective_permissions(&actor, UserId::from_uuid(user_id))
        .await?;
    Ok(Json(permissions.into()))
}

/// PUT /api/users/{user_id}/current-office - Move the current-office pointer.
pub async fn set_current_office_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetCurrentOfficeRequest>,
) -> ApiResult<StatusCode> {
    let office_id: Option<OfficeId> = payload
        .office_id
        .as_deref()
        .map(parse_office_id)
        .transpose()?;

    state
        .office_service
        .set_current_office(&actor, UserId::from_uuid(user_id), office_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
