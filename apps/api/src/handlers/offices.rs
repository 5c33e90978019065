use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use crewdeck_core::{ActorContext, OfficeId, UserId};
use uuid::Uuid;

use crate::dto::{
    CreateOfficeRequest, GrantOfficeAccessRequest, OfficeResponse, UpdateOfficeRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::parse_user_id;

/// GET /api/offices - List the session company's offices.
pub async fn list_offices_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<OfficeResponse>>> {
    let offices = state.office_service.list(&actor).await?;
    Ok(Json(offices.into_iter().map(OfficeResponse::from).collect()))
}

/// POST /api/offices - Create an office.
pub async fn create_office_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateOfficeRequest>,
) -> ApiResult<(StatusCode, Json<OfficeResponse>)> {
    let office = state.office_service.create(&actor, payload.name).await?;
    Ok((StatusCode::CREATED, Json(office.into())))
}

/// PUT /api/offices/{office_id} - Rename an office.
pub async fn update_office_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(office_id): Path<Uuid>,
    Json(payload): Json<UpdateOfficeRequest>,
) -> ApiResult<Json<OfficeResponse>> {
    let office = state
        .office_service
        .update(&actor, OfficeId::from_uuid(office_id), payload.name)
        .await?;
    Ok(Json(office.into()))
}

/// DELETE /api/offices/{office_id} - Delete an office and its access rows.
pub async fn delete_office_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(office_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .office_service
        .delete(&actor, OfficeId::from_uuid(office_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/offices/{office_id}/access - Add an office to a user's allowed set.
pub async fn grant_office_access_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(office_id): Path<Uuid>,
    Json(payload): Json<GrantOfficeAccessRequest>,
) -> ApiResult<StatusCode> {
    let user_id = parse_user_id(&payload.user_id)?;

    state
        .office_service
        .grant_access(&actor, user_id, OfficeId::from_uuid(office_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/offices/{office_id}/access/{user_id} - Revoke office access.
pub async fn revoke_office_access_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path((office_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .office_service
        .revoke_access(
            &actor,
            UserId::from_uuid(user_id),
            OfficeId::from_uuid(office_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
