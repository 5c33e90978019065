use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use crewdeck_application::CreateInviteParams;
use crewdeck_core::{ActorContext, AppError, InviteId};
use uuid::Uuid;

use crate::dto::{CreateInviteRequest, InviteResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{parse_office_id, parse_role_id};

/// GET /api/invites - List the session company's pending invites.
pub async fn list_invites_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<InviteResponse>>> {
    let invites = state.invite_service.list_pending(&actor).await?;
    Ok(Json(invites.into_iter().map(InviteResponse::from).collect()))
}

/// POST /api/invites - Create a pending invite and email the accept link.
pub async fn create_invite_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteResponse>)> {
    let params = invite_params(payload)?;
    let invite = state.invite_service.create(&actor, params).await?;
    Ok((StatusCode::CREATED, Json(invite.into())))
}

/// PUT /api/invites/{invite_id} - Replace a pending invite's grants and resend.
pub async fn update_invite_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(invite_id): Path<Uuid>,
    Json(payload): Json<CreateInviteRequest>,
) -> ApiResult<Json<InviteResponse>> {
    let params = invite_params(payload)?;
    let invite = state
        .invite_service
        .update_and_resend(&actor, InviteId::from_uuid(invite_id), params)
        .await?;
    Ok(Json(invite.into()))
}

/// DELETE /api/invites/{invite_id} - Revoke a pending invite.
pub async fn revoke_invite_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(invite_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .invite_service
        .revoke(&actor, InviteId::from_uuid(invite_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn invite_params(payload: CreateInviteRequest) -> Result<CreateInviteParams, AppError> {
    Ok(CreateInviteParams {
        email: payload.email,
        role_ids: payload
            .role_ids
            .iter()
            .map(|raw| parse_role_id(raw))
            .collect::<Result<_, _>>()?,
        current_office_id: parse_office_id(&payload.current_office_id)?,
        allowed_office_ids: payload
            .allowed_office_ids
            .iter()
            .map(|raw| parse_office_id(raw))
            .collect::<Result<_, _>>()?,
    })
}
