use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use crewdeck_application::AcceptInviteParams;
use crewdeck_core::{AccessScope, ActorContext, AppError, UserId};
use serde::Deserialize;
use tower_sessions::Session;

use crate::dto::{
    AcceptInviteRequest, BootstrapRequest, InvitePreviewResponse, LoginRequest, SessionResponse,
    SwitchCompanyRequest,
};
use crate::error::ApiResult;
use crate::handlers::parse_company_id;
use crate::state::AppState;

pub const SESSION_USER_KEY: &str = "actor_context";
/// Absolute session creation timestamp for OWASP absolute timeout enforcement.
pub const SESSION_CREATED_AT_KEY: &str = "session_created_at";

#[derive(Debug, Deserialize)]
pub struct InvitePreviewQuery {
    pub token: String,
}

/// POST /auth/bootstrap - Create the first platform operator.
pub async fn bootstrap_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<BootstrapRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    if payload.token != state.bootstrap_token {
        return Err(AppError::Unauthorized("invalid bootstrap token".to_owned()).into());
    }

    let user = state
        .bootstrap_service
        .bootstrap(crewdeck_application::BootstrapParams {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;

    let actor = ActorContext::new(
        user.id(),
        user.email().as_str(),
        user.display_name().as_str(),
        AccessScope::Platform,
    );
    establish_session(&session, &actor).await?;

    Ok((StatusCode::CREATED, Json(actor.into())))
}

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?
        // OWASP: generic error message for all failure cases.
        .ok_or_else(|| AppError::Unauthorized("invalid email or password".to_owned()))?;

    let scope = resolve_login_scope(&state, user.id()).await?;
    let actor = ActorContext::new(
        user.id(),
        user.email().as_str(),
        user.display_name().as_str(),
        scope,
    );
    establish_session(&session, &actor).await?;

    Ok(Json(actor.into()))
}

/// POST /auth/logout - Destroy the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Describe the authenticated session.
pub async fn me_handler(Extension(actor): Extension<ActorContext>) -> Json<SessionResponse> {
    Json(actor.into())
}

/// POST /auth/switch-company - Move the session to another scope.
pub async fn switch_company_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    session: Session,
    Json(payload): Json<SwitchCompanyRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let scope = match payload.company_id.as_deref() {
        Some(raw) => {
            let company_id = parse_company_id(raw)?;
            let memberships = state
                .assignment_service
                .companies_for_user(actor.user_id())
                .await?;
            if !memberships
                .iter()
                .any(|company| company.id() == company_id)
            {
                return Err(AppError::Forbidden(
                    "you are not a member of this company".to_owned(),
                )
                .into());
            }
            AccessScope::Company(company_id)
        }
        None => {
            let platform_permissions = state
                .authorization_service
                .effective_permissions(actor.user_id(), AccessScope::Platform)
                .await?;
            if platform_permissions.is_empty() {
                return Err(AppError::Forbidden(
                    "you do not have platform operator access".to_owned(),
                )
                .into());
            }
            AccessScope::Platform
        }
    };

    let rescoped = actor.with_scope(scope);
    establish_session(&session, &rescoped).await?;

    Ok(Json(rescoped.into()))
}

/// GET /auth/invites/preview - Resolve an invite token for the landing page.
pub async fn invite_preview_handler(
    State(state): State<AppState>,
    Query(query): Query<InvitePreviewQuery>,
) -> ApiResult<Json<InvitePreviewResponse>> {
    let preview = state.invite_service.preview(&query.token).await?;
    Ok(Json(preview.into()))
}

/// POST /auth/invites/accept - Accept an invite and sign the user in.
pub async fn accept_invite_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AcceptInviteRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let accepted = state
        .invite_service
        .accept(AcceptInviteParams {
            token: payload.token,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;

    let actor = ActorContext::new(
        accepted.user_id,
        accepted.email,
        accepted.display_name,
        AccessScope::Company(accepted.company_id),
    );
    establish_session(&session, &actor).await?;

    Ok(Json(actor.into()))
}

/// Users land in their company when they have one; everyone else starts at
/// platform scope, where they hold exactly the permissions of their platform
/// roles (usually none).
async fn resolve_login_scope(state: &AppState, user_id: UserId) -> Result<AccessScope, AppError> {
    let memberships = state.assignment_service.companies_for_user(user_id).await?;

    Ok(match memberships.first() {
        Some(company) => AccessScope::Company(company.id()),
        None => AccessScope::Platform,
    })
}

async fn establish_session(session: &Session, actor: &ActorContext) -> Result<(), AppError> {
    // OWASP Session Management: regenerate session ID on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, actor)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session identity: {error}"))
        })?;

    session
        .insert(SESSION_CREATED_AT_KEY, chrono::Utc::now().timestamp())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session creation time: {error}"))
        })?;

    Ok(())
}
