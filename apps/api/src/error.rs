use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crewdeck_core::AppError;
use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
    /// Set for duplicate-invite conflicts so the client can offer
    /// update-and-resend on the existing invite.
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_invite_id: Option<String>,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::ImmutableRole(_)
            | AppError::RoleInUse { .. }
            | AppError::CrossCompanyRole(_)
            | AppError::OfficeNotAllowed(_)
            | AppError::InvalidInviteState { .. }
            | AppError::DuplicateInvite { .. } => StatusCode::CONFLICT,
            AppError::InviteExpired | AppError::InviteConsumed => StatusCode::GONE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let existing_invite_id = match &self.0 {
            AppError::DuplicateInvite { existing_invite_id } => {
                Some(existing_invite_id.to_string())
            }
            _ => None,
        };

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
            existing_invite_id,
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use crewdeck_core::{AppError, InviteId};

    use super::ApiError;

    #[test]
    fn duplicate_invite_maps_to_conflict() {
        let error = ApiError(AppError::DuplicateInvite {
            existing_invite_id: InviteId::new(),
        });
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn consumed_invite_maps_to_gone() {
        let error = ApiError(AppError::InviteConsumed);
        assert_eq!(error.into_response().status(), StatusCode::GONE);
    }
}
