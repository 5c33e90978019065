use crewdeck_application::InvitePreview;
use crewdeck_core::{AccessScope, ActorContext};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for first-run platform bootstrap.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/bootstrap-request.ts"
)]
pub struct BootstrapRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub token: String,
}

/// Incoming payload for email/password login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Incoming payload for the company switcher.
///
/// `company_id: null` switches a platform operator back to platform scope.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/switch-company-request.ts"
)]
pub struct SwitchCompanyRequest {
    pub company_id: Option<String>,
}

/// Incoming payload for invite acceptance.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/accept-invite-request.ts"
)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

/// API representation of a session's access scope.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/scope-response.ts"
)]
pub struct ScopeResponse {
    pub kind: String,
    pub company_id: Option<String>,
}

/// API representation of the authenticated session.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/session-response.ts"
)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub scope: ScopeResponse,
}

/// What the invite landing page shows before acceptance.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/invite-preview-response.ts"
)]
pub struct InvitePreviewResponse {
    pub company_name: String,
    pub email: String,
    pub requires_password: bool,
    pub expires_at: String,
}

impl From<AccessScope> for ScopeResponse {
    fn from(scope: AccessScope) -> Self {
        match scope {
            AccessScope::Company(company_id) => Self {
                kind: "company".to_owned(),
                company_id: Some(company_id.to_string()),
            },
            AccessScope::Platform => Self {
                kind: "platform".to_owned(),
                company_id: None,
            },
        }
    }
}

impl From<ActorContext> for SessionResponse {
    fn from(actor: ActorContext) -> Self {
        Self {
            user_id: actor.user_id().to_string(),
            email: actor.email().to_owned(),
            display_name: actor.display_name().to_owned(),
            scope: actor.scope().into(),
        }
    }
}

impl From<InvitePreview> for InvitePreviewResponse {
    fn from(preview: InvitePreview) -> Self {
        Self {
            company_name: preview.company_name,
            email: preview.email,
            requires_password: preview.requires_password,
            expires_at: preview.expires_at.to_rfc3339(),
        }
    }
}
