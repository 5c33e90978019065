use crewdeck_domain::Invite;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for invite creation and update-and-resend.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-invite-request.ts"
)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role_ids: Vec<String>,
    pub current_office_id: String,
    pub allowed_office_ids: Vec<String>,
}

/// API representation of an invite. The token is never exposed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/invite-response.ts"
)]
pub struct InviteResponse {
    pub id: String,
    pub email: String,
    pub role_ids: Vec<String>,
    pub current_office_id: String,
    pub allowed_office_ids: Vec<String>,
    pub status: String,
    pub expires_at: String,
    pub invited_by: Option<String>,
    pub is_existing_user_invite: bool,
    pub created_at: String,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            id: invite.id().to_string(),
            email: invite.email().as_str().to_owned(),
            role_ids: invite.role_ids().iter().map(ToString::to_string).collect(),
            current_office_id: invite.current_office_id().to_string(),
            allowed_office_ids: invite
                .allowed_office_ids()
                .iter()
                .map(ToString::to_string)
                .collect(),
            status: invite.status().as_str().to_owned(),
            expires_at: invite.expires_at().to_rfc3339(),
            invited_by: invite.invited_by().map(|id| id.to_string()),
            is_existing_user_invite: invite.is_existing_user_invite(),
            created_at: invite.created_at().to_rfc3339(),
        }
    }
}
