//! Stable audit actions emitted by application use-cases.

use serde::{Deserialize, Serialize};

/// Identifier for one kind of auditable mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a company is created.
    CompanyCreated,
    /// Emitted when a company is renamed.
    CompanyUpdated,
    /// Emitted when an office is created.
    OfficeCreated,
    /// Emitted when an office is renamed.
    OfficeUpdated,
    /// Emitted when an office is deleted with its access rows.
    OfficeDeleted,
    /// Emitted when a user is granted access to an office.
    OfficeAccessGranted,
    /// Emitted when a user's access to an office is revoked.
    OfficeAccessRevoked,
    /// Emitted when a user's current office changes.
    CurrentOfficeChanged,
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role definition changes.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when a role is cloned into a company role.
    RoleCloned,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role is revoked from a user.
    RoleRevoked,
    /// Emitted when an invite is created.
    InviteCreated,
    /// Emitted when a pending invite is updated and re-sent.
    InviteReissued,
    /// Emitted when a pending invite is revoked.
    InviteRevoked,
    /// Emitted when an invite is accepted and its grants materialize.
    InviteAccepted,
    /// Emitted when a user profile changes.
    UserUpdated,
    /// Emitted when the first platform operator is bootstrapped.
    PlatformBootstrapped,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyCreated => "company.created",
            Self::CompanyUpdated => "company.updated",
            Self::OfficeCreated => "office.created",
            Self::OfficeUpdated => "office.updated",
            Self::OfficeDeleted => "office.deleted",
            Self::OfficeAccessGranted => "office.access_granted",
            Self::OfficeAccessRevoked => "office.access_revoked",
            Self::CurrentOfficeChanged => "office.current_changed",
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleDeleted => "role.deleted",
            Self::RoleCloned => "role.cloned",
            Self::RoleAssigned => "role.assigned",
            Self::RoleRevoked => "role.revoked",
            Self::InviteCreated => "invite.created",
            Self::InviteReissued => "invite.reissued",
            Self::InviteRevoked => "invite.revoked",
            Self::InviteAccepted => "invite.accepted",
            Self::UserUpdated => "user.updated",
            Self::PlatformBootstrapped => "platform.bootstrapped",
        }
    }
}
