//! Shared primitives for all Rust crates in Crewdeck.

#![forbid(unsafe_code)]

/// Session-scoped actor identity and access scope.
pub mod actor;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use actor::{AccessScope, ActorContext};

/// Result type used across Crewdeck crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Company identifier used as the tenant partition key for every scoped resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(Uuid);

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

/// Unique identifier for an office (sub-tenant location unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfficeId(Uuid);

/// Unique identifier for a role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

/// Unique identifier for an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InviteId(Uuid);

macro_rules! uuid_id_impls {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                /// Creates a random identifier.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Creates an identifier from an existing UUID value.
                #[must_use]
                pub fn from_uuid(value: Uuid) -> Self {
                    Self(value)
                }

                /// Returns the underlying UUID value.
                #[must_use]
                pub fn as_uuid(&self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl Display for $name {
                fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(formatter, "{}", self.0)
                }
            }
        )+
    };
}

uuid_id_impls!(CompanyId, UserId, OfficeId, RoleId, InviteId);

/// Common application error categories.
///
/// Every variant is an expected domain outcome surfaced to the caller with
/// enough structure to act on; storage-level constraint violations are
/// translated into these kinds at the transaction boundary and never leak
/// as raw database errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Attempted mutation of a system- or platform-scoped role.
    #[error("role '{0}' is system-managed and cannot be modified")]
    ImmutableRole(String),

    /// Role deletion rejected while assignments reference it.
    #[error("role '{role}' is assigned to {assignment_count} user(s); pass force to cascade")]
    RoleInUse {
        /// Role name of the deletion target.
        role: String,
        /// Number of live assignments blocking the delete.
        assignment_count: i64,
    },

    /// Role/assignment company scopes do not match.
    #[error("role '{0}' does not belong to the requested company scope")]
    CrossCompanyRole(String),

    /// Current-office pointer would leave the user's allowed set.
    #[error("office '{0}' is not in the user's allowed offices")]
    OfficeNotAllowed(String),

    /// A live pending invite already exists for the email in this company.
    #[error("a pending invite for this email already exists ({existing_invite_id})")]
    DuplicateInvite {
        /// Identifier of the pending invite the caller can update and resend.
        existing_invite_id: InviteId,
    },

    /// Invite token is past its expiry.
    #[error("invite has expired")]
    InviteExpired,

    /// Invite token was already accepted.
    #[error("invite has already been accepted")]
    InviteConsumed,

    /// Operation is not legal for the invite's current state.
    #[error("invite is {status} and cannot be modified")]
    InvalidInviteState {
        /// Storage value of the invite's current status.
        status: String,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, CompanyId, InviteId, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn company_id_formats_as_uuid() {
        let company_id = CompanyId::new();
        assert_eq!(company_id.to_string().len(), 36);
    }

    #[test]
    fn duplicate_invite_error_carries_existing_id() {
        let existing_invite_id = InviteId::new();
        let error = AppError::DuplicateInvite { existing_invite_id };
        assert!(error.to_string().contains(&existing_invite_id.to_string()));
    }
}
