//! Invite entity and onboarding state machine.
//!
//! An invite is a pending, time-limited grant of roles and offices to an
//! email address. `Pending` is the only non-terminal state: acceptance
//! materializes the grants, revocation cancels them, and an expired pending
//! invite that gets replaced by a fresh one is marked `Superseded`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use crewdeck_core::{AppError, AppResult, CompanyId, InviteId, OfficeId, RoleId, UserId};
use serde::{Deserialize, Serialize};

use crate::user::EmailAddress;

/// Lifecycle state of an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    /// Awaiting acceptance; the only state that permits transitions.
    Pending,
    /// Accepted; the grants have been materialized.
    Accepted,
    /// Cancelled by an administrator before acceptance.
    Revoked,
    /// Expired and replaced by a newer invite for the same email and company.
    Superseded,
}

impl InviteStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Revoked => "revoked",
            Self::Superseded => "superseded",
        }
    }

    /// Returns true when no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for InviteStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "revoked" => Ok(Self::Revoked),
            "superseded" => Ok(Self::Superseded),
            _ => Err(AppError::Validation(format!(
                "unknown invite status '{value}'"
            ))),
        }
    }
}

/// A pending grant of roles and offices to an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    id: InviteId,
    company_id: CompanyId,
    email: EmailAddress,
    role_ids: Vec<RoleId>,
    current_office_id: OfficeId,
    allowed_office_ids: Vec<OfficeId>,
    status: InviteStatus,
    token_hash: String,
    expires_at: DateTime<Utc>,
    invited_by: Option<UserId>,
    is_existing_user_invite: bool,
    created_at: DateTime<Utc>,
}

impl Invite {
    /// Creates a pending invite with validated office grants.
    ///
    /// `allowed_office_ids` must be non-empty and contain
    /// `current_office_id`; role and office id lists are de-duplicated with
    /// insertion order preserved. Whether the listed roles and offices exist
    /// in the inviting company is a service concern.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InviteId,
        company_id: CompanyId,
        email: EmailAddress,
        role_ids: Vec<RoleId>,
        current_office_id: OfficeId,
        allowed_office_ids: Vec<OfficeId>,
        token_hash: impl Into<String>,
        expires_at: DateTime<Utc>,
        invited_by: Option<UserId>,
        is_existing_user_invite: bool,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let allowed_office_ids = validate_office_grants(current_office_id, allowed_office_ids)?;

        let token_hash = token_hash.into();
        if token_hash.trim().is_empty() {
            return Err(AppError::Validation(
                "invite token hash must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id,
            company_id,
            email,
            role_ids: dedup_preserving_order(role_ids),
            current_office_id,
            allowed_office_ids,
            status: InviteStatus::Pending,
            token_hash,
            expires_at,
            invited_by,
            is_existing_user_invite,
            created_at,
        })
    }

    /// Rebuilds an invite from storage without re-running creation checks.
    ///
    /// Storage rows already satisfied the creation invariants; terminal rows
    /// are loaded as-is so their state can be reported.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_storage(
        id: InviteId,
        company_id: CompanyId,
        email: EmailAddress,
        role_ids: Vec<RoleId>,
        current_office_id: OfficeId,
        allowed_office_ids: Vec<OfficeId>,
        status: InviteStatus,
        token_hash: String,
        expires_at: DateTime<Utc>,
        invited_by: Option<UserId>,
        is_existing_user_invite: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_id,
            email,
            role_ids,
            current_office_id,
            allowed_office_ids,
            status,
            token_hash,
            expires_at,
            invited_by,
            is_existing_user_invite,
            created_at,
        }
    }

    /// Returns the invite identifier.
    #[must_use]
    pub fn id(&self) -> InviteId {
        self.id
    }

    /// Returns the inviting company.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the invited email address.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the requested role ids.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        &self.role_ids
    }

    /// Returns the office the user lands in on acceptance.
    #[must_use]
    pub fn current_office_id(&self) -> OfficeId {
        self.current_office_id
    }

    /// Returns the offices granted on acceptance.
    #[must_use]
    pub fn allowed_office_ids(&self) -> &[OfficeId] {
        &self.allowed_office_ids
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn status(&self) -> InviteStatus {
        self.status
    }

    /// Returns the SHA-256 hash of the invite token.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    /// Returns the expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the inviting user, when recorded.
    #[must_use]
    pub fn invited_by(&self) -> Option<UserId> {
        self.invited_by
    }

    /// Returns true when the email belonged to a registered identity at
    /// creation time. Acceptance re-checks against live data.
    #[must_use]
    pub fn is_existing_user_invite(&self) -> bool {
        self.is_existing_user_invite
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true when the invite expired before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns true when the invite can still be accepted at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == InviteStatus::Pending && !self.is_expired(now)
    }

    /// Fails unless the invite can be accepted at `now`.
    ///
    /// Accepted invites report [`AppError::InviteConsumed`], revoked or
    /// superseded ones [`AppError::InvalidInviteState`], expired pending
    /// ones [`AppError::InviteExpired`].
    pub fn ensure_acceptable(&self, now: DateTime<Utc>) -> AppResult<()> {
        match self.status {
            InviteStatus::Accepted => Err(AppError::InviteConsumed),
            InviteStatus::Revoked | InviteStatus::Superseded => {
                Err(AppError::InvalidInviteState {
                    status: self.status.as_str().to_owned(),
                })
            }
            InviteStatus::Pending if self.is_expired(now) => Err(AppError::InviteExpired),
            InviteStatus::Pending => Ok(()),
        }
    }

    /// Fails with [`AppError::InvalidInviteState`] unless the invite is
    /// still pending.
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status == InviteStatus::Pending {
            return Ok(());
        }
        Err(AppError::InvalidInviteState {
            status: self.status.as_str().to_owned(),
        })
    }

    /// Marks the invite accepted.
    pub fn mark_accepted(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_acceptable(now)?;
        self.status = InviteStatus::Accepted;
        Ok(())
    }

    /// Marks the invite revoked.
    pub fn mark_revoked(&mut self) -> AppResult<()> {
        self.ensure_pending()?;
        self.status = InviteStatus::Revoked;
        Ok(())
    }

    /// Marks the invite superseded by a newer one.
    pub fn mark_superseded(&mut self) -> AppResult<()> {
        self.ensure_pending()?;
        self.status = InviteStatus::Superseded;
        Ok(())
    }

    /// Replaces the grants and token of a pending invite in place.
    ///
    /// This is the update-and-resend path: the id stays unchanged so a
    /// duplicate-detection result remains addressable, while the token and
    /// expiry are regenerated.
    pub fn reissue(
        &mut self,
        role_ids: Vec<RoleId>,
        current_office_id: OfficeId,
        allowed_office_ids: Vec<OfficeId>,
        token_hash: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_pending()?;

        let allowed_office_ids = validate_office_grants(current_office_id, allowed_office_ids)?;
        let token_hash = token_hash.into();
        if token_hash.trim().is_empty() {
            return Err(AppError::Validation(
                "invite token hash must not be empty".to_owned(),
            ));
        }

        self.role_ids = dedup_preserving_order(role_ids);
        self.current_office_id = current_office_id;
        self.allowed_office_ids = allowed_office_ids;
        self.token_hash = token_hash;
        self.expires_at = expires_at;
        Ok(())
    }
}

fn validate_office_grants(
    current_office_id: OfficeId,
    allowed_office_ids: Vec<OfficeId>,
) -> AppResult<Vec<OfficeId>> {
    let allowed_office_ids = dedup_preserving_order(allowed_office_ids);

    if allowed_office_ids.is_empty() {
        return Err(AppError::Validation(
            "allowed offices must not be empty".to_owned(),
        ));
    }

    if !allowed_office_ids.contains(&current_office_id) {
        return Err(AppError::Validation(
            "current office must be one of the allowed offices".to_owned(),
        ));
    }

    Ok(allowed_office_ids)
}

fn dedup_preserving_order<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut deduped: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !deduped.contains(&value) {
            deduped.push(value);
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use crewdeck_core::{AppError, CompanyId, InviteId, OfficeId, RoleId, UserId};

    use super::{Invite, InviteStatus};
    use crate::user::EmailAddress;

    fn email(value: &str) -> EmailAddress {
        match EmailAddress::new(value) {
            Ok(parsed) => parsed,
            Err(error) => panic!("'{value}' should validate: {error}"),
        }
    }

    fn pending_invite(office: OfficeId) -> Invite {
        let result = Invite::new(
            InviteId::new(),
            CompanyId::new(),
            email("a@example.com"),
            vec![RoleId::new()],
            office,
            vec![office],
            "a".repeat(64),
            Utc::now() + Duration::days(7),
            Some(UserId::new()),
            false,
            Utc::now(),
        );
        match result {
            Ok(invite) => invite,
            Err(error) => panic!("invite should build: {error}"),
        }
    }

    #[test]
    fn allowed_offices_must_not_be_empty() {
        let result = Invite::new(
            InviteId::new(),
            CompanyId::new(),
            email("a@example.com"),
            vec![],
            OfficeId::new(),
            vec![],
            "a".repeat(64),
            Utc::now() + Duration::days(7),
            None,
            false,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn current_office_must_be_allowed() {
        let result = Invite::new(
            InviteId::new(),
            CompanyId::new(),
            email("a@example.com"),
            vec![],
            OfficeId::new(),
            vec![OfficeId::new()],
            "a".repeat(64),
            Utc::now() + Duration::days(7),
            None,
            false,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_ids_collapse() {
        let office = OfficeId::new();
        let role = RoleId::new();
        let result = Invite::new(
            InviteId::new(),
            CompanyId::new(),
            email("a@example.com"),
            vec![role, role],
            office,
            vec![office, office],
            "a".repeat(64),
            Utc::now() + Duration::days(7),
            None,
            false,
            Utc::now(),
        );
        let Ok(invite) = result else {
            panic!("invite should build");
        };
        assert_eq!(invite.role_ids().len(), 1);
        assert_eq!(invite.allowed_office_ids().len(), 1);
    }

    #[test]
    fn pending_invite_is_acceptable_until_expiry() {
        let invite = pending_invite(OfficeId::new());
        assert!(invite.ensure_acceptable(Utc::now()).is_ok());
        assert!(invite.is_live(Utc::now()));

        let after_expiry = Utc::now() + Duration::days(8);
        assert!(matches!(
            invite.ensure_acceptable(after_expiry),
            Err(AppError::InviteExpired)
        ));
        assert!(!invite.is_live(after_expiry));
    }

    #[test]
    fn accepted_invite_cannot_be_accepted_again() {
        let mut invite = pending_invite(OfficeId::new());
        assert!(invite.mark_accepted(Utc::now()).is_ok());
        assert_eq!(invite.status(), InviteStatus::Accepted);
        assert!(matches!(
            invite.ensure_acceptable(Utc::now()),
            Err(AppError::InviteConsumed)
        ));
    }

    #[test]
    fn revoked_invite_reports_its_state() {
        let mut invite = pending_invite(OfficeId::new());
        assert!(invite.mark_revoked().is_ok());
        assert!(matches!(
            invite.ensure_acceptable(Utc::now()),
            Err(AppError::InvalidInviteState { .. })
        ));
        assert!(invite.mark_revoked().is_err());
    }

    #[test]
    fn terminal_states_cannot_be_reissued() {
        let office = OfficeId::new();
        let mut invite = pending_invite(office);
        assert!(invite.mark_revoked().is_ok());

        let result = invite.reissue(
            vec![],
            office,
            vec![office],
            "b".repeat(64),
            Utc::now() + Duration::days(7),
        );
        assert!(matches!(result, Err(AppError::InvalidInviteState { .. })));
    }

    #[test]
    fn reissue_keeps_id_and_replaces_grants() {
        let office = OfficeId::new();
        let second_office = OfficeId::new();
        let mut invite = pending_invite(office);
        let id = invite.id();
        let original_hash = invite.token_hash().to_owned();

        let result = invite.reissue(
            vec![RoleId::new()],
            office,
            vec![office, second_office],
            "b".repeat(64),
            Utc::now() + Duration::days(7),
        );
        assert!(result.is_ok());
        assert_eq!(invite.id(), id);
        assert_eq!(invite.status(), InviteStatus::Pending);
        assert_eq!(invite.allowed_office_ids().len(), 2);
        assert_ne!(invite.token_hash(), original_hash);
    }

    #[test]
    fn status_parses_storage_values() {
        for status in [
            InviteStatus::Pending,
            InviteStatus::Accepted,
            InviteStatus::Revoked,
            InviteStatus::Superseded,
        ] {
            let restored: Result<InviteStatus, _> = status.as_str().parse();
            assert_eq!(restored.ok(), Some(status));
        }
        assert!("unsent".parse::<InviteStatus>().is_err());
    }
}
