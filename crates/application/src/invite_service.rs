//! Invite lifecycle: creation, reissue, revocation, preview, acceptance.
//!
//! Invite tokens are cryptographically random, stored as SHA-256 hashes,
//! single-use, and time-limited per OWASP guidance; the raw token only ever
//! leaves the system inside the invite email.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crewdeck_core::{
    ActorContext, AppError, AppResult, CompanyId, InviteId, OfficeId, RoleId, UserId,
};
use crewdeck_domain::{
    AuditAction, EmailAddress, Invite, KnownPermission, Role, RoleScope, User, validate_password,
};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::security_ports::{RoleAssignment, RoleRepository};
use crate::tenant_ports::{CompanyRepository, OfficeAccess, OfficeRepository};
use crate::user_service::{PasswordHasher, UserRepository};

/// Days an invite stays acceptable after (re)issue.
pub const INVITE_TTL_DAYS: i64 = 7;

/// Port for sending emails. Infrastructure provides SMTP or console
/// implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text email with an optional HTML alternative.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}

/// A new identity to create during invite acceptance.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    /// The identity to create.
    pub user: User,
    /// Hash of the password chosen during acceptance.
    pub password_hash: String,
}

/// Everything acceptance materializes in one transaction.
#[derive(Debug, Clone)]
pub struct InviteAcceptance {
    /// The invite, already marked accepted.
    pub invite: Invite,
    /// Identity to create; `None` when the email already has one.
    pub new_user: Option<NewUserRecord>,
    /// The accepting user (new or existing).
    pub user_id: UserId,
    /// Role grants to record.
    pub role_assignments: Vec<RoleAssignment>,
    /// Office access rows to record.
    pub office_grants: Vec<OfficeAccess>,
    /// Office the user lands in.
    pub current_office_id: OfficeId,
}

/// Repository port for invites.
///
/// The multi-row invariants (one live pending invite per email and company,
/// atomic acceptance) are each one method so adapters run them as single
/// transactions.
#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Inserts a pending invite, enforcing the one-live-invite rule.
    ///
    /// A live pending invite for the same email and company fails with
    /// [`AppError::DuplicateInvite`] carrying the existing id; an expired
    /// pending one is marked superseded in the same transaction.
    async fn insert_pending(&self, invite: &Invite, now: DateTime<Utc>) -> AppResult<()>;

    /// Persists changes to an existing invite.
    async fn update(&self, invite: &Invite) -> AppResult<()>;

    /// Finds an invite by id.
    async fn find(&self, invite_id: InviteId) -> AppResult<Option<Invite>>;

    /// Finds an invite by its token hash.
    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invite>>;

    /// Lists a company's pending invites, newest first.
    async fn list_pending_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Invite>>;

    /// Materializes an acceptance: optional identity creation, role grants,
    /// office grants, current-office pointer, and the status flip, all in
    /// one transaction.
    async fn accept(&self, acceptance: &InviteAcceptance) -> AppResult<()>;
}

/// Fields for a new or reissued invite.
#[derive(Debug, Clone)]
pub struct CreateInviteParams {
    /// Address to invite.
    pub email: String,
    /// Roles granted on acceptance.
    pub role_ids: Vec<RoleId>,
    /// Office the user lands in; must be listed in `allowed_office_ids`.
    pub current_office_id: OfficeId,
    /// Offices granted on acceptance.
    pub allowed_office_ids: Vec<OfficeId>,
}

/// Acceptance input from the invite landing page.
#[derive(Debug, Clone)]
pub struct AcceptInviteParams {
    /// Raw invite token from the emailed link.
    pub token: String,
    /// Password for a new identity; ignored for existing ones.
    pub password: Option<String>,
    /// Display name for a new identity; defaults to the email local part.
    pub display_name: Option<String>,
}

/// What the invite landing page shows before acceptance.
#[derive(Debug, Clone)]
pub struct InvitePreview {
    /// Name of the inviting company.
    pub company_name: String,
    /// Invited address.
    pub email: String,
    /// True when acceptance must supply a password.
    pub requires_password: bool,
    /// When the invite stops being acceptable.
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful acceptance, used to establish the session.
#[derive(Debug, Clone)]
pub struct AcceptedInvite {
    /// The accepting user.
    pub user_id: UserId,
    /// Company the user was onboarded into.
    pub company_id: CompanyId,
    /// Canonical email of the user.
    pub email: String,
    /// Display name of the user.
    pub display_name: String,
    /// Office the user landed in.
    pub current_office_id: OfficeId,
}

/// Invite lifecycle management.
pub struct InviteService {
    invites: Arc<dyn InviteRepository>,
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    offices: Arc<dyn OfficeRepository>,
    companies: Arc<dyn CompanyRepository>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
    email: Arc<dyn EmailService>,
    password_hasher: Arc<dyn PasswordHasher>,
    invite_base_url: String,
}

impl InviteService {
    /// Creates the service from its dependencies.
    ///
    /// `invite_base_url` is the frontend origin the emailed accept link
    /// points at.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        invites: Arc<dyn InviteRepository>,
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        offices: Arc<dyn OfficeRepository>,
        companies: Arc<dyn CompanyRepository>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
        email: Arc<dyn EmailService>,
        password_hasher: Arc<dyn PasswordHasher>,
        invite_base_url: String,
    ) -> Self {
        Self {
            invites,
            users,
            roles,
            offices,
            companies,
            authorization,
            audit,
            email,
            password_hasher,
            invite_base_url,
        }
    }

    /// Creates a pending invite and emails the accept link.
    ///
    /// At most one live pending invite may exist per email and company;
    /// a duplicate fails with [`AppError::DuplicateInvite`] so the caller
    /// can offer update-and-resend instead.
    pub async fn create(
        &self,
        actor: &ActorContext,
        params: CreateInviteParams,
    ) -> AppResult<Invite> {
        self.authorization
            .require(actor, KnownPermission::InviteCreate)
            .await?;
        let company_id = actor.require_company()?;
        let now = Utc::now();

        let email = EmailAddress::new(params.email)?;
        self.ensure_grantable(company_id, &params.role_ids, &params.allowed_office_ids)
            .await?;

        let is_existing = self.users.find_by_email(&email).await?.is_some();
        let (raw_token, token_hash) = generate_invite_token()?;

        let invite = Invite::new(
            InviteId::new(),
            company_id,
            email,
            params.role_ids,
            params.current_office_id,
            params.allowed_office_ids,
            token_hash,
            now + Duration::days(INVITE_TTL_DAYS),
            Some(actor.user_id()),
            is_existing,
            now,
        )?;
        self.invites.insert_pending(&invite, now).await?;

        self.send_invite_email(&invite, &raw_token).await?;
        self.record(actor, AuditAction::InviteCreated, &invite).await?;
        Ok(invite)
    }

    /// Replaces the grants of a pending invite and re-sends it.
    ///
    /// The invite id stays the same so a duplicate-detection result remains
    /// addressable; the token and expiry window are regenerated.
    pub async fn update_and_resend(
        &self,
        actor: &ActorContext,
        invite_id: InviteId,
        params: CreateInviteParams,
    ) -> AppResult<Invite> {
        self.authorization
            .require(actor, KnownPermission::InviteCreate)
            .await?;
        let company_id = actor.require_company()?;
        let now = Utc::now();

        let mut invite = self.find_company_invite(company_id, invite_id).await?;
        let email = EmailAddress::new(params.email)?;
        if &email != invite.email() {
            return Err(AppError::Validation(
                "the invited email address cannot be changed; revoke and invite again".to_owned(),
            ));
        }
        self.ensure_grantable(company_id, &params.role_ids, &params.allowed_office_ids)
            .await?;

        let (raw_token, token_hash) = generate_invite_token()?;
        invite.reissue(
            params.role_ids,
            params.current_office_id,
            params.allowed_office_ids,
            token_hash,
            now + Duration::days(INVITE_TTL_DAYS),
        )?;
        self.invites.update(&invite).await?;

        self.send_invite_email(&invite, &raw_token).await?;
        self.record(actor, AuditAction::InviteReissued, &invite).await?;
        Ok(invite)
    }

    /// Revokes a pending invite.
    pub async fn revoke(&self, actor: &ActorContext, invite_id: InviteId) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::InviteRevoke)
            .await?;
        let company_id = actor.require_company()?;

        let mut invite = self.find_company_invite(company_id, invite_id).await?;
        invite.mark_revoked()?;
        self.invites.update(&invite).await?;

        self.record(actor, AuditAction::InviteRevoked, &invite).await
    }

    /// Lists the actor's company's pending invites.
    pub async fn list_pending(&self, actor: &ActorContext) -> AppResult<Vec<Invite>> {
        self.authorization
            .require(actor, KnownPermission::InviteRead)
            .await?;
        let company_id = actor.require_company()?;
        self.invites.list_pending_for_company(company_id).await
    }

    /// Resolves a raw token into what the landing page shows.
    ///
    /// `requires_password` reflects the live identity table, not the
    /// snapshot taken at invite time.
    pub async fn preview(&self, raw_token: &str) -> AppResult<InvitePreview> {
        let invite = self.find_by_raw_token(raw_token).await?;
        invite.ensure_acceptable(Utc::now())?;

        let company = self
            .companies
            .find(invite.company_id())
            .await?
            .ok_or_else(|| AppError::Internal("invite references a missing company".to_owned()))?;
        let requires_password = self.users.find_by_email(invite.email()).await?.is_none();

        Ok(InvitePreview {
            company_name: company.name().as_str().to_owned(),
            email: invite.email().to_string(),
            requires_password,
            expires_at: invite.expires_at(),
        })
    }

    /// Accepts an invite and materializes its grants atomically.
    ///
    /// Whether the email already has an identity is re-checked live here: a
    /// user who registered after being invited joins with their existing
    /// account and the supplied password is ignored. New identities require
    /// a valid password. Granted roles are the invite's roles plus the
    /// company's default roles; roles or offices deleted since the invite
    /// was sent are skipped rather than failing the acceptance.
    pub async fn accept(&self, params: AcceptInviteParams) -> AppResult<AcceptedInvite> {
        let now = Utc::now();
        let mut invite = self.find_by_raw_token(&params.token).await?;
        invite.ensure_acceptable(now)?;
        let company_id = invite.company_id();

        // Offices may have been deleted since the invite was sent.
        let mut allowed = Vec::new();
        for office_id in invite.allowed_office_ids() {
            if let Some(office) = self.offices.find(*office_id).await?
                && office.company_id() == company_id
            {
                allowed.push(office.id());
            }
        }
        let current_office_id = if allowed.contains(&invite.current_office_id()) {
            invite.current_office_id()
        } else {
            *allowed.first().ok_or_else(|| {
                AppError::Conflict("the offices granted by this invite no longer exist".to_owned())
            })?
        };

        let existing = self.users.find_by_email(invite.email()).await?;
        let (user_id, display_name, new_user) = match existing {
            Some(user) => (user.id(), user.display_name().as_str().to_owned(), None),
            None => {
                let Some(password) = params.password.as_deref() else {
                    return Err(AppError::Validation(
                        "a password is required to create your account".to_owned(),
                    ));
                };
                validate_password(password)?;

                let display_name = params
                    .display_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| default_display_name(invite.email()));
                let user = User::new(
                    UserId::new(),
                    invite.email().clone(),
                    display_name.clone(),
                    Some(current_office_id),
                    now,
                )?;
                let password_hash = self.password_hasher.hash_password(password)?;
                (
                    user.id(),
                    display_name,
                    Some(NewUserRecord {
                        user,
                        password_hash,
                    }),
                )
            }
        };

        let mut role_ids: Vec<RoleId> = Vec::new();
        for role_id in invite.role_ids() {
            if self.roles.find(*role_id).await?.is_some() && !role_ids.contains(role_id) {
                role_ids.push(*role_id);
            }
        }
        for role in self.roles.list_for_company_scope(company_id).await? {
            if role.is_default() && !role_ids.contains(&role.id()) {
                role_ids.push(role.id());
            }
        }

        let role_assignments = role_ids
            .into_iter()
            .map(|role_id| RoleAssignment {
                user_id,
                role_id,
                company_id: Some(company_id),
                assigned_by: invite.invited_by(),
                assigned_at: now,
            })
            .collect();
        let office_grants = allowed
            .iter()
            .map(|office_id| OfficeAccess {
                user_id,
                office_id: *office_id,
                granted_by: invite.invited_by(),
                granted_at: now,
            })
            .collect();

        invite.mark_accepted(now)?;
        let email = invite.email().to_string();
        let acceptance = InviteAcceptance {
            invite,
            new_user,
            user_id,
            role_assignments,
            office_grants,
            current_office_id,
        };
        self.invites.accept(&acceptance).await?;

        self.audit
            .record(AuditEvent {
                company_id: Some(company_id),
                actor_user_id: Some(user_id),
                action: AuditAction::InviteAccepted,
                resource_type: "invite",
                resource_id: Some(acceptance.invite.id().to_string()),
                detail: serde_json::json!({ "email": email }),
            })
            .await?;

        Ok(AcceptedInvite {
            user_id,
            company_id,
            email,
            display_name,
            current_office_id,
        })
    }

    /// Validates that the granted roles and offices exist in the company.
    async fn ensure_grantable(
        &self,
        company_id: CompanyId,
        role_ids: &[RoleId],
        office_ids: &[OfficeId],
    ) -> AppResult<()> {
        for role_id in role_ids {
            let role = self
                .roles
                .find(*role_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' not found")))?;
            match role.scope() {
                RoleScope::System => {}
                RoleScope::Company(owner) if owner == company_id => {}
                _ => return Err(AppError::CrossCompanyRole(role.name().to_owned())),
            }
        }

        for office_id in office_ids {
            let office = self
                .offices
                .find(*office_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("office '{office_id}' not found")))?;
            if office.company_id() != company_id {
                return Err(AppError::NotFound(format!(
                    "office '{office_id}' not found"
                )));
            }
        }
        Ok(())
    }

    async fn find_company_invite(
        &self,
        company_id: CompanyId,
        invite_id: InviteId,
    ) -> AppResult<Invite> {
        let not_found = || AppError::NotFound(format!("invite '{invite_id}' not found"));
        let invite = self.invites.find(invite_id).await?.ok_or_else(not_found)?;
        if invite.company_id() != company_id {
            return Err(not_found());
        }
        Ok(invite)
    }

    async fn find_by_raw_token(&self, raw_token: &str) -> AppResult<Invite> {
        self.invites
            .find_by_token_hash(&hash_invite_token(raw_token))
            .await?
            .ok_or_else(|| AppError::NotFound("invite not found".to_owned()))
    }

    async fn send_invite_email(&self, invite: &Invite, raw_token: &str) -> AppResult<()> {
        let company = self
            .companies
            .find(invite.company_id())
            .await?
            .ok_or_else(|| AppError::Internal("invite references a missing company".to_owned()))?;
        let company_name = company.name().as_str();

        let link = format!(
            "{}/invites/accept?token={raw_token}",
            self.invite_base_url.trim_end_matches('/')
        );
        let expires = invite.expires_at().format("%B %-d, %Y");

        let subject = format!("You have been invited to join {company_name}");
        let text_body = format!(
            "You have been invited to join {company_name} on Crewdeck.\n\n\
             Accept your invite: {link}\n\n\
             This link expires on {expires}. If you were not expecting this \
             invitation you can ignore this email."
        );
        let html_body = format!(
            "<p>You have been invited to join <strong>{company_name}</strong> on Crewdeck.</p>\
             <p><a href=\"{link}\">Accept your invite</a></p>\
             <p>This link expires on {expires}. If you were not expecting this \
             invitation you can ignore this email.</p>"
        );

        self.email
            .send_email(invite.email().as_str(), &subject, &text_body, Some(&html_body))
            .await
    }

    async fn record(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        invite: &Invite,
    ) -> AppResult<()> {
        self.audit
            .record(AuditEvent {
                company_id: Some(invite.company_id()),
                actor_user_id: Some(actor.user_id()),
                action,
                resource_type: "invite",
                resource_id: Some(invite.id().to_string()),
                detail: serde_json::json!({ "email": invite.email().as_str() }),
            })
            .await
    }
}

/// Generates a cryptographically random invite token and its SHA-256 hash.
///
/// Returns `(raw_token_hex, sha256_hash_hex)`.
fn generate_invite_token() -> AppResult<(String, String)> {
    use std::fmt::Write;

    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to source randomness: {error}")))?;

    let raw_token = bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        });

    let hash = hash_invite_token(&raw_token);
    Ok((raw_token, hash))
}

/// Computes the SHA-256 hash of a token string for storage and lookup.
fn hash_invite_token(raw_token: &str) -> String {
    use std::fmt::Write;

    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    let result = hasher.finalize();

    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

fn default_display_name(email: &EmailAddress) -> String {
    email
        .as_str()
        .split('@')
        .next()
        .unwrap_or(email.as_str())
        .to_owned()
}

#[cfg(test)]
mod tests {
    use crewdeck_domain::EmailAddress;

    use super::{default_display_name, generate_invite_token, hash_invite_token};

    #[test]
    fn tokens_are_unique_and_hex_encoded() {
        let Ok((first_raw, first_hash)) = generate_invite_token() else {
            panic!("token generation should work");
        };
        let Ok((second_raw, _)) = generate_invite_token() else {
            panic!("token generation should work");
        };

        assert_eq!(first_raw.len(), 64);
        assert_eq!(first_hash.len(), 64);
        assert_ne!(first_raw, second_raw);
        assert!(first_raw.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable_and_distinct_from_token() {
        let Ok((raw, hash)) = generate_invite_token() else {
            panic!("token generation should work");
        };
        assert_eq!(hash_invite_token(&raw), hash);
        assert_ne!(raw, hash);
    }

    #[test]
    fn default_display_name_uses_the_local_part() {
        let Ok(email) = EmailAddress::new("field.agent@example.com") else {
            panic!("email should validate");
        };
        assert_eq!(default_display_name(&email), "field.agent");
    }
}
