//! First-run platform bootstrap.
//!
//! Creates the seeded platform administrator role and the first operator
//! account. Guarded at the API layer by a deployment-time bootstrap token
//! and here by a once-only check on existing operator assignments.

use std::sync::Arc;

use chrono::Utc;
use crewdeck_core::{AppError, AppResult, RoleId, UserId};
use crewdeck_domain::{
    AuditAction, EmailAddress, PermissionSet, Role, RoleScope, User, validate_password,
};

use crate::audit::{AuditEvent, AuditRepository};
use crate::security_ports::{RoleAssignment, RoleAssignmentRepository, RoleRepository};
use crate::user_service::{PasswordHasher, UserRepository};

/// Slug of the seeded platform administrator role.
pub const PLATFORM_ADMIN_ROLE: &str = "platform-admin";

/// Credentials and profile for the first platform operator.
#[derive(Debug, Clone)]
pub struct BootstrapParams {
    /// Email address of the operator account.
    pub email: String,
    /// Plaintext password; validated and hashed before storage.
    pub password: String,
    /// Display name of the operator account.
    pub display_name: String,
}

/// Creates the first platform operator.
pub struct BootstrapService {
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
    assignments: Arc<dyn RoleAssignmentRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    audit: Arc<dyn AuditRepository>,
}

impl BootstrapService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        users: Arc<dyn UserRepository>,
        assignments: Arc<dyn RoleAssignmentRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            roles,
            users,
            assignments,
            password_hasher,
            audit,
        }
    }

    /// Creates the platform administrator role (if absent) and the first
    /// operator holding it.
    ///
    /// Fails with [`AppError::Conflict`] once any operator assignment
    /// exists, so the endpoint cannot mint extra operators after first run.
    pub async fn bootstrap(&self, params: BootstrapParams) -> AppResult<User> {
        let email = EmailAddress::new(params.email)?;
        validate_password(&params.password)?;

        let role = match self.roles.find_by_name(PLATFORM_ADMIN_ROLE, None).await? {
            Some(role) => role,
            None => {
                let role = Role::new(
                    RoleId::new(),
                    PLATFORM_ADMIN_ROLE,
                    "Platform Administrator",
                    Some("Full access to platform administration".to_owned()),
                    RoleScope::Platform,
                    PermissionSet::parse_all(["*"])?,
                    false,
                )?;
                self.roles.insert(&role).await?;
                role
            }
        };

        if self.roles.assignment_count(role.id()).await? > 0 {
            return Err(AppError::Conflict(
                "the platform has already been bootstrapped".to_owned(),
            ));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "a user with this email already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let user = User::new(UserId::new(), email, params.display_name, None, now)?;
        let password_hash = self.password_hasher.hash_password(&params.password)?;
        self.users.insert(&user, &password_hash).await?;

        self.assignments
            .insert(&RoleAssignment {
                user_id: user.id(),
                role_id: role.id(),
                company_id: None,
                assigned_by: None,
                assigned_at: now,
            })
            .await?;

        self.audit
            .record(AuditEvent {
                company_id: None,
                actor_user_id: Some(user.id()),
                action: AuditAction::PlatformBootstrapped,
                resource_type: "user",
                resource_id: Some(user.id().to_string()),
                detail: serde_json::json!({ "email": user.email().as_str() }),
            })
            .await?;
        Ok(user)
    }
}
