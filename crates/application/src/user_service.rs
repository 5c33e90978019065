//! User lookups, login, and profile updates.

use std::sync::Arc;

use async_trait::async_trait;
use crewdeck_core::{ActorContext, AppError, AppResult, CompanyId, UserId};
use crewdeck_domain::{AuditAction, EmailAddress, KnownPermission, User};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;

/// Port for password hashing and verification.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Repository port for user identities and their credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user with their password hash.
    async fn insert(&self, user: &User, password_hash: &str) -> AppResult<()>;

    /// Persists changes to an existing user.
    async fn update(&self, user: &User) -> AppResult<()>;

    /// Finds a user by id.
    async fn find(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Finds a user by their canonical email address.
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<User>>;

    /// Loads the stored password hash for a user.
    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>>;

    /// Lists users holding at least one role in a company.
    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<User>>;
}

/// User directory and authentication entry point.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
}

impl UserService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            users,
            password_hasher,
            authorization,
            audit,
        }
    }

    /// Verifies credentials and returns the user on success.
    ///
    /// Every failure path returns `Ok(None)` so callers emit one generic
    /// message, and each path costs one hash computation to keep timing
    /// uniform (OWASP authentication guidance).
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let Ok(email) = EmailAddress::new(email) else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(None);
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(None);
        };

        let Some(hash) = self.users.password_hash(user.id()).await? else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(None);
        };

        if self.password_hasher.verify_password(password, &hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Loads a user by id, failing when absent.
    pub async fn find(&self, user_id: UserId) -> AppResult<User> {
        self.users
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' not found")))
    }

    /// Fetches a user profile; reading others requires `user:read`.
    pub async fn get(&self, actor: &ActorContext, user_id: UserId) -> AppResult<User> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::UserRead)
                .await?;
        }
        self.find(user_id).await
    }

    /// Lists the members of the actor's company.
    pub async fn list_for_company(&self, actor: &ActorContext) -> AppResult<Vec<User>> {
        self.authorization
            .require(actor, KnownPermission::UserRead)
            .await?;
        let company_id = actor.require_company()?;
        self.users.list_for_company(company_id).await
    }

    /// Renames a user; renaming others requires `user:update`.
    pub async fn update_display_name(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        display_name: String,
    ) -> AppResult<User> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::UserUpdate)
                .await?;
        }

        let mut user = self.find(user_id).await?;
        user.set_display_name(display_name)?;
        self.users.update(&user).await?;

        self.audit
            .record(AuditEvent {
                company_id: actor.scope().company_id(),
                actor_user_id: Some(actor.user_id()),
                action: AuditAction::UserUpdated,
                resource_type: "user",
                resource_id: Some(user.id().to_string()),
                detail: serde_json::json!({
                    "display_name": user.display_name().as_str(),
                }),
            })
            .await?;
        Ok(user)
    }
}
