//! Role definition management.

use std::sync::Arc;

use crewdeck_core::{AccessScope, ActorContext, AppError, AppResult, RoleId};
use crewdeck_domain::{AuditAction, KnownPermission, PermissionSet, Role, RoleScope, copy_slug};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::security_ports::RoleRepository;

/// Fields for a new role.
#[derive(Debug, Clone)]
pub struct CreateRoleInput {
    /// Immutable machine slug, unique within the scope.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Optional description; blank input is stored as none.
    pub description: Option<String>,
    /// Permission patterns the role carries.
    pub permissions: Vec<String>,
    /// Whether the role is auto-granted to newly onboarded users.
    pub is_default: bool,
    /// Ownership scope of the new role.
    pub scope: RoleScope,
}

/// Replacement fields for an existing role; the slug never changes.
#[derive(Debug, Clone)]
pub struct UpdateRoleInput {
    /// Human-readable name.
    pub display_name: String,
    /// Optional description; blank input clears it.
    pub description: Option<String>,
    /// Permission patterns the role carries.
    pub permissions: Vec<String>,
    /// Whether the role is auto-granted to newly onboarded users.
    pub is_default: bool,
}

/// Create, update, delete, and clone role definitions.
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
}

impl RoleService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            roles,
            authorization,
            audit,
        }
    }

    /// Lists the roles visible in the actor's scope.
    pub async fn list(&self, actor: &ActorContext) -> AppResult<Vec<Role>> {
        self.authorization
            .require(actor, KnownPermission::RoleRead)
            .await?;

        match actor.scope() {
            AccessScope::Company(company_id) => self.roles.list_for_company_scope(company_id).await,
            AccessScope::Platform => self.roles.list_for_platform_scope().await,
        }
    }

    /// Fetches one role visible in the actor's scope.
    pub async fn get(&self, actor: &ActorContext, role_id: RoleId) -> AppResult<Role> {
        self.authorization
            .require(actor, KnownPermission::RoleRead)
            .await?;
        self.find_visible_role(actor, role_id).await
    }

    /// Creates a role in the requested scope.
    pub async fn create(&self, actor: &ActorContext, input: CreateRoleInput) -> AppResult<Role> {
        self.authorization
            .require(actor, KnownPermission::RoleCreate)
            .await?;
        ensure_creatable_scope(actor, &input.name, input.scope)?;

        if self
            .roles
            .find_by_name(&input.name, input.scope.company_id())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "a role named '{}' already exists in this scope",
                input.name
            )));
        }

        let role = Role::new(
            RoleId::new(),
            input.name,
            input.display_name,
            input.description,
            input.scope,
            PermissionSet::parse_all(input.permissions)?,
            input.is_default,
        )?;
        self.roles.insert(&role).await?;

        self.record(actor, AuditAction::RoleCreated, &role, serde_json::json!({}))
            .await?;
        Ok(role)
    }

    /// Replaces the mutable fields of a company role.
    ///
    /// System and platform roles are definitionally immutable and fail with
    /// [`AppError::ImmutableRole`].
    pub async fn update(
        &self,
        actor: &ActorContext,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.authorization
            .require(actor, KnownPermission::RoleUpdate)
            .await?;

        let mut role = self.find_visible_role(actor, role_id).await?;
        role.ensure_tenant_mutable()?;

        role.set_display_name(input.display_name)?;
        role.set_description(input.description);
        role.replace_permissions(PermissionSet::parse_all(input.permissions)?)?;
        role.set_is_default(input.is_default);
        self.roles.update(&role).await?;

        self.record(actor, AuditAction::RoleUpdated, &role, serde_json::json!({}))
            .await?;
        Ok(role)
    }

    /// Deletes a company role.
    ///
    /// Without `force` the delete fails with [`AppError::RoleInUse`] while
    /// assignments reference the role. With `force` the assignments are
    /// removed in the same transaction, after checking the actor is not
    /// stripping their own role management access.
    pub async fn delete(&self, actor: &ActorContext, role_id: RoleId, force: bool) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::RoleDelete)
            .await?;

        let role = self.find_visible_role(actor, role_id).await?;
        role.ensure_tenant_mutable()?;

        if force {
            self.authorization
                .ensure_self_retains_role_management(actor, role_id)
                .await?;
        }

        self.roles.delete(&role, force).await?;

        self.record(
            actor,
            AuditAction::RoleDeleted,
            &role,
            serde_json::json!({ "force": force }),
        )
        .await
    }

    /// Clones a role into an editable company role.
    ///
    /// The source may be one of the actor's company roles or a system role;
    /// the copy gets a `-copy` slug disambiguated against taken names.
    pub async fn clone_role(&self, actor: &ActorContext, role_id: RoleId) -> AppResult<Role> {
        self.authorization
            .require(actor, KnownPermission::RoleCreate)
            .await?;
        let company_id = actor.require_company()?;

        let source = self.find_visible_role(actor, role_id).await?;
        let taken = self.roles.taken_slugs(Some(company_id)).await?;

        let clone = Role::new(
            RoleId::new(),
            copy_slug(source.name(), &taken),
            format!("{} (Copy)", source.display_name().as_str()),
            source.description().map(ToOwned::to_owned),
            RoleScope::Company(company_id),
            source.permissions().clone(),
            false,
        )?;
        self.roles.insert(&clone).await?;

        self.record(
            actor,
            AuditAction::RoleCloned,
            &clone,
            serde_json::json!({ "source": source.name() }),
        )
        .await?;
        Ok(clone)
    }

    /// Resolves a role and hides roles outside the actor's scope.
    ///
    /// System roles are visible everywhere; company roles only within their
    /// company and platform roles only at platform scope. Anything else
    /// reads as not found so cross-company probing cannot distinguish
    /// foreign roles from missing ones.
    async fn find_visible_role(&self, actor: &ActorContext, role_id: RoleId) -> AppResult<Role> {
        let not_found = || AppError::NotFound(format!("role '{role_id}' not found"));
        let role = self.roles.find(role_id).await?.ok_or_else(not_found)?;

        match (role.scope(), actor.scope()) {
            (RoleScope::System, _) => Ok(role),
            (RoleScope::Company(owner), AccessScope::Company(active)) if owner == active => {
                Ok(role)
            }
            (RoleScope::Platform, AccessScope::Platform) => Ok(role),
            _ => Err(not_found()),
        }
    }

    async fn record(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        role: &Role,
        mut detail: serde_json::Value,
    ) -> AppResult<()> {
        if let Some(object) = detail.as_object_mut() {
            object.insert("name".to_owned(), serde_json::json!(role.name()));
        }
        self.audit
            .record(AuditEvent {
                company_id: role.scope().company_id().or(actor.scope().company_id()),
                actor_user_id: Some(actor.user_id()),
                action,
                resource_type: "role",
                resource_id: Some(role.id().to_string()),
                detail,
            })
            .await
    }
}

fn ensure_creatable_scope(actor: &ActorContext, name: &str, scope: RoleScope) -> AppResult<()> {
    match (scope, actor.scope()) {
        (RoleScope::Company(target), AccessScope::Company(active)) if target == active => Ok(()),
        (RoleScope::Company(_), AccessScope::Platform) => Ok(()),
        (RoleScope::Company(_), AccessScope::Company(_)) => {
            Err(AppError::CrossCompanyRole(name.to_owned()))
        }
        (RoleScope::System | RoleScope::Platform, AccessScope::Platform) => Ok(()),
        (RoleScope::System | RoleScope::Platform, AccessScope::Company(_)) => {
            Err(AppError::Forbidden(
                "only platform operators may create system or platform roles".to_owned(),
            ))
        }
    }
}
