//! User-role assignment graph management and projections.

use std::sync::Arc;

use chrono::Utc;
use crewdeck_core::{AccessScope, ActorContext, AppError, AppResult, CompanyId, RoleId, UserId};
use crewdeck_domain::{AuditAction, KnownPermission, PermissionSet, Role, RoleScope};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::security_ports::{RoleAssignment, RoleAssignmentRepository, RoleRepository};
use crate::user_service::UserRepository;

/// Assign and revoke roles, and project the resulting grants.
pub struct AssignmentService {
    assignments: Arc<dyn RoleAssignmentRepository>,
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
}

impl AssignmentService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        assignments: Arc<dyn RoleAssignmentRepository>,
        roles: Arc<dyn RoleRepository>,
        users: Arc<dyn UserRepository>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            assignments,
            roles,
            users,
            authorization,
            audit,
        }
    }

    /// Grants a role to a user in the actor's scope.
    ///
    /// Company sessions may assign their own company's roles and system
    /// roles; platform sessions assign platform roles. Anything else fails
    /// with [`AppError::CrossCompanyRole`]. Re-assigning an already-held
    /// role is a no-op.
    pub async fn assign(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::RoleAssign)
            .await?;

        if self.users.find(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' not found")));
        }
        let role = self
            .roles
            .find(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' not found")))?;
        ensure_assignable(&role, actor.scope())?;

        self.assignments
            .insert(&RoleAssignment {
                user_id,
                role_id,
                company_id: actor.scope().company_id(),
                assigned_by: Some(actor.user_id()),
                assigned_at: Utc::now(),
            })
            .await?;

        self.audit
            .record(AuditEvent {
                company_id: actor.scope().company_id(),
                actor_user_id: Some(actor.user_id()),
                action: AuditAction::RoleAssigned,
                resource_type: "role_assignment",
                resource_id: Some(role_id.to_string()),
                detail: serde_json::json!({
                    "user_id": user_id.to_string(),
                    "role": role.name(),
                }),
            })
            .await
    }

    /// Revokes a role from a user in the actor's scope.
    ///
    /// Revoking an unassigned role is a no-op. Revoking one's own role is
    /// rejected when it would strip the actor's role management access.
    pub async fn revoke(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::RoleAssign)
            .await?;

        if user_id == actor.user_id() {
            self.authorization
                .ensure_self_retains_role_management(actor, role_id)
                .await?;
        }

        self.assignments
            .remove(user_id, role_id, actor.scope())
            .await?;

        self.audit
            .record(AuditEvent {
                company_id: actor.scope().company_id(),
                actor_user_id: Some(actor.user_id()),
                action: AuditAction::RoleRevoked,
                resource_type: "role_assignment",
                resource_id: Some(role_id.to_string()),
                detail: serde_json::json!({ "user_id": user_id.to_string() }),
            })
            .await
    }

    /// Computes a user's effective permissions in the actor's scope.
    ///
    /// Reading another user's permissions requires `user:read`; reading
    /// one's own is always allowed since the guard evaluates the same set
    /// on every request anyway.
    pub async fn effective_permissions(
        &self,
        actor: &ActorContext,
        user_id: UserId,
    ) -> AppResult<PermissionSet> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::UserRead)
                .await?;
        }
        self.authorization
            .effective_permissions(user_id, actor.scope())
            .await
    }

    /// Lists the roles a user holds in the actor's scope.
    pub async fn roles_for_user(
        &self,
        actor: &ActorContext,
        user_id: UserId,
    ) -> AppResult<Vec<Role>> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::RoleRead)
                .await?;
        }
        self.assignments.roles_for_user(user_id, actor.scope()).await
    }

    /// Lists every assignment in the actor's company.
    pub async fn list_for_company(&self, actor: &ActorContext) -> AppResult<Vec<RoleAssignment>> {
        self.authorization
            .require(actor, KnownPermission::RoleRead)
            .await?;
        let company_id = actor.require_company()?;
        self.assignments.list_for_company(company_id).await
    }

    /// Roles auto-granted to users onboarded into a company.
    pub async fn default_roles_for(&self, company_id: CompanyId) -> AppResult<Vec<Role>> {
        let roles = self.roles.list_for_company_scope(company_id).await?;
        Ok(roles.into_iter().filter(Role::is_default).collect())
    }

    /// Companies a user holds at least one role in.
    ///
    /// Session-internal: callers only pass the session's own user id, for
    /// login and the company switcher.
    pub async fn companies_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<crewdeck_domain::Company>> {
        self.assignments.companies_for_user(user_id).await
    }
}

fn ensure_assignable(role: &Role, scope: AccessScope) -> AppResult<()> {
    match (role.scope(), scope) {
        (RoleScope::System, AccessScope::Company(_)) => Ok(()),
        (RoleScope::Company(owner), AccessScope::Company(active)) if owner == active => Ok(()),
        (RoleScope::Platform, AccessScope::Platform) => Ok(()),
        _ => Err(AppError::CrossCompanyRole(role.name().to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use crewdeck_core::{AccessScope, CompanyId, RoleId};
    use crewdeck_domain::{PermissionSet, Role, RoleScope};

    use super::ensure_assignable;

    fn role(scope: RoleScope) -> Role {
        let set = match PermissionSet::parse_all(["customer:read"]) {
            Ok(set) => set,
            Err(error) => panic!("permissions should parse: {error}"),
        };
        match Role::new(RoleId::new(), "sales-agent", "Sales Agent", None, scope, set, false) {
            Ok(role) => role,
            Err(error) => panic!("role should build: {error}"),
        }
    }

    #[test]
    fn system_roles_are_assignable_in_any_company() {
        let company = AccessScope::Company(CompanyId::new());
        assert!(ensure_assignable(&role(RoleScope::System), company).is_ok());
        assert!(ensure_assignable(&role(RoleScope::System), AccessScope::Platform).is_err());
    }

    #[test]
    fn company_roles_are_pinned_to_their_company() {
        let company_id = CompanyId::new();
        let owned = role(RoleScope::Company(company_id));

        assert!(ensure_assignable(&owned, AccessScope::Company(company_id)).is_ok());
        assert!(ensure_assignable(&owned, AccessScope::Company(CompanyId::new())).is_err());
        assert!(ensure_assignable(&owned, AccessScope::Platform).is_err());
    }

    #[test]
    fn platform_roles_only_assign_at_platform_scope() {
        let platform = role(RoleScope::Platform);
        assert!(ensure_assignable(&platform, AccessScope::Platform).is_ok());
        assert!(
            ensure_assignable(&platform, AccessScope::Company(CompanyId::new())).is_err()
        );
    }
}
