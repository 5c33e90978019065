//! Permission checks against role assignments in the active scope.
//!
//! The guard is deny-by-default: a permission is granted only when some role
//! assigned to the user within the session's scope carries a pattern that
//! matches it. Company grants never carry over to platform scope or to other
//! companies because the assignment lookup itself is scoped.

use std::sync::Arc;

use crewdeck_core::{AccessScope, ActorContext, AppError, AppResult, RoleId, UserId};
use crewdeck_domain::{KnownPermission, Permission, PermissionSet};

use crate::security_ports::RoleAssignmentRepository;

/// How a list of required permissions combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementMode {
    /// Every listed permission must be granted; an empty list always passes.
    All,
    /// At least one listed permission must be granted; an empty list never
    /// passes.
    Any,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The requirement is satisfied.
    Allowed,
    /// The requirement is not satisfied.
    Denied {
        /// Required permissions the actor's effective set does not grant.
        missing: Vec<Permission>,
    },
}

impl AccessDecision {
    /// Returns true for [`AccessDecision::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Evaluates permission requirements for acting sessions.
#[derive(Clone)]
pub struct AuthorizationService {
    assignments: Arc<dyn RoleAssignmentRepository>,
}

impl AuthorizationService {
    /// Creates the service from the assignment graph.
    #[must_use]
    pub fn new(assignments: Arc<dyn RoleAssignmentRepository>) -> Self {
        Self { assignments }
    }

    /// Computes the union of permissions over the user's roles in one scope.
    pub async fn effective_permissions(
        &self,
        user_id: UserId,
        scope: AccessScope,
    ) -> AppResult<PermissionSet> {
        let roles = self.assignments.roles_for_user(user_id, scope).await?;

        let mut permissions = PermissionSet::new();
        for role in &roles {
            permissions.extend(role.permissions().iter().cloned());
        }
        Ok(permissions)
    }

    /// Evaluates a requirement list without failing on denial.
    pub async fn authorize(
        &self,
        actor: &ActorContext,
        required: &[Permission],
        mode: RequirementMode,
    ) -> AppResult<AccessDecision> {
        let held = self
            .effective_permissions(actor.user_id(), actor.scope())
            .await?;

        let allowed = match mode {
            RequirementMode::All => held.holds_all(required),
            RequirementMode::Any => held.holds_any(required),
        };

        if allowed {
            Ok(AccessDecision::Allowed)
        } else {
            Ok(AccessDecision::Denied {
                missing: held.missing(required),
            })
        }
    }

    /// Fails with [`AppError::Forbidden`] unless one permission is granted.
    pub async fn require(
        &self,
        actor: &ActorContext,
        required: impl Into<Permission>,
    ) -> AppResult<()> {
        let required = required.into();
        self.require_all(actor, std::slice::from_ref(&required))
            .await
    }

    /// Fails with [`AppError::Forbidden`] unless every listed permission is
    /// granted. An empty list always passes.
    pub async fn require_all(
        &self,
        actor: &ActorContext,
        required: &[Permission],
    ) -> AppResult<()> {
        match self.authorize(actor, required, RequirementMode::All).await? {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied { missing } => Err(AppError::Forbidden(format!(
                "missing required permission(s): {}",
                join_permissions(&missing)
            ))),
        }
    }

    /// Fails with [`AppError::Forbidden`] unless at least one listed
    /// permission is granted. An empty list never passes.
    pub async fn require_any(
        &self,
        actor: &ActorContext,
        required: &[Permission],
    ) -> AppResult<()> {
        match self.authorize(actor, required, RequirementMode::Any).await? {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied { .. } => Err(AppError::Forbidden(format!(
                "requires one of: {}",
                join_permissions(required)
            ))),
        }
    }

    /// Fails when removing `role_id` from the actor's own grants would strip
    /// the actor's role management access in the active scope.
    ///
    /// Guards the two self-lockout paths: revoking one's own role and
    /// force-deleting a role one holds.
    pub async fn ensure_self_retains_role_management(
        &self,
        actor: &ActorContext,
        role_id: RoleId,
    ) -> AppResult<()> {
        let roles = self
            .assignments
            .roles_for_user(actor.user_id(), actor.scope())
            .await?;
        if !roles.iter().any(|role| role.id() == role_id) {
            return Ok(());
        }

        let guard: Permission = KnownPermission::RoleAssign.into();
        let current: PermissionSet = roles
            .iter()
            .flat_map(|role| role.permissions().iter().cloned())
            .collect();
        let remaining: PermissionSet = roles
            .iter()
            .filter(|role| role.id() != role_id)
            .flat_map(|role| role.permissions().iter().cloned())
            .collect();

        if current.grants(&guard) && !remaining.grants(&guard) {
            return Err(AppError::Validation(
                "removing this role would revoke your own role management access".to_owned(),
            ));
        }
        Ok(())
    }
}

fn join_permissions(permissions: &[Permission]) -> String {
    if permissions.is_empty() {
        return "(none)".to_owned();
    }
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use crewdeck_core::{
        AccessScope, ActorContext, AppError, AppResult, CompanyId, RoleId, UserId,
    };
    use crewdeck_domain::{Company, Permission, PermissionSet, Role, RoleScope};
    use tokio::sync::RwLock;

    use super::{AccessDecision, AuthorizationService, RequirementMode};
    use crate::security_ports::{RoleAssignment, RoleAssignmentRepository};

    #[derive(Default)]
    struct FakeAssignments {
        roles: RwLock<HashMap<(UserId, AccessScope), Vec<Role>>>,
    }

    impl FakeAssignments {
        async fn grant(&self, user_id: UserId, scope: AccessScope, role: Role) {
            self.roles
                .write()
                .await
                .entry((user_id, scope))
                .or_default()
                .push(role);
        }
    }

    #[async_trait]
    impl RoleAssignmentRepository for FakeAssignments {
        async fn insert(&self, _assignment: &RoleAssignment) -> AppResult<()> {
            Err(AppError::Internal("not used".to_owned()))
        }

        async fn remove(
            &self,
            _user_id: UserId,
            _role_id: RoleId,
            _scope: AccessScope,
        ) -> AppResult<()> {
            Err(AppError::Internal("not used".to_owned()))
        }

        async fn roles_for_user(
            &self,
            user_id: UserId,
            scope: AccessScope,
        ) -> AppResult<Vec<Role>> {
            Ok(self
                .roles
                .read()
                .await
                .get(&(user_id, scope))
                .cloned()
                .unwrap_or_default())
        }

        async fn list_for_user(
            &self,
            _user_id: UserId,
            _scope: AccessScope,
        ) -> AppResult<Vec<RoleAssignment>> {
            Ok(vec![])
        }

        async fn list_for_company(&self, _company_id: CompanyId) -> AppResult<Vec<RoleAssignment>> {
            Ok(vec![])
        }

        async fn companies_for_user(&self, _user_id: UserId) -> AppResult<Vec<Company>> {
            Ok(vec![])
        }
    }

    fn role(name: &str, permissions: &[&str]) -> Role {
        let set = match PermissionSet::parse_all(permissions.iter().copied()) {
            Ok(set) => set,
            Err(error) => panic!("permissions should parse: {error}"),
        };
        let result = Role::new(
            RoleId::new(),
            name,
            name,
            None,
            RoleScope::Company(CompanyId::new()),
            set,
            false,
        );
        match result {
            Ok(role) => role,
            Err(error) => panic!("role should build: {error}"),
        }
    }

    fn permission(value: &str) -> Permission {
        match Permission::parse(value) {
            Ok(permission) => permission,
            Err(error) => panic!("'{value}' should parse: {error}"),
        }
    }

    fn actor(user_id: UserId, scope: AccessScope) -> ActorContext {
        ActorContext::new(user_id, "agent@example.com", "Agent", scope)
    }

    async fn service_with(
        grants: &[(UserId, AccessScope, Role)],
    ) -> (AuthorizationService, Arc<FakeAssignments>) {
        let assignments = Arc::new(FakeAssignments::default());
        for (user_id, scope, role) in grants {
            assignments.grant(*user_id, *scope, role.clone()).await;
        }
        (AuthorizationService::new(assignments.clone()), assignments)
    }

    #[tokio::test]
    async fn permissions_union_over_assigned_roles() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let (service, _) = service_with(&[
            (user_id, scope, role("readers", &["customer:read"])),
            (user_id, scope, role("writers", &["customer:write"])),
        ])
        .await;

        let held = service.effective_permissions(user_id, scope).await;
        let Ok(held) = held else {
            panic!("effective permissions should compute");
        };
        assert!(held.grants(&permission("customer:read")));
        assert!(held.grants(&permission("customer:write")));
        assert!(!held.grants(&permission("customer:delete")));
    }

    #[tokio::test]
    async fn company_grants_do_not_leak_into_platform_scope() {
        let user_id = UserId::new();
        let company_scope = AccessScope::Company(CompanyId::new());
        let (service, _) =
            service_with(&[(user_id, company_scope, role("admins", &["*"]))]).await;

        let actor = actor(user_id, AccessScope::Platform);
        let result = service
            .require(&actor, permission("company:create"))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn company_grants_do_not_leak_into_other_companies() {
        let user_id = UserId::new();
        let home = AccessScope::Company(CompanyId::new());
        let elsewhere = AccessScope::Company(CompanyId::new());
        let (service, _) = service_with(&[(user_id, home, role("admins", &["*"]))]).await;

        let Ok(held) = service.effective_permissions(user_id, elsewhere).await else {
            panic!("effective permissions should compute");
        };
        assert!(held.is_empty());

        let actor = actor(user_id, elsewhere);
        let result = service.require(&actor, permission("customer:read")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn wildcard_role_grants_everything_in_scope() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let (service, _) = service_with(&[(user_id, scope, role("admins", &["*"]))]).await;

        let actor = actor(user_id, scope);
        assert!(service.require(&actor, permission("role:delete")).await.is_ok());
        assert!(service.require(&actor, permission("anything:else")).await.is_ok());
    }

    #[tokio::test]
    async fn empty_require_all_passes_and_empty_require_any_fails() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let (service, _) = service_with(&[]).await;
        let actor = actor(user_id, scope);

        assert!(service.require_all(&actor, &[]).await.is_ok());
        assert!(matches!(
            service.require_any(&actor, &[]).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn denial_reports_the_missing_permissions() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let (service, _) =
            service_with(&[(user_id, scope, role("readers", &["customer:read"]))]).await;
        let actor = actor(user_id, scope);

        let required = [permission("customer:read"), permission("customer:write")];
        let decision = service
            .authorize(&actor, &required, RequirementMode::All)
            .await;
        let Ok(AccessDecision::Denied { missing }) = decision else {
            panic!("decision should be a denial");
        };
        assert_eq!(missing, vec![permission("customer:write")]);

        let any = service
            .authorize(&actor, &required, RequirementMode::Any)
            .await;
        assert_eq!(any.ok(), Some(AccessDecision::Allowed));
    }

    #[tokio::test]
    async fn self_lockout_guard_blocks_last_management_role() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let manager = role("managers", &["role:assign", "role:read"]);
        let manager_id = manager.id();
        let reader = role("readers", &["customer:read"]);
        let reader_id = reader.id();
        let (service, _) =
            service_with(&[(user_id, scope, manager), (user_id, scope, reader)]).await;
        let actor = actor(user_id, scope);

        assert!(matches!(
            service
                .ensure_self_retains_role_management(&actor, manager_id)
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(service
            .ensure_self_retains_role_management(&actor, reader_id)
            .await
            .is_ok());

        // A role the actor does not hold is never a lockout risk.
        assert!(service
            .ensure_self_retains_role_management(&actor, RoleId::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn wildcard_holder_survives_lockout_check() {
        let user_id = UserId::new();
        let scope = AccessScope::Company(CompanyId::new());
        let manager = role("managers", &["role:assign"]);
        let manager_id = manager.id();
        let admin = role("admins", &["role:*"]);
        let (service, _) =
            service_with(&[(user_id, scope, manager), (user_id, scope, admin)]).await;
        let actor = actor(user_id, scope);

        assert!(service
            .ensure_self_retains_role_management(&actor, manager_id)
            .await
            .is_ok());
    }
}
