//! Persistence ports for role definitions and role assignments.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdeck_core::{AccessScope, AppResult, CompanyId, RoleId, UserId};
use crewdeck_domain::{Company, Role};

/// One user-role grant, scoped to a company or to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// User holding the grant.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Company the grant applies in; `None` for platform-role grants.
    pub company_id: Option<CompanyId>,
    /// User who made the grant, when recorded.
    pub assigned_by: Option<UserId>,
    /// When the grant was made.
    pub assigned_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Returns the scope this assignment is evaluated under.
    #[must_use]
    pub fn scope(&self) -> AccessScope {
        match self.company_id {
            Some(company_id) => AccessScope::Company(company_id),
            None => AccessScope::Platform,
        }
    }
}

/// Repository port for role definitions.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a new role.
    async fn insert(&self, role: &Role) -> AppResult<()>;

    /// Persists changes to an existing role.
    async fn update(&self, role: &Role) -> AppResult<()>;

    /// Deletes a role.
    ///
    /// With `force` the delete removes live assignments in the same
    /// transaction; without it a role with assignments fails with
    /// [`crewdeck_core::AppError::RoleInUse`], checked inside the
    /// transaction so concurrent assignment cannot slip past.
    async fn delete(&self, role: &Role, force: bool) -> AppResult<()>;

    /// Finds a role by id.
    async fn find(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by slug within a uniqueness scope (`None` covers system
    /// and platform roles).
    async fn find_by_name(&self, name: &str, company_id: Option<CompanyId>)
    -> AppResult<Option<Role>>;

    /// Counts live assignments referencing the role across all scopes.
    async fn assignment_count(&self, role_id: RoleId) -> AppResult<i64>;

    /// Lists roles visible in a company: its own roles plus system roles.
    async fn list_for_company_scope(&self, company_id: CompanyId) -> AppResult<Vec<Role>>;

    /// Lists roles visible at platform scope: platform and system roles.
    async fn list_for_platform_scope(&self) -> AppResult<Vec<Role>>;

    /// Returns the slugs already in use within a uniqueness scope.
    async fn taken_slugs(&self, company_id: Option<CompanyId>) -> AppResult<HashSet<String>>;
}

/// Repository port for the user-role assignment graph.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Records a grant; granting an already-assigned role is a no-op.
    async fn insert(&self, assignment: &RoleAssignment) -> AppResult<()>;

    /// Removes a grant; revoking an unassigned role is a no-op.
    async fn remove(&self, user_id: UserId, role_id: RoleId, scope: AccessScope) -> AppResult<()>;

    /// Resolves the roles a user holds within one scope.
    async fn roles_for_user(&self, user_id: UserId, scope: AccessScope) -> AppResult<Vec<Role>>;

    /// Lists a user's assignment records within one scope.
    async fn list_for_user(
        &self,
        user_id: UserId,
        scope: AccessScope,
    ) -> AppResult<Vec<RoleAssignment>>;

    /// Lists every assignment made within a company.
    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<RoleAssignment>>;

    /// Lists the companies a user holds at least one role in.
    async fn companies_for_user(&self, user_id: UserId) -> AppResult<Vec<Company>>;
}
