//! In-memory adapter implementing every repository port.
//!
//! Backs service-level tests and local experiments without a database. The
//! multi-row invariants (one live pending invite, atomic acceptance, the
//! in-use check on role deletion) hold under one store-wide lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crewdeck_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditRepository, CompanyRepository,
    InviteAcceptance, InviteRepository, OfficeAccess, OfficeAccessRepository, OfficeRepository,
    RoleAssignment, RoleAssignmentRepository, RoleRepository, UserRepository,
};
use crewdeck_core::{
    AccessScope, AppError, AppResult, CompanyId, InviteId, OfficeId, RoleId, UserId,
};
use crewdeck_domain::{Company, EmailAddress, Invite, InviteStatus, Office, Role, User};

#[derive(Default)]
struct State {
    companies: HashMap<CompanyId, Company>,
    offices: HashMap<OfficeId, Office>,
    users: HashMap<UserId, User>,
    password_hashes: HashMap<UserId, String>,
    roles: HashMap<RoleId, Role>,
    assignments: Vec<RoleAssignment>,
    office_access: Vec<OfficeAccess>,
    invites: HashMap<InviteId, Invite>,
    audit: Vec<AuditLogEntry>,
}

/// One store implementing all repository ports over shared in-memory state.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        let uniqueness_scope = role.scope().company_id();
        if state.roles.values().any(|existing| {
            existing.name() == role.name() && existing.scope().company_id() == uniqueness_scope
        }) {
            return Err(AppError::Conflict(format!(
                "a role named '{}' already exists in this scope",
                role.name()
            )));
        }
        state.roles.insert(role.id(), role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.roles.insert(role.id(), role.clone());
        Ok(())
    }

    async fn delete(&self, role: &Role, force: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let assignment_count = state
            .assignments
            .iter()
            .filter(|assignment| assignment.role_id == role.id())
            .count() as i64;

        if assignment_count > 0 && !force {
            return Err(AppError::RoleInUse {
                role: role.name().to_owned(),
                assignment_count,
            });
        }

        state
            .assignments
            .retain(|assignment| assignment.role_id != role.id());
        state.roles.remove(&role.id());
        Ok(())
    }

    async fn find(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.get(&role_id).cloned())
    }

    async fn find_by_name(
        &self,
        name: &str,
        company_id: Option<CompanyId>,
    ) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .find(|role| role.name() == name && role.scope().company_id() == company_id)
            .cloned())
    }

    async fn assignment_count(&self, role_id: RoleId) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| assignment.role_id == role_id)
            .count() as i64)
    }

    async fn list_for_company_scope(&self, company_id: CompanyId) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| {
                role.scope().company_id() == Some(company_id)
                    || role.scope().kind_str() == "system"
            })
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(roles)
    }

    async fn list_for_platform_scope(&self) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| role.scope().company_id().is_none())
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(roles)
    }

    async fn taken_slugs(&self, company_id: Option<CompanyId>) -> AppResult<HashSet<String>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .filter(|role| role.scope().company_id() == company_id)
            .map(|role| role.name().to_owned())
            .collect())
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryStore {
    async fn insert(&self, assignment: &RoleAssignment) -> AppResult<()> {
        let mut state = self.state.write().await;
        let exists = state.assignments.iter().any(|existing| {
            existing.user_id == assignment.user_id
                && existing.role_id == assignment.role_id
                && existing.company_id == assignment.company_id
        });
        if !exists {
            state.assignments.push(assignment.clone());
        }
        Ok(())
    }

    async fn remove(&self, user_id: UserId, role_id: RoleId, scope: AccessScope) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.assignments.retain(|assignment| {
            !(assignment.user_id == user_id
                && assignment.role_id == role_id
                && assignment.company_id == scope.company_id())
        });
        Ok(())
    }

    async fn roles_for_user(&self, user_id: UserId, scope: AccessScope) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.user_id == user_id && assignment.company_id == scope.company_id()
            })
            .filter_map(|assignment| state.roles.get(&assignment.role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(roles)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        scope: AccessScope,
    ) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.user_id == user_id && assignment.company_id == scope.company_id()
            })
            .cloned()
            .collect())
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| assignment.company_id == Some(company_id))
            .cloned()
            .collect())
    }

    async fn companies_for_user(&self, user_id: UserId) -> AppResult<Vec<Company>> {
        let state = self.state.read().await;
        let company_ids: HashSet<CompanyId> = state
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .filter_map(|assignment| assignment.company_id)
            .collect();

        let mut companies: Vec<Company> = company_ids
            .into_iter()
            .filter_map(|company_id| state.companies.get(&company_id).cloned())
            .collect();
        companies.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(companies)
    }
}

#[async_trait]
impl CompanyRepository for InMemoryStore {
    async fn insert(&self, company: &Company) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.companies.insert(company.id(), company.clone());
        Ok(())
    }

    async fn update(&self, company: &Company) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.companies.insert(company.id(), company.clone());
        Ok(())
    }

    async fn find(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let state = self.state.read().await;
        Ok(state.companies.get(&company_id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Company>> {
        let state = self.state.read().await;
        let mut companies: Vec<Company> = state.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(companies)
    }
}

#[async_trait]
impl OfficeRepository for InMemoryStore {
    async fn insert(&self, office: &Office) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.offices.insert(office.id(), office.clone());
        Ok(())
    }

    async fn update(&self, office: &Office) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.offices.insert(office.id(), office.clone());
        Ok(())
    }

    async fn delete_with_access(&self, office_id: OfficeId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .office_access
            .retain(|access| access.office_id != office_id);
        for user in state.users.values_mut() {
            if user.current_office_id() == Some(office_id) {
                user.set_current_office(None);
            }
        }
        state.offices.remove(&office_id);
        Ok(())
    }

    async fn find(&self, office_id: OfficeId) -> AppResult<Option<Office>> {
        let state = self.state.read().await;
        Ok(state.offices.get(&office_id).cloned())
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Office>> {
        let state = self.state.read().await;
        let mut offices: Vec<Office> = state
            .offices
            .values()
            .filter(|office| office.company_id() == company_id)
            .cloned()
            .collect();
        offices.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(offices)
    }
}

#[async_trait]
impl OfficeAccessRepository for InMemoryStore {
    async fn grant(&self, access: &OfficeAccess) -> AppResult<()> {
        let mut state = self.state.write().await;
        let exists = state.office_access.iter().any(|existing| {
            existing.user_id == access.user_id && existing.office_id == access.office_id
        });
        if !exists {
            state.office_access.push(access.clone());
        }
        Ok(())
    }

    async fn revoke_and_clear_current(
        &self,
        user_id: UserId,
        office_id: OfficeId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .office_access
            .retain(|access| !(access.user_id == user_id && access.office_id == office_id));
        if let Some(user) = state.users.get_mut(&user_id)
            && user.current_office_id() == Some(office_id)
        {
            user.set_current_office(None);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Office>> {
        let state = self.state.read().await;
        let mut offices: Vec<Office> = state
            .office_access
            .iter()
            .filter(|access| access.user_id == user_id)
            .filter_map(|access| state.offices.get(&access.office_id).cloned())
            .collect();
        offices.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(offices)
    }

    async fn has_access(&self, user_id: UserId, office_id: OfficeId) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .office_access
            .iter()
            .any(|access| access.user_id == user_id && access.office_id == office_id))
    }

    async fn set_current_office(
        &self,
        user_id: UserId,
        office_id: Option<OfficeId>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.set_current_office(office_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &User, password_hash: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|existing| existing.email() == user.email())
        {
            return Err(AppError::Conflict(
                "a user with this email address already exists".to_owned(),
            ));
        }
        state.users.insert(user.id(), user.clone());
        state
            .password_hashes
            .insert(user.id(), password_hash.to_owned());
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.email() == email)
            .cloned())
    }

    async fn password_hash(&self, user_id: UserId) -> AppResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state.password_hashes.get(&user_id).cloned())
    }

    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        let member_ids: HashSet<UserId> = state
            .assignments
            .iter()
            .filter(|assignment| assignment.company_id == Some(company_id))
            .map(|assignment| assignment.user_id)
            .collect();

        let mut users: Vec<User> = member_ids
            .into_iter()
            .filter_map(|user_id| state.users.get(&user_id).cloned())
            .collect();
        users.sort_by(|a, b| a.display_name().as_str().cmp(b.display_name().as_str()));
        Ok(users)
    }
}

#[async_trait]
impl InviteRepository for InMemoryStore {
    async fn insert_pending(&self, invite: &Invite, now: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .invites
            .values()
            .find(|candidate| {
                candidate.company_id() == invite.company_id()
                    && candidate.email() == invite.email()
                    && candidate.status() == InviteStatus::Pending
            })
            .map(|candidate| (candidate.id(), candidate.expires_at()));

        if let Some((existing_invite_id, expires_at)) = existing {
            if now <= expires_at {
                return Err(AppError::DuplicateInvite { existing_invite_id });
            }
            if let Some(stale) = state.invites.get_mut(&existing_invite_id) {
                stale.mark_superseded()?;
            }
        }

        state.invites.insert(invite.id(), invite.clone());
        Ok(())
    }

    async fn update(&self, invite: &Invite) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.invites.insert(invite.id(), invite.clone());
        Ok(())
    }

    async fn find(&self, invite_id: InviteId) -> AppResult<Option<Invite>> {
        let state = self.state.read().await;
        Ok(state.invites.get(&invite_id).cloned())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invite>> {
        let state = self.state.read().await;
        Ok(state
            .invites
            .values()
            .find(|invite| invite.token_hash() == token_hash)
            .cloned())
    }

    async fn list_pending_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Invite>> {
        let state = self.state.read().await;
        let mut invites: Vec<Invite> = state
            .invites
            .values()
            .filter(|invite| {
                invite.company_id() == company_id && invite.status() == InviteStatus::Pending
            })
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(invites)
    }

    async fn accept(&self, acceptance: &InviteAcceptance) -> AppResult<()> {
        let mut state = self.state.write().await;

        let still_pending = state
            .invites
            .get(&acceptance.invite.id())
            .is_some_and(|stored| stored.status() == InviteStatus::Pending);
        if !still_pending {
            return Err(AppError::InviteConsumed);
        }

        if let Some(new_user) = &acceptance.new_user {
            if state
                .users
                .values()
                .any(|existing| existing.email() == new_user.user.email())
            {
                return Err(AppError::Conflict(
                    "a user with this email address already exists".to_owned(),
                ));
            }
            state.users.insert(new_user.user.id(), new_user.user.clone());
            state
                .password_hashes
                .insert(new_user.user.id(), new_user.password_hash.clone());
        }

        for grant in &acceptance.office_grants {
            let exists = state.office_access.iter().any(|existing| {
                existing.user_id == grant.user_id && existing.office_id == grant.office_id
            });
            if !exists {
                state.office_access.push(grant.clone());
            }
        }

        for assignment in &acceptance.role_assignments {
            let exists = state.assignments.iter().any(|existing| {
                existing.user_id == assignment.user_id
                    && existing.role_id == assignment.role_id
                    && existing.company_id == assignment.company_id
            });
            if !exists {
                state.assignments.push(assignment.clone());
            }
        }

        if let Some(user) = state.users.get_mut(&acceptance.user_id) {
            user.set_current_office(Some(acceptance.current_office_id));
        }

        state
            .invites
            .insert(acceptance.invite.id(), acceptance.invite.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.audit.push(AuditLogEntry {
            id: uuid::Uuid::new_v4(),
            company_id: event.company_id,
            actor_user_id: event.actor_user_id,
            action: event.action.as_str().to_owned(),
            resource_type: event.resource_type.to_owned(),
            resource_id: event.resource_id,
            detail: event.detail,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let state = self.state.read().await;
        let limit = query.limit.unwrap_or(100).clamp(1, 500) as usize;

        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|entry| {
                query
                    .company_id
                    .is_none_or(|company_id| entry.company_id == Some(company_id))
            })
            .filter(|entry| {
                query
                    .action
                    .as_deref()
                    .is_none_or(|action| entry.action == action)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use tokio::sync::Mutex;

    use crewdeck_application::{
        AcceptInviteParams, AssignmentService, AuditService, AuthorizationService,
        BootstrapParams, BootstrapService, CompanyRepository, CreateInviteParams,
        CreateRoleInput, EmailService, InviteRepository, InviteService, OfficeRepository,
        OfficeService, PasswordHasher, RoleAssignment, RoleAssignmentRepository, RoleRepository,
        RoleService, UserRepository, UserService,
    };
    use crewdeck_core::{
        AccessScope, ActorContext, AppError, AppResult, CompanyId, InviteId, OfficeId, RoleId,
        UserId,
    };
    use crewdeck_domain::{
        Company, EmailAddress, Invite, InviteStatus, Office, Permission, PermissionSet, Role,
        RoleScope, User,
    };

    use super::InMemoryStore;

    fn permission(value: &str) -> Permission {
        match Permission::parse(value) {
            Ok(parsed) => parsed,
            Err(error) => panic!("'{value}' should parse: {error}"),
        }
    }

    struct FakeHasher;

    impl PasswordHasher for FakeHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait::async_trait]
    impl EmailService for RecordingMailer {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            text_body: &str,
            _html_body: Option<&str>,
        ) -> AppResult<()> {
            self.sent
                .lock()
                .await
                .push((to.to_owned(), subject.to_owned(), text_body.to_owned()));
            Ok(())
        }
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        mailer: Arc<RecordingMailer>,
        authorization: AuthorizationService,
        roles: RoleService,
        assignments: AssignmentService,
        offices: OfficeService,
        invites: InviteService,
        users: UserService,
        bootstrap: BootstrapService,
        audit: AuditService,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let hasher = Arc::new(FakeHasher);
        let authorization = AuthorizationService::new(store.clone());

        Harness {
            roles: RoleService::new(store.clone(), authorization.clone(), store.clone()),
            assignments: AssignmentService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                authorization.clone(),
                store.clone(),
            ),
            offices: OfficeService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                authorization.clone(),
                store.clone(),
            ),
            invites: InviteService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                authorization.clone(),
                store.clone(),
                mailer.clone(),
                hasher.clone(),
                "https://app.example.com".to_owned(),
            ),
            users: UserService::new(
                store.clone(),
                hasher.clone(),
                authorization.clone(),
                store.clone(),
            ),
            bootstrap: BootstrapService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                hasher,
                store.clone(),
            ),
            audit: AuditService::new(store.clone(), authorization.clone()),
            authorization,
            store,
            mailer,
        }
    }

    fn permissions(values: &[&str]) -> PermissionSet {
        match PermissionSet::parse_all(values.iter().copied()) {
            Ok(set) => set,
            Err(error) => panic!("permissions should parse: {error}"),
        }
    }

    fn email(value: &str) -> EmailAddress {
        match EmailAddress::new(value) {
            Ok(parsed) => parsed,
            Err(error) => panic!("'{value}' should validate: {error}"),
        }
    }

    fn extract_token(body: &str) -> String {
        let Some(index) = body.find("token=") else {
            panic!("email should contain an accept link");
        };
        body[index + "token=".len()..].chars().take(64).collect()
    }

    impl Harness {
        async fn seed_company(&self, name: &str) -> Company {
            let Ok(company) = Company::new(CompanyId::new(), name, Utc::now()) else {
                panic!("company should build");
            };
            let Ok(()) = CompanyRepository::insert(self.store.as_ref(), &company).await else {
                panic!("company should insert");
            };
            company
        }

        async fn seed_office(&self, company: &Company, name: &str) -> Office {
            let Ok(office) = Office::new(OfficeId::new(), company.id(), name) else {
                panic!("office should build");
            };
            let Ok(()) = OfficeRepository::insert(self.store.as_ref(), &office).await else {
                panic!("office should insert");
            };
            office
        }

        async fn seed_role(
            &self,
            company: &Company,
            name: &str,
            grants: &[&str],
            is_default: bool,
        ) -> Role {
            let Ok(role) = Role::new(
                RoleId::new(),
                name,
                name,
                None,
                RoleScope::Company(company.id()),
                permissions(grants),
                is_default,
            ) else {
                panic!("role should build");
            };
            let Ok(()) = RoleRepository::insert(self.store.as_ref(), &role).await else {
                panic!("role should insert");
            };
            role
        }

        async fn seed_member(
            &self,
            company: &Company,
            address: &str,
            role: &Role,
        ) -> (User, ActorContext) {
            let Ok(user) = User::new(UserId::new(), email(address), address, None, Utc::now())
            else {
                panic!("user should build");
            };
            let Ok(()) = UserRepository::insert(self.store.as_ref(), &user, "hashed:pw").await
            else {
                panic!("user should insert");
            };
            let Ok(()) = RoleAssignmentRepository::insert(
                self.store.as_ref(),
                &RoleAssignment {
                    user_id: user.id(),
                    role_id: role.id(),
                    company_id: Some(company.id()),
                    assigned_by: None,
                    assigned_at: Utc::now(),
                },
            )
            .await
            else {
                panic!("assignment should insert");
            };

            let actor = ActorContext::new(
                user.id(),
                user.email().as_str(),
                user.display_name().as_str(),
                AccessScope::Company(company.id()),
            );
            (user, actor)
        }

        async fn seed_admin(&self, company: &Company) -> (User, ActorContext) {
            let admin_role = self.seed_role(company, "administrator", &["*"], false).await;
            self.seed_member(company, "admin@example.com", &admin_role)
                .await
        }
    }

    #[tokio::test]
    async fn bootstrap_is_single_use() {
        let harness = harness();

        let Ok(operator) = harness
            .bootstrap
            .bootstrap(BootstrapParams {
                email: "operator@example.com".to_owned(),
                password: "a-reasonable-passphrase".to_owned(),
                display_name: "Operator".to_owned(),
            })
            .await
        else {
            panic!("bootstrap should work");
        };

        let actor = ActorContext::new(
            operator.id(),
            operator.email().as_str(),
            operator.display_name().as_str(),
            AccessScope::Platform,
        );
        assert!(
            harness
                .authorization
                .require(&actor, permission("company:create"))
                .await
                .is_ok()
        );

        let second = harness
            .bootstrap
            .bootstrap(BootstrapParams {
                email: "second@example.com".to_owned(),
                password: "a-reasonable-passphrase".to_owned(),
                display_name: "Second".to_owned(),
            })
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn invite_lifecycle_onboards_a_new_user() {
        let harness = harness();
        let company = harness.seed_company("Acme Field Services").await;
        let headquarters = harness.seed_office(&company, "Headquarters").await;
        let branch = harness.seed_office(&company, "Branch").await;
        let (_, admin) = harness.seed_admin(&company).await;
        let agent_role = harness
            .seed_role(&company, "sales-agent", &["customer:read"], false)
            .await;
        harness
            .seed_role(&company, "staff", &["office:read"], true)
            .await;

        let Ok(invite) = harness
            .invites
            .create(
                &admin,
                CreateInviteParams {
                    email: "new.hire@example.com".to_owned(),
                    role_ids: vec![agent_role.id()],
                    current_office_id: headquarters.id(),
                    allowed_office_ids: vec![headquarters.id(), branch.id()],
                },
            )
            .await
        else {
            panic!("invite should be created");
        };

        // A second invite for the same address reports the live one.
        let duplicate = harness
            .invites
            .create(
                &admin,
                CreateInviteParams {
                    email: "New.Hire@example.com".to_owned(),
                    role_ids: vec![],
                    current_office_id: headquarters.id(),
                    allowed_office_ids: vec![headquarters.id()],
                },
            )
            .await;
        match duplicate {
            Err(AppError::DuplicateInvite { existing_invite_id }) => {
                assert_eq!(existing_invite_id, invite.id());
            }
            other => panic!("expected duplicate invite, got {other:?}"),
        }

        let sent = harness.mailer.sent.lock().await.clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "new.hire@example.com");
        let token = extract_token(&sent[0].2);

        let Ok(preview) = harness.invites.preview(&token).await else {
            panic!("preview should resolve");
        };
        assert_eq!(preview.company_name, "Acme Field Services");
        assert!(preview.requires_password);

        let Ok(accepted) = harness
            .invites
            .accept(AcceptInviteParams {
                token: token.clone(),
                password: Some("a-reasonable-passphrase".to_owned()),
                display_name: Some("New Hire".to_owned()),
            })
            .await
        else {
            panic!("acceptance should work");
        };
        assert_eq!(accepted.company_id, company.id());
        assert_eq!(accepted.current_office_id, headquarters.id());

        // Invite roles plus the company's default roles.
        let member = ActorContext::new(
            accepted.user_id,
            &accepted.email,
            &accepted.display_name,
            AccessScope::Company(company.id()),
        );
        let Ok(effective) = harness
            .assignments
            .effective_permissions(&member, accepted.user_id)
            .await
        else {
            panic!("permissions should resolve");
        };
        assert!(effective.grants(&permission("customer:read")));
        assert!(effective.grants(&permission("office:read")));

        let Ok(allowed) = harness
            .offices
            .offices_for_user(&member, accepted.user_id)
            .await
        else {
            panic!("offices should list");
        };
        assert_eq!(allowed.len(), 2);

        let Ok(login) = harness
            .users
            .login("new.hire@example.com", "a-reasonable-passphrase")
            .await
        else {
            panic!("login should not error");
        };
        assert_eq!(login.map(|user| user.id()), Some(accepted.user_id));

        // The token is single-use.
        let replay = harness
            .invites
            .accept(AcceptInviteParams {
                token,
                password: Some("a-reasonable-passphrase".to_owned()),
                display_name: None,
            })
            .await;
        assert!(matches!(replay, Err(AppError::InviteConsumed)));
    }

    #[tokio::test]
    async fn inviting_a_registered_user_grants_a_second_company_membership() {
        let harness = harness();
        let first = harness.seed_company("First").await;
        let agent_role = harness
            .seed_role(&first, "sales-agent", &["customer:read"], false)
            .await;
        let (veteran, _) = harness
            .seed_member(&first, "veteran@example.com", &agent_role)
            .await;

        let second = harness.seed_company("Second").await;
        let second_office = harness.seed_office(&second, "Second HQ").await;
        let (_, second_admin) = harness.seed_admin(&second).await;
        let dispatcher_role = harness
            .seed_role(&second, "dispatcher", &["job:read"], false)
            .await;

        let Ok(invite) = harness
            .invites
            .create(
                &second_admin,
                CreateInviteParams {
                    email: "veteran@example.com".to_owned(),
                    role_ids: vec![dispatcher_role.id()],
                    current_office_id: second_office.id(),
                    allowed_office_ids: vec![second_office.id()],
                },
            )
            .await
        else {
            panic!("invite should be created");
        };
        assert!(invite.is_existing_user_invite());

        let sent = harness.mailer.sent.lock().await.clone();
        assert_eq!(sent.len(), 1);
        let token = extract_token(&sent[0].2);

        // The landing page must not ask a known identity for a password.
        let Ok(preview) = harness.invites.preview(&token).await else {
            panic!("preview should resolve");
        };
        assert!(!preview.requires_password);

        let Ok(accepted) = harness
            .invites
            .accept(AcceptInviteParams {
                token,
                password: None,
                display_name: None,
            })
            .await
        else {
            panic!("acceptance should work");
        };
        assert_eq!(accepted.user_id, veteran.id());
        assert_eq!(accepted.company_id, second.id());

        // One identity, two separately scoped memberships.
        let Ok(memberships) = harness.assignments.companies_for_user(veteran.id()).await
        else {
            panic!("memberships should list");
        };
        assert_eq!(memberships.len(), 2);

        let Ok(in_first) = harness
            .authorization
            .effective_permissions(veteran.id(), AccessScope::Company(first.id()))
            .await
        else {
            panic!("permissions should resolve");
        };
        assert!(in_first.grants(&permission("customer:read")));
        assert!(!in_first.grants(&permission("job:read")));

        let Ok(in_second) = harness
            .authorization
            .effective_permissions(veteran.id(), AccessScope::Company(second.id()))
            .await
        else {
            panic!("permissions should resolve");
        };
        assert!(in_second.grants(&permission("job:read")));
        assert!(!in_second.grants(&permission("customer:read")));
    }

    #[tokio::test]
    async fn assigning_a_role_twice_is_a_no_op() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let (_, admin) = harness.seed_admin(&company).await;
        let staff_role = harness
            .seed_role(&company, "staff", &["office:read"], false)
            .await;
        let (member, _) = harness
            .seed_member(&company, "staff@example.com", &staff_role)
            .await;
        let dispatcher_role = harness
            .seed_role(&company, "dispatcher", &["job:read"], false)
            .await;

        let Ok(()) = harness
            .assignments
            .assign(&admin, member.id(), dispatcher_role.id())
            .await
        else {
            panic!("assign should work");
        };
        let Ok(()) = harness
            .assignments
            .assign(&admin, member.id(), dispatcher_role.id())
            .await
        else {
            panic!("re-assign should be a no-op");
        };

        let Ok(roles) = harness.assignments.roles_for_user(&admin, member.id()).await else {
            panic!("roles should list");
        };
        assert_eq!(
            roles
                .iter()
                .filter(|role| role.id() == dispatcher_role.id())
                .count(),
            1
        );

        let Ok(effective) = harness
            .assignments
            .effective_permissions(&admin, member.id())
            .await
        else {
            panic!("permissions should resolve");
        };
        assert!(effective.grants(&permission("job:read")));
        assert!(effective.grants(&permission("office:read")));
    }

    #[tokio::test]
    async fn assign_rejects_dangling_and_foreign_references() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let (_, admin) = harness.seed_admin(&company).await;
        let staff_role = harness
            .seed_role(&company, "staff", &["office:read"], false)
            .await;
        let (member, _) = harness
            .seed_member(&company, "staff@example.com", &staff_role)
            .await;

        let other = harness.seed_company("Other").await;
        let foreign_role = harness
            .seed_role(&other, "dispatcher", &["job:read"], false)
            .await;

        let dangling_user = harness
            .assignments
            .assign(&admin, UserId::new(), staff_role.id())
            .await;
        assert!(matches!(dangling_user, Err(AppError::NotFound(_))));

        let dangling_role = harness
            .assignments
            .assign(&admin, member.id(), RoleId::new())
            .await;
        assert!(matches!(dangling_role, Err(AppError::NotFound(_))));

        let foreign = harness
            .assignments
            .assign(&admin, member.id(), foreign_role.id())
            .await;
        assert!(matches!(foreign, Err(AppError::CrossCompanyRole(_))));

        let Ok(elsewhere) = harness
            .authorization
            .effective_permissions(member.id(), AccessScope::Company(other.id()))
            .await
        else {
            panic!("permissions should resolve");
        };
        assert!(elsewhere.is_empty());
    }

    #[tokio::test]
    async fn update_and_resend_rotates_the_token() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let office = harness.seed_office(&company, "Headquarters").await;
        let (_, admin) = harness.seed_admin(&company).await;

        let params = CreateInviteParams {
            email: "hire@example.com".to_owned(),
            role_ids: vec![],
            current_office_id: office.id(),
            allowed_office_ids: vec![office.id()],
        };
        let Ok(invite) = harness.invites.create(&admin, params.clone()).await else {
            panic!("invite should be created");
        };

        let changed_email = harness
            .invites
            .update_and_resend(
                &admin,
                invite.id(),
                CreateInviteParams {
                    email: "someone.else@example.com".to_owned(),
                    ..params.clone()
                },
            )
            .await;
        assert!(matches!(changed_email, Err(AppError::Validation(_))));

        let Ok(reissued) = harness
            .invites
            .update_and_resend(&admin, invite.id(), params)
            .await
        else {
            panic!("resend should work");
        };
        assert_eq!(reissued.id(), invite.id());
        assert_ne!(reissued.token_hash(), invite.token_hash());

        let sent = harness.mailer.sent.lock().await.clone();
        assert_eq!(sent.len(), 2);
        let old_token = extract_token(&sent[0].2);
        let new_token = extract_token(&sent[1].2);
        assert_ne!(old_token, new_token);

        assert!(matches!(
            harness.invites.preview(&old_token).await,
            Err(AppError::NotFound(_))
        ));
        assert!(harness.invites.preview(&new_token).await.is_ok());
    }

    #[tokio::test]
    async fn a_new_invite_supersedes_an_expired_pending_one() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let office = harness.seed_office(&company, "Headquarters").await;
        let (_, admin) = harness.seed_admin(&company).await;

        let Ok(expired) = Invite::new(
            InviteId::new(),
            company.id(),
            email("hire@example.com"),
            vec![],
            office.id(),
            vec![office.id()],
            "a".repeat(64),
            Utc::now() - Duration::days(1),
            None,
            false,
            Utc::now() - Duration::days(8),
        ) else {
            panic!("invite should build");
        };
        let Ok(()) = InviteRepository::insert_pending(
            harness.store.as_ref(),
            &expired,
            Utc::now() - Duration::days(8),
        )
        .await
        else {
            panic!("seed insert should work");
        };

        let Ok(fresh) = harness
            .invites
            .create(
                &admin,
                CreateInviteParams {
                    email: "hire@example.com".to_owned(),
                    role_ids: vec![],
                    current_office_id: office.id(),
                    allowed_office_ids: vec![office.id()],
                },
            )
            .await
        else {
            panic!("fresh invite should be created");
        };
        assert_ne!(fresh.id(), expired.id());

        let Ok(Some(stale)) = InviteRepository::find(harness.store.as_ref(), expired.id()).await
        else {
            panic!("stale invite should load");
        };
        assert_eq!(stale.status(), InviteStatus::Superseded);
    }

    #[tokio::test]
    async fn force_deleting_a_role_cascades_its_assignments() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let (_, admin) = harness.seed_admin(&company).await;
        let agent_role = harness
            .seed_role(&company, "sales-agent", &["customer:read"], false)
            .await;
        let (member, _) = harness
            .seed_member(&company, "agent@example.com", &agent_role)
            .await;

        let blocked = harness.roles.delete(&admin, agent_role.id(), false).await;
        assert!(matches!(
            blocked,
            Err(AppError::RoleInUse {
                assignment_count: 1,
                ..
            })
        ));

        let Ok(()) = harness.roles.delete(&admin, agent_role.id(), true).await else {
            panic!("forced delete should work");
        };

        let Ok(roles) = harness
            .store
            .roles_for_user(member.id(), AccessScope::Company(company.id()))
            .await
        else {
            panic!("roles should list");
        };
        assert!(roles.is_empty());
        assert!(matches!(
            harness.roles.get(&admin, agent_role.id()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn revoking_office_access_clears_the_current_pointer() {
        let harness = harness();
        let company = harness.seed_company("Acme").await;
        let office = harness.seed_office(&company, "Headquarters").await;
        let (_, admin) = harness.seed_admin(&company).await;
        let staff_role = harness
            .seed_role(&company, "staff", &["office:read"], false)
            .await;
        let (member, member_actor) = harness
            .seed_member(&company, "staff@example.com", &staff_role)
            .await;

        let Ok(()) = harness
            .offices
            .grant_access(&admin, member.id(), office.id())
            .await
        else {
            panic!("grant should work");
        };
        let Ok(()) = harness
            .offices
            .set_current_office(&member_actor, member.id(), Some(office.id()))
            .await
        else {
            panic!("switch should work");
        };

        let Ok(switched) = harness.users.find(member.id()).await else {
            panic!("user should load");
        };
        assert_eq!(switched.current_office_id(), Some(office.id()));

        let Ok(()) = harness
            .offices
            .revoke_access(&admin, member.id(), office.id())
            .await
        else {
            panic!("revoke should work");
        };

        let Ok(after) = harness.users.find(member.id()).await else {
            panic!("user should load");
        };
        assert_eq!(after.current_office_id(), None);
    }

    #[tokio::test]
    async fn company_roles_are_invisible_to_other_tenants() {
        let harness = harness();
        let first = harness.seed_company("First").await;
        let second = harness.seed_company("Second").await;
        let (_, first_admin) = harness.seed_admin(&first).await;

        let second_admin_role = harness
            .seed_role(&second, "administrator", &["*"], false)
            .await;
        let (_, second_admin) = harness
            .seed_member(&second, "other@example.com", &second_admin_role)
            .await;

        let Ok(created) = harness
            .roles
            .create(
                &first_admin,
                CreateRoleInput {
                    name: "dispatcher".to_owned(),
                    display_name: "Dispatcher".to_owned(),
                    description: None,
                    permissions: vec!["job:read".to_owned()],
                    is_default: false,
                    scope: RoleScope::Company(first.id()),
                },
            )
            .await
        else {
            panic!("role should be created");
        };

        assert!(matches!(
            harness.roles.get(&second_admin, created.id()).await,
            Err(AppError::NotFound(_))
        ));

        let Ok(visible) = harness.roles.list(&second_admin).await else {
            panic!("list should work");
        };
        assert!(visible.iter().all(|role| role.id() != created.id()));
    }

    #[tokio::test]
    async fn audit_log_is_pinned_to_the_actors_company() {
        let harness = harness();
        let first = harness.seed_company("First").await;
        let second = harness.seed_company("Second").await;
        let (_, first_admin) = harness.seed_admin(&first).await;
        let second_admin_role = harness
            .seed_role(&second, "administrator", &["*"], false)
            .await;
        let (_, second_admin) = harness
            .seed_member(&second, "other@example.com", &second_admin_role)
            .await;

        let Ok(_) = harness.offices.create(&first_admin, "Downtown".to_owned()).await else {
            panic!("office should be created");
        };
        let Ok(_) = harness.offices.create(&second_admin, "Uptown".to_owned()).await else {
            panic!("office should be created");
        };

        let Ok(entries) = harness.audit.list(&first_admin, None, None).await else {
            panic!("audit list should work");
        };
        assert!(!entries.is_empty());
        assert!(entries
            .iter()
            .all(|entry| entry.company_id == Some(first.id())));

        let Ok(filtered) = harness
            .audit
            .list(&first_admin, Some("office.created".to_owned()), None)
            .await
        else {
            panic!("audit list should work");
        };
        assert_eq!(filtered.len(), 1);
    }
}
