use std::sync::Arc;

use crewdeck_application::{
    AssignmentService, AuditService, AuthorizationService, BootstrapService, CompanyService,
    InviteService, OfficeService, RoleService, UserService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_service: Arc<RoleService>,
    pub assignment_service: Arc<AssignmentService>,
    pub office_service: Arc<OfficeService>,
    pub company_service: Arc<CompanyService>,
    pub user_service: Arc<UserService>,
    pub invite_service: Arc<InviteService>,
    pub bootstrap_service: Arc<BootstrapService>,
    pub audit_service: Arc<AuditService>,
    pub authorization_service: AuthorizationService,
    pub frontend_url: String,
    pub bootstrap_token: String,
}
