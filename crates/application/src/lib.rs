//! Application services and ports.
//!
//! Services orchestrate domain entities behind async repository ports;
//! infrastructure provides the Postgres and in-memory adapters. Every
//! mutating use-case authorizes the acting session first and records an
//! audit event after the change commits.

#![forbid(unsafe_code)]

mod assignment_service;
mod audit;
mod authorization_service;
mod bootstrap_service;
mod company_service;
mod invite_service;
mod office_service;
mod role_service;
mod security_ports;
mod tenant_ports;
mod user_service;

pub use assignment_service::AssignmentService;
pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditRepository, AuditService};
pub use authorization_service::{AccessDecision, AuthorizationService, RequirementMode};
pub use bootstrap_service::{BootstrapParams, BootstrapService, PLATFORM_ADMIN_ROLE};
pub use company_service::CompanyService;
pub use invite_service::{
    AcceptInviteParams, AcceptedInvite, CreateInviteParams, EmailService, INVITE_TTL_DAYS,
    InviteAcceptance, InvitePreview, InviteRepository, InviteService, NewUserRecord,
};
pub use office_service::OfficeService;
pub use role_service::{CreateRoleInput, RoleService, UpdateRoleInput};
pub use security_ports::{RoleAssignment, RoleAssignmentRepository, RoleRepository};
pub use tenant_ports::{CompanyRepository, OfficeAccess, OfficeAccessRepository, OfficeRepository};
pub use user_service::{PasswordHasher, UserRepository, UserService};
