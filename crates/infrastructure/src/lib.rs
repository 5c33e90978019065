//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod console_email_service;
mod in_memory_store;
mod postgres_audit_repository;
mod postgres_company_repository;
mod postgres_invite_repository;
mod postgres_office_repository;
mod postgres_role_assignment_repository;
mod postgres_role_repository;
mod postgres_user_repository;
mod role_rows;
mod smtp_email_service;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use console_email_service::ConsoleEmailService;
pub use in_memory_store::InMemoryStore;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_company_repository::PostgresCompanyRepository;
pub use postgres_invite_repository::PostgresInviteRepository;
pub use postgres_office_repository::{PostgresOfficeAccessRepository, PostgresOfficeRepository};
pub use postgres_role_assignment_repository::PostgresRoleAssignmentRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
