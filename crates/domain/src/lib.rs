//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod invite;
mod permission;
mod role;
mod tenant;
mod user;

pub use audit::AuditAction;
pub use invite::{Invite, InviteStatus};
pub use permission::catalog::{KnownPermission, PermissionCategory};
pub use permission::{PERMISSION_MAX_LENGTH, Permission, PermissionSet};
pub use role::{
    ROLE_NAME_MAX_LENGTH, ROLE_NAME_MIN_LENGTH, Role, RoleScope, copy_slug,
};
pub use tenant::{Company, Office};
pub use user::{
    EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, User, validate_password,
};
