//! Static registry of known permissions with display metadata.
//!
//! The catalog drives the role editor: categories group checkboxes, labels
//! replace raw keys. It is advisory only — roles may carry permissions the
//! running build does not know about, and the matcher treats every permission
//! as an opaque string.

use std::str::FromStr;

use crewdeck_core::AppError;
use serde::{Deserialize, Serialize};

use super::Permission;

/// Display grouping for known permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Company records and settings.
    Company,
    /// Offices and office membership.
    Office,
    /// User profiles and directory data.
    User,
    /// Role definitions and assignments.
    Role,
    /// Invite lifecycle.
    Invite,
    /// Price-guide catalog entries.
    PriceGuide,
    /// Audit log access.
    Audit,
}

impl PermissionCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Office => "office",
            Self::User => "user",
            Self::Role => "role",
            Self::Invite => "invite",
            Self::PriceGuide => "price_guide",
            Self::Audit => "audit",
        }
    }

    /// Returns a human-readable label for this category.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Company => "Company",
            Self::Office => "Offices",
            Self::User => "Users",
            Self::Role => "Roles",
            Self::Invite => "Invites",
            Self::PriceGuide => "Price guide",
            Self::Audit => "Audit log",
        }
    }
}

/// Permissions enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownPermission {
    /// Allows creating companies (platform operators).
    CompanyCreate,
    /// Allows reading company records.
    CompanyRead,
    /// Allows updating company records.
    CompanyUpdate,
    /// Allows reading offices.
    OfficeRead,
    /// Allows creating offices.
    OfficeCreate,
    /// Allows updating offices.
    OfficeUpdate,
    /// Allows deleting offices.
    OfficeDelete,
    /// Allows granting and revoking office access for users.
    OfficeAssign,
    /// Allows reading user profiles.
    UserRead,
    /// Allows updating user profiles.
    UserUpdate,
    /// Allows reading role definitions.
    RoleRead,
    /// Allows creating and cloning roles.
    RoleCreate,
    /// Allows updating role definitions.
    RoleUpdate,
    /// Allows deleting roles.
    RoleDelete,
    /// Allows assigning and revoking roles for users.
    RoleAssign,
    /// Allows reading pending invites.
    InviteRead,
    /// Allows creating and re-sending invites.
    InviteCreate,
    /// Allows revoking pending invites.
    InviteRevoke,
    /// Allows reading the price-guide catalog.
    PriceGuideRead,
    /// Allows managing price-guide catalog entries.
    PriceGuideManage,
    /// Allows reading audit log entries.
    AuditRead,
}

impl KnownPermission {
    /// Returns the stable permission key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyCreate => "company:create",
            Self::CompanyRead => "company:read",
            Self::CompanyUpdate => "company:update",
            Self::OfficeRead => "office:read",
            Self::OfficeCreate => "office:create",
            Self::OfficeUpdate => "office:update",
            Self::OfficeDelete => "office:delete",
            Self::OfficeAssign => "office:assign",
            Self::UserRead => "user:read",
            Self::UserUpdate => "user:update",
            Self::RoleRead => "role:read",
            Self::RoleCreate => "role:create",
            Self::RoleUpdate => "role:update",
            Self::RoleDelete => "role:delete",
            Self::RoleAssign => "role:assign",
            Self::InviteRead => "invite:read",
            Self::InviteCreate => "invite:create",
            Self::InviteRevoke => "invite:revoke",
            Self::PriceGuideRead => "price_guide:read",
            Self::PriceGuideManage => "price_guide:manage",
            Self::AuditRead => "audit:read",
        }
    }

    /// Returns a human-readable label for the role editor.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompanyCreate => "Create companies",
            Self::CompanyRead => "View company details",
            Self::CompanyUpdate => "Edit company details",
            Self::OfficeRead => "View offices",
            Self::OfficeCreate => "Create offices",
            Self::OfficeUpdate => "Edit offices",
            Self::OfficeDelete => "Delete offices",
            Self::OfficeAssign => "Manage office access",
            Self::UserRead => "View users",
            Self::UserUpdate => "Edit users",
            Self::RoleRead => "View roles",
            Self::RoleCreate => "Create roles",
            Self::RoleUpdate => "Edit roles",
            Self::RoleDelete => "Delete roles",
            Self::RoleAssign => "Assign roles",
            Self::InviteRead => "View invites",
            Self::InviteCreate => "Send invites",
            Self::InviteRevoke => "Revoke invites",
            Self::PriceGuideRead => "View price guide",
            Self::PriceGuideManage => "Manage price guide",
            Self::AuditRead => "View audit log",
        }
    }

    /// Returns the category this permission is displayed under.
    #[must_use]
    pub fn category(&self) -> PermissionCategory {
        match self {
            Self::CompanyCreate | Self::CompanyRead | Self::CompanyUpdate => {
                PermissionCategory::Company
            }
            Self::OfficeRead
            | Self::OfficeCreate
            | Self::OfficeUpdate
            | Self::OfficeDelete
            | Self::OfficeAssign => PermissionCategory::Office,
            Self::UserRead | Self::UserUpdate => PermissionCategory::User,
            Self::RoleRead
            | Self::RoleCreate
            | Self::RoleUpdate
            | Self::RoleDelete
            | Self::RoleAssign => PermissionCategory::Role,
            Self::InviteRead | Self::InviteCreate | Self::InviteRevoke => {
                PermissionCategory::Invite
            }
            Self::PriceGuideRead | Self::PriceGuideManage => PermissionCategory::PriceGuide,
            Self::AuditRead => PermissionCategory::Audit,
        }
    }

    /// Returns all known permissions in catalog display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[KnownPermission] = &[
            KnownPermission::CompanyCreate,
            KnownPermission::CompanyRead,
            KnownPermission::CompanyUpdate,
            KnownPermission::OfficeRead,
            KnownPermission::OfficeCreate,
            KnownPermission::OfficeUpdate,
            KnownPermission::OfficeDelete,
            KnownPermission::OfficeAssign,
            KnownPermission::UserRead,
            KnownPermission::UserUpdate,
            KnownPermission::RoleRead,
            KnownPermission::RoleCreate,
            KnownPermission::RoleUpdate,
            KnownPermission::RoleDelete,
            KnownPermission::RoleAssign,
            KnownPermission::InviteRead,
            KnownPermission::InviteCreate,
            KnownPermission::InviteRevoke,
            KnownPermission::PriceGuideRead,
            KnownPermission::PriceGuideManage,
            KnownPermission::AuditRead,
        ];

        ALL
    }
}

impl FromStr for KnownPermission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|known| known.as_str() == value)
            .copied()
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

impl From<KnownPermission> for Permission {
    fn from(value: KnownPermission) -> Self {
        // Catalog keys are static and always satisfy `Permission::parse`.
        Permission(value.as_str().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use super::{KnownPermission, Permission, PermissionCategory};

    #[test]
    fn catalog_keys_roundtrip() {
        for known in KnownPermission::all() {
            let restored = KnownPermission::from_str(known.as_str());
            assert_eq!(restored.ok(), Some(*known));
        }
    }

    #[test]
    fn catalog_keys_are_unique_and_parseable() {
        let mut seen = HashSet::new();
        for known in KnownPermission::all() {
            assert!(seen.insert(known.as_str()), "duplicate {}", known.as_str());
            assert!(Permission::parse(known.as_str()).is_ok());
        }
    }

    #[test]
    fn unknown_permission_is_rejected() {
        assert!(KnownPermission::from_str("customer:teleport").is_err());
    }

    #[test]
    fn categories_cover_every_entry() {
        let role_entries = KnownPermission::all()
            .iter()
            .filter(|known| known.category() == PermissionCategory::Role)
            .count();
        assert_eq!(role_entries, 5);
    }
}
