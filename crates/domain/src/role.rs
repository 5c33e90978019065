//! Role entity, scoping rules, and slug handling.

use std::collections::HashSet;

use crewdeck_core::{AppError, AppResult, CompanyId, NonEmptyString, RoleId};
use serde::{Deserialize, Serialize};

use crate::permission::PermissionSet;

/// Shortest accepted role slug.
pub const ROLE_NAME_MIN_LENGTH: usize = 2;

/// Longest accepted role slug.
pub const ROLE_NAME_MAX_LENGTH: usize = 64;

/// Scope determining who owns a role and who may change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "company_id", rename_all = "snake_case")]
pub enum RoleScope {
    /// Built-in role visible to every company; tenants can assign but never
    /// edit or delete it.
    System,
    /// Role owned and managed by a single company.
    Company(CompanyId),
    /// Role for operators managing the platform itself; never company-scoped.
    Platform,
}

impl RoleScope {
    /// Returns the stable storage value for the scope kind.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Company(_) => "company",
            Self::Platform => "platform",
        }
    }

    /// Returns the owning company for company-scoped roles.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::Company(company_id) => Some(*company_id),
            Self::System | Self::Platform => None,
        }
    }

    /// Returns true when tenant actors may edit or delete roles of this scope.
    #[must_use]
    pub fn is_tenant_managed(&self) -> bool {
        matches!(self, Self::Company(_))
    }

    /// Rebuilds a scope from its storage columns.
    ///
    /// The kind string and the nullable company column must agree: `company`
    /// requires an owning company, the other kinds forbid one.
    pub fn from_storage(kind: &str, company_id: Option<CompanyId>) -> AppResult<Self> {
        match (kind, company_id) {
            ("system", None) => Ok(Self::System),
            ("company", Some(company_id)) => Ok(Self::Company(company_id)),
            ("platform", None) => Ok(Self::Platform),
            ("system" | "platform", Some(_)) => Err(AppError::Validation(format!(
                "{kind} roles must not carry a company id"
            ))),
            ("company", None) => Err(AppError::Validation(
                "company roles require a company id".to_owned(),
            )),
            _ => Err(AppError::Validation(format!(
                "unknown role scope '{kind}'"
            ))),
        }
    }
}

/// A named, scoped bundle of permissions assignable to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: String,
    display_name: NonEmptyString,
    description: Option<String>,
    scope: RoleScope,
    permissions: PermissionSet,
    is_default: bool,
}

impl Role {
    /// Creates a role with validated fields.
    ///
    /// The slug is immutable after creation and must be lowercase
    /// (`[a-z][a-z0-9_-]*`, 2–64 chars); the permission set must not be
    /// empty. Uniqueness of the slug within its scope is a store concern.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: Option<String>,
        scope: RoleScope,
        permissions: PermissionSet,
        is_default: bool,
    ) -> AppResult<Self> {
        let name = name.into();
        validate_role_name(&name)?;

        if permissions.is_empty() {
            return Err(AppError::Validation(
                "permissions must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id,
            name,
            display_name: NonEmptyString::new(display_name)?,
            description: normalize_description(description),
            scope,
            permissions,
            is_default,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the machine slug.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the role scope.
    #[must_use]
    pub fn scope(&self) -> RoleScope {
        self.scope
    }

    /// Returns the permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns true when the role is auto-granted to newly onboarded users.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Fails with [`AppError::ImmutableRole`] unless tenant actors may
    /// modify this role.
    pub fn ensure_tenant_mutable(&self) -> AppResult<()> {
        if self.scope.is_tenant_managed() {
            return Ok(());
        }
        Err(AppError::ImmutableRole(self.name.clone()))
    }

    /// Replaces the display name.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) -> AppResult<()> {
        self.display_name = NonEmptyString::new(display_name)?;
        Ok(())
    }

    /// Replaces the description; blank input clears it.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = normalize_description(description);
    }

    /// Replaces the permission set, rejecting an empty replacement.
    pub fn replace_permissions(&mut self, permissions: PermissionSet) -> AppResult<()> {
        if permissions.is_empty() {
            return Err(AppError::Validation(
                "permissions must not be empty".to_owned(),
            ));
        }
        self.permissions = permissions;
        Ok(())
    }

    /// Toggles whether the role is auto-granted on onboarding.
    pub fn set_is_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn validate_role_name(name: &str) -> AppResult<()> {
    let length = name.chars().count();
    if !(ROLE_NAME_MIN_LENGTH..=ROLE_NAME_MAX_LENGTH).contains(&length) {
        return Err(AppError::Validation(format!(
            "role name must be {ROLE_NAME_MIN_LENGTH}-{ROLE_NAME_MAX_LENGTH} characters"
        )));
    }

    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|first| first.is_ascii_lowercase());
    if !starts_with_letter
        || !chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_'))
    {
        return Err(AppError::Validation(format!(
            "role name '{name}' must be a lowercase slug ([a-z][a-z0-9_-]*)"
        )));
    }

    Ok(())
}

/// Builds a unique slug for a cloned role.
///
/// Tries `{name}-copy`, then `{name}-copy-2`, `{name}-copy-3`, …, truncating
/// the source name where needed to stay within [`ROLE_NAME_MAX_LENGTH`].
#[must_use]
pub fn copy_slug(source_name: &str, taken: &HashSet<String>) -> String {
    for counter in 1u32.. {
        let suffix = if counter == 1 {
            "-copy".to_owned()
        } else {
            format!("-copy-{counter}")
        };

        let budget = ROLE_NAME_MAX_LENGTH.saturating_sub(suffix.len());
        let base: String = source_name.chars().take(budget).collect();
        let candidate = format!("{base}{suffix}");

        if !taken.contains(&candidate) {
            return candidate;
        }
    }

    // 1u32.. only ends by returning above.
    unreachable!()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crewdeck_core::{CompanyId, RoleId};

    use super::{Role, RoleScope, copy_slug};
    use crate::permission::PermissionSet;

    fn permissions(values: &[&str]) -> PermissionSet {
        match PermissionSet::parse_all(values.iter().copied()) {
            Ok(set) => set,
            Err(error) => panic!("permissions should parse: {error}"),
        }
    }

    fn company_role(name: &str) -> Role {
        let result = Role::new(
            RoleId::new(),
            name,
            "Sales Agent",
            None,
            RoleScope::Company(CompanyId::new()),
            permissions(&["customer:read"]),
            false,
        );
        match result {
            Ok(role) => role,
            Err(error) => panic!("role should build: {error}"),
        }
    }

    #[test]
    fn role_requires_nonempty_permissions() {
        let result = Role::new(
            RoleId::new(),
            "sales-agent",
            "Sales Agent",
            None,
            RoleScope::System,
            PermissionSet::new(),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn role_name_must_be_slug() {
        for bad in ["", "A", "Sales Agent", "1sales", "sales agent", "-sales"] {
            let result = Role::new(
                RoleId::new(),
                bad,
                "Sales Agent",
                None,
                RoleScope::System,
                permissions(&["customer:read"]),
                false,
            );
            assert!(result.is_err(), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn system_role_is_not_tenant_mutable() {
        let result = Role::new(
            RoleId::new(),
            "administrator",
            "Administrator",
            None,
            RoleScope::System,
            permissions(&["*"]),
            false,
        );
        let Ok(role) = result else {
            panic!("role should build");
        };
        assert!(role.ensure_tenant_mutable().is_err());
    }

    #[test]
    fn company_role_is_tenant_mutable() {
        assert!(company_role("sales-agent").ensure_tenant_mutable().is_ok());
    }

    #[test]
    fn replace_permissions_rejects_empty_set() {
        let mut role = company_role("sales-agent");
        assert!(role.replace_permissions(PermissionSet::new()).is_err());
        assert_eq!(role.permissions().len(), 1);
    }

    #[test]
    fn blank_description_is_cleared() {
        let mut role = company_role("sales-agent");
        role.set_description(Some("   ".to_owned()));
        assert_eq!(role.description(), None);
        role.set_description(Some(" field staff ".to_owned()));
        assert_eq!(role.description(), Some("field staff"));
    }

    #[test]
    fn scope_storage_roundtrip() {
        let company_id = CompanyId::new();
        let scope = RoleScope::from_storage("company", Some(company_id));
        assert_eq!(scope.ok(), Some(RoleScope::Company(company_id)));

        assert!(RoleScope::from_storage("company", None).is_err());
        assert!(RoleScope::from_storage("system", Some(company_id)).is_err());
        assert!(RoleScope::from_storage("galactic", None).is_err());
    }

    #[test]
    fn copy_slug_disambiguates() {
        let mut taken = HashSet::new();
        assert_eq!(copy_slug("sales-agent", &taken), "sales-agent-copy");

        taken.insert("sales-agent-copy".to_owned());
        assert_eq!(copy_slug("sales-agent", &taken), "sales-agent-copy-2");

        taken.insert("sales-agent-copy-2".to_owned());
        assert_eq!(copy_slug("sales-agent", &taken), "sales-agent-copy-3");
    }

    #[test]
    fn copy_slug_stays_within_max_name_length() {
        let long = "a".repeat(super::ROLE_NAME_MAX_LENGTH);
        let slug = copy_slug(&long, &HashSet::new());
        assert!(slug.len() <= super::ROLE_NAME_MAX_LENGTH);
        assert!(slug.ends_with("-copy"));
    }
}
