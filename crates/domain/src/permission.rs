//! Permission value type, permission sets, and wildcard matching.
//!
//! Permissions are opaque `resource:action` strings. A held permission may be
//! a wildcard: `*` grants everything, `resource:*` grants every action on one
//! resource. Matching is case-sensitive and performs no normalization, so the
//! pattern a role stores is exactly the pattern that is evaluated.

use std::str::FromStr;

use crewdeck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub mod catalog;

/// Longest accepted permission string.
pub const PERMISSION_MAX_LENGTH: usize = 128;

/// A validated permission string.
///
/// Carries no identity; display metadata (category, label) lives in the
/// permission catalog. Construction goes through [`Permission::parse`] so
/// malformed values cannot enter role definitions or authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Parses a permission string.
    ///
    /// Rejects empty values, embedded whitespace, and values longer than
    /// [`PERMISSION_MAX_LENGTH`]. Wildcard forms (`*`, `resource:*`) are
    /// accepted; no catalog membership is required, so roles can carry
    /// permissions introduced by newer releases.
    pub fn parse(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(AppError::Validation(
                "permission must not be empty".to_owned(),
            ));
        }

        if value.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "permission '{value}' must not contain whitespace"
            )));
        }

        if value.len() > PERMISSION_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "permission must not exceed {PERMISSION_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the permission string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns true when this pattern is `*` or a `resource:*` form.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0 == "*" || self.0.ends_with(":*")
    }

    /// Returns true when this held pattern satisfies `required`.
    ///
    /// - `*` grants everything.
    /// - An exact match grants.
    /// - `resource:*` grants any permission starting with `resource:`.
    #[must_use]
    pub fn grants(&self, required: &Permission) -> bool {
        pattern_grants(self.as_str(), required.as_str())
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0
    }
}

/// Core matching rule on raw pattern strings.
///
/// Kept separate from [`Permission`] so the exact edge behavior is pinned at
/// the string level: an empty required value is satisfied only by `*` or an
/// exact empty pattern, and a `resource:*` pattern requires the `resource:`
/// prefix verbatim.
fn pattern_grants(held: &str, required: &str) -> bool {
    if held == "*" {
        return true;
    }

    if held == required {
        return true;
    }

    if let Some(prefix) = held.strip_suffix(":*")
        && let Some(rest) = required.strip_prefix(prefix)
    {
        return rest.starts_with(':');
    }

    false
}

/// Ordered, de-duplicated collection of permissions.
///
/// Insertion order is preserved for display; duplicates collapse on insert.
/// Beyond exact membership the set answers wildcard-aware queries:
/// [`grants`](Self::grants) for one requirement and
/// [`holds_all`](Self::holds_all) / [`holds_any`](Self::holds_any) for
/// composite requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet {
    entries: Vec<Permission>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every value into a permission and collects the set.
    ///
    /// Duplicates collapse silently; the first occurrence keeps its position.
    pub fn parse_all<I, S>(values: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for value in values {
            set.insert(Permission::parse(value)?);
        }
        Ok(set)
    }

    /// Inserts a permission, returning false when it was already present.
    pub fn insert(&mut self, permission: Permission) -> bool {
        if self.contains(&permission) {
            return false;
        }
        self.entries.push(permission);
        true
    }

    /// Returns true when the exact permission string is a member.
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.entries.iter().any(|entry| entry == permission)
    }

    /// Returns true when any held pattern satisfies `required`.
    #[must_use]
    pub fn grants(&self, required: &Permission) -> bool {
        self.entries.iter().any(|held| held.grants(required))
    }

    /// Returns true when every required permission is granted.
    ///
    /// An empty requirement list is vacuously true. This deliberately differs
    /// from [`holds_any`](Self::holds_any), which treats an empty list as
    /// never satisfied; both behaviors are load-bearing for callers that
    /// build requirement lists dynamically.
    #[must_use]
    pub fn holds_all<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        required.into_iter().all(|needed| self.grants(needed))
    }

    /// Returns true when at least one required permission is granted.
    ///
    /// An empty requirement list is never satisfied.
    #[must_use]
    pub fn holds_any<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        required.into_iter().any(|needed| self.grants(needed))
    }

    /// Returns the required permissions this set does not grant.
    #[must_use]
    pub fn missing<'a, I>(&self, required: I) -> Vec<Permission>
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        required
            .into_iter()
            .filter(|needed| !self.grants(needed))
            .cloned()
            .collect()
    }

    /// Iterates members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.entries.iter()
    }

    /// Returns the members as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Permission] {
        &self.entries
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        for permission in iter {
            self.insert(permission);
        }
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::vec::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(values: Vec<Permission>) -> Self {
        values.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.entries
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Permission, PermissionSet, pattern_grants};

    fn permission(value: &str) -> Permission {
        match Permission::parse(value) {
            Ok(parsed) => parsed,
            Err(error) => panic!("'{value}' should parse: {error}"),
        }
    }

    #[test]
    fn empty_permission_is_rejected() {
        assert!(Permission::parse("").is_err());
    }

    #[test]
    fn whitespace_permission_is_rejected() {
        assert!(Permission::parse("customer: read").is_err());
        assert!(Permission::parse(" customer:read").is_err());
        assert!(Permission::parse("customer:read\n").is_err());
    }

    #[test]
    fn overlong_permission_is_rejected() {
        let long = "a".repeat(super::PERMISSION_MAX_LENGTH + 1);
        assert!(Permission::parse(long).is_err());
    }

    #[test]
    fn wildcard_forms_are_detected() {
        assert!(permission("*").is_wildcard());
        assert!(permission("customer:*").is_wildcard());
        assert!(!permission("customer:read").is_wildcard());
    }

    #[test]
    fn global_wildcard_grants_anything() {
        let held = permission("*");
        assert!(held.grants(&permission("customer:read")));
        assert!(held.grants(&permission("role:delete")));
        assert!(held.grants(&permission("*")));
    }

    #[test]
    fn exact_match_grants() {
        let held = permission("customer:read");
        assert!(held.grants(&permission("customer:read")));
        assert!(!held.grants(&permission("customer:create")));
    }

    #[test]
    fn resource_wildcard_grants_same_resource_only() {
        let held = permission("customer:*");
        assert!(held.grants(&permission("customer:read")));
        assert!(held.grants(&permission("customer:delete")));
        assert!(!held.grants(&permission("other:read")));
    }

    #[test]
    fn resource_wildcard_requires_separator() {
        // "customers:read" shares the byte prefix but not the resource.
        assert!(!pattern_grants("customer:*", "customers:read"));
    }

    #[test]
    fn narrow_grant_does_not_satisfy_wildcard_requirement() {
        assert!(!pattern_grants("customer:read", "customer:*"));
    }

    #[test]
    fn empty_required_value_matches_only_star_or_empty() {
        assert!(pattern_grants("*", ""));
        assert!(pattern_grants("", ""));
        assert!(!pattern_grants("customer:read", ""));
        assert!(!pattern_grants("customer:*", ""));
        assert!(!pattern_grants("", "customer:read"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!pattern_grants("Customer:read", "customer:read"));
        assert!(!pattern_grants("customer:*", "Customer:read"));
    }

    #[test]
    fn set_collapses_duplicates_and_keeps_insertion_order() {
        let mut set = PermissionSet::new();
        assert!(set.insert(permission("b:read")));
        assert!(set.insert(permission("a:read")));
        assert!(!set.insert(permission("b:read")));

        let values: Vec<&str> = set.iter().map(Permission::as_str).collect();
        assert_eq!(values, vec!["b:read", "a:read"]);
    }

    #[test]
    fn holds_all_is_vacuously_true_on_empty_requirements() {
        let set = PermissionSet::new();
        assert!(set.holds_all([]));

        let populated: PermissionSet = [permission("customer:read")].into_iter().collect();
        assert!(populated.holds_all([]));
    }

    #[test]
    fn holds_any_is_false_on_empty_requirements() {
        let populated: PermissionSet = [permission("*")].into_iter().collect();
        assert!(!populated.holds_any([]));
    }

    #[test]
    fn holds_all_requires_every_permission() {
        let set: PermissionSet = [permission("customer:read"), permission("customer:create")]
            .into_iter()
            .collect();

        let read = permission("customer:read");
        let create = permission("customer:create");
        let delete = permission("customer:delete");

        assert!(set.holds_all([&read, &create]));
        assert!(!set.holds_all([&read, &delete]));
        assert!(set.holds_any([&read, &delete]));
        assert!(!set.holds_any([&delete]));
    }

    #[test]
    fn missing_reports_ungranted_requirements() {
        let set: PermissionSet = [permission("customer:*")].into_iter().collect();

        let read = permission("customer:read");
        let delete = permission("role:delete");
        let missing = set.missing([&read, &delete]);

        assert_eq!(missing, vec![permission("role:delete")]);
    }

    #[test]
    fn parse_all_rejects_invalid_member() {
        let result = PermissionSet::parse_all(["customer:read", ""]);
        assert!(result.is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_order() {
        let set: PermissionSet = [permission("b:read"), permission("a:read")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap_or_default();
        assert_eq!(json, r#"["b:read","a:read"]"#);

        let restored: PermissionSet = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(restored, set);
    }

    proptest! {
        #[test]
        fn star_grants_every_pattern(value in "[a-z_]{1,12}:[a-z_]{1,12}") {
            prop_assert!(pattern_grants("*", &value));
        }

        #[test]
        fn resource_wildcard_grants_every_action(
            resource in "[a-z_]{1,12}",
            action in "[a-z_]{1,12}",
        ) {
            let held = format!("{resource}:*");
            let required = format!("{resource}:{action}");
            prop_assert!(pattern_grants(&held, &required));
        }

        #[test]
        fn resource_wildcard_rejects_other_resources(
            resource in "[a-z_]{1,12}",
            other in "[a-z_]{1,12}",
            action in "[a-z_]{1,12}",
        ) {
            prop_assume!(resource != other);
            let held = format!("{resource}:*");
            let required = format!("{other}:{action}");
            prop_assert!(!pattern_grants(&held, &required));
        }

        #[test]
        fn patterns_always_grant_themselves(value in "[a-z_:*]{1,24}") {
            prop_assert!(pattern_grants(&value, &value));
        }
    }
}
