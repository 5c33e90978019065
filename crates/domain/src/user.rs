//! User identity types and credential validation rules.
//!
//! Password rules follow the OWASP Password Storage cheat sheet; email
//! validation is structural only.

use chrono::{DateTime, Utc};
use crewdeck_core::{AppError, AppResult, NonEmptyString, OfficeId, UserId};
use serde::{Deserialize, Serialize};

/// Validated, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Structural checks only: non-empty, exactly one `@`, non-empty local
    /// part, a domain with at least one `.`, at most 254 characters. Input
    /// is trimmed and lowercased so lookups and the one-pending-invite rule
    /// treat `A@x.com` and `a@x.com` as the same address.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if normalized.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length (NIST SP800-63B, no second factor).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length (allows passphrases, bounds Argon2 input).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password before hashing.
///
/// Enforces the 10–128 character window and rejects entries from an embedded
/// list of commonly breached passwords.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

/// Top breached passwords (embedded subset for a fast local check).
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "1234567890",
    "qwertyuiop",
    "qwerty123",
    "1q2w3e4r5t",
    "iloveyou",
    "trustno1",
    "sunshine1",
    "princess1",
    "football1",
    "superman1",
    "welcome123",
    "letmein123",
    "starwars1",
    "dragon123",
    "monkey123",
    "baseball1",
    "whatever1",
    "michael123",
    "abc1234567",
];

/// A platform identity.
///
/// One identity may belong to several companies through role assignments;
/// the identity row itself is not tenant-scoped. The password hash never
/// leaves the credential port, so it is not part of this entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: EmailAddress,
    display_name: NonEmptyString,
    current_office_id: Option<OfficeId>,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with validated fields.
    pub fn new(
        id: UserId,
        email: EmailAddress,
        display_name: impl Into<String>,
        current_office_id: Option<OfficeId>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            email,
            display_name: NonEmptyString::new(display_name)?,
            current_office_id,
            created_at,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the current office pointer.
    #[must_use]
    pub fn current_office_id(&self) -> Option<OfficeId> {
        self.current_office_id
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Moves the current-office pointer.
    ///
    /// Membership of the office in the user's allowed set is enforced by the
    /// office access service, which owns the allowed set.
    pub fn set_current_office(&mut self, office_id: Option<OfficeId>) {
        self.current_office_id = office_id;
    }

    /// Replaces the display name.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) -> AppResult<()> {
        self.display_name = NonEmptyString::new(display_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailAddress, PASSWORD_MAX_LENGTH, validate_password};

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::new("  Agent@Example.COM ");
        assert_eq!(email.ok().as_ref().map(EmailAddress::as_str), Some("agent@example.com"));
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
    }

    #[test]
    fn email_with_empty_local_part_is_rejected() {
        assert!(EmailAddress::new("@example.com").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(EmailAddress::new("   ").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn adequate_password_is_accepted() {
        assert!(validate_password("a-reasonable-passphrase").is_ok());
    }

    #[test]
    fn common_password_is_rejected() {
        assert!(validate_password("password123").is_err());
        assert!(validate_password("PASSWORD123").is_err());
    }

    #[test]
    fn very_long_password_is_rejected() {
        let long = "a".repeat(PASSWORD_MAX_LENGTH + 1);
        assert!(validate_password(&long).is_err());
    }

    #[test]
    fn max_length_password_is_accepted() {
        let max = "b".repeat(PASSWORD_MAX_LENGTH);
        assert!(validate_password(&max).is_ok());
    }
}
