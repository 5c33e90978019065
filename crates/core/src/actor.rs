use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, CompanyId, UserId};

/// Scope an authorization decision is evaluated under.
///
/// Permission evaluation is always partitioned by scope: company-scope
/// requests see only role assignments made within that company, and
/// platform-scope requests see only platform-role assignments. The scope is
/// taken from the caller's session, never inferred from the user id, so
/// grants from one company can never authorize actions in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "company_id", rename_all = "snake_case")]
pub enum AccessScope {
    /// Tenant scope: acting within a single company.
    Company(CompanyId),
    /// Operator scope: acting on the platform itself.
    Platform,
}

impl AccessScope {
    /// Returns the company id for company-scoped access.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::Company(company_id) => Some(*company_id),
            Self::Platform => None,
        }
    }
}

impl std::fmt::Display for AccessScope {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Company(company_id) => write!(formatter, "company '{company_id}'"),
            Self::Platform => write!(formatter, "platform"),
        }
    }
}

/// Actor information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    user_id: UserId,
    email: String,
    display_name: String,
    scope: AccessScope,
}

impl ActorContext {
    /// Creates an actor context from authentication and scoping data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        scope: AccessScope,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name: display_name.into(),
            scope,
        }
    }

    /// Returns the acting user's identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the actor's canonical email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name for the current actor.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the access scope the session is operating under.
    #[must_use]
    pub fn scope(&self) -> AccessScope {
        self.scope
    }

    /// Returns the active company, failing for platform-scoped sessions.
    ///
    /// Company-scoped operations call this first so a platform operator who
    /// has not switched into a company gets a clear validation error instead
    /// of an accidental cross-scope write.
    pub fn require_company(&self) -> AppResult<CompanyId> {
        self.scope.company_id().ok_or_else(|| {
            AppError::Validation("this operation requires an active company context".to_owned())
        })
    }

    /// Returns a copy of this context rescoped to a different company.
    ///
    /// Used by the company switcher after membership has been verified.
    #[must_use]
    pub fn with_scope(&self, scope: AccessScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }
}
