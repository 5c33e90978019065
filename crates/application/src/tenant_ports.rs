//! Persistence ports for companies, offices, and office access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdeck_core::{AppResult, CompanyId, OfficeId, UserId};
use crewdeck_domain::{Company, Office};

/// Repository port for company records.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Persists a new company.
    async fn insert(&self, company: &Company) -> AppResult<()>;

    /// Persists changes to an existing company.
    async fn update(&self, company: &Company) -> AppResult<()>;

    /// Finds a company by id.
    async fn find(&self, company_id: CompanyId) -> AppResult<Option<Company>>;

    /// Lists all companies on the platform.
    async fn list_all(&self) -> AppResult<Vec<Company>>;
}

/// Repository port for office records.
#[async_trait]
pub trait OfficeRepository: Send + Sync {
    /// Persists a new office.
    async fn insert(&self, office: &Office) -> AppResult<()>;

    /// Persists changes to an existing office.
    async fn update(&self, office: &Office) -> AppResult<()>;

    /// Deletes an office together with its access rows, clearing any
    /// current-office pointer referencing it, all in one transaction.
    async fn delete_with_access(&self, office_id: OfficeId) -> AppResult<()>;

    /// Finds an office by id.
    async fn find(&self, office_id: OfficeId) -> AppResult<Option<Office>>;

    /// Lists the offices of a company.
    async fn list_for_company(&self, company_id: CompanyId) -> AppResult<Vec<Office>>;
}

/// One entry in a user's allowed-office set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficeAccess {
    /// User holding the access.
    pub user_id: UserId,
    /// Office the user may work in.
    pub office_id: OfficeId,
    /// User who granted the access, when recorded.
    pub granted_by: Option<UserId>,
    /// When the access was granted.
    pub granted_at: DateTime<Utc>,
}

/// Repository port for the allowed-office set and the current-office pointer.
///
/// The pointer lives on the user row but is owned by this port so that
/// revocation can remove the access row and clear a matching pointer inside
/// one transaction.
#[async_trait]
pub trait OfficeAccessRepository: Send + Sync {
    /// Records access; granting an already-allowed office is a no-op.
    async fn grant(&self, access: &OfficeAccess) -> AppResult<()>;

    /// Removes access and, when the user's current office is the revoked
    /// one, clears the pointer in the same transaction. Revoking access
    /// that was never granted is a no-op.
    async fn revoke_and_clear_current(&self, user_id: UserId, office_id: OfficeId)
    -> AppResult<()>;

    /// Lists the offices a user is allowed to work in.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Office>>;

    /// Returns true when the office is in the user's allowed set.
    async fn has_access(&self, user_id: UserId, office_id: OfficeId) -> AppResult<bool>;

    /// Moves the user's current-office pointer.
    async fn set_current_office(
        &self,
        user_id: UserId,
        office_id: Option<OfficeId>,
    ) -> AppResult<()>;
}
