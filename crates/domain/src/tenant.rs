//! Tenant structure entities: companies and their offices.

use chrono::{DateTime, Utc};
use crewdeck_core::{AppResult, CompanyId, NonEmptyString, OfficeId};
use serde::{Deserialize, Serialize};

/// The tenant partition unit. Every scoped query and every company-scoped
/// role hangs off a company id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: NonEmptyString,
    created_at: DateTime<Utc>,
}

impl Company {
    /// Creates a company with a validated name.
    pub fn new(
        id: CompanyId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            created_at,
        })
    }

    /// Returns the company identifier.
    #[must_use]
    pub fn id(&self) -> CompanyId {
        self.id
    }

    /// Returns the company name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the company name.
    pub fn set_name(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.name = NonEmptyString::new(name)?;
        Ok(())
    }
}

/// A sub-tenant location unit belonging to exactly one company.
///
/// Users hold an allowed-office set plus one nullable current-office pointer;
/// both are managed by the office access service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    id: OfficeId,
    company_id: CompanyId,
    name: NonEmptyString,
}

impl Office {
    /// Creates an office with a validated name.
    pub fn new(id: OfficeId, company_id: CompanyId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            company_id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the office identifier.
    #[must_use]
    pub fn id(&self) -> OfficeId {
        self.id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the office name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Replaces the office name.
    pub fn set_name(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.name = NonEmptyString::new(name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crewdeck_core::{CompanyId, OfficeId};

    use super::{Company, Office};

    #[test]
    fn company_requires_nonempty_name() {
        assert!(Company::new(CompanyId::new(), "  ", Utc::now()).is_err());
    }

    #[test]
    fn office_belongs_to_its_company() {
        let company_id = CompanyId::new();
        let office = Office::new(OfficeId::new(), company_id, "Downtown");
        assert_eq!(office.ok().map(|office| office.company_id()), Some(company_id));
    }
}
