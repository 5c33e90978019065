//! Company management.

use std::sync::Arc;

use chrono::Utc;
use crewdeck_core::{AccessScope, ActorContext, AppError, AppResult, CompanyId};
use crewdeck_domain::{AuditAction, Company, KnownPermission};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::tenant_ports::CompanyRepository;

/// Company CRUD; creation is a platform-operator concern.
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
}

impl CompanyService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            companies,
            authorization,
            audit,
        }
    }

    /// Creates a company. Platform sessions only.
    pub async fn create(&self, actor: &ActorContext, name: String) -> AppResult<Company> {
        if actor.scope() != AccessScope::Platform {
            return Err(AppError::Forbidden(
                "only platform operators may create companies".to_owned(),
            ));
        }
        self.authorization
            .require(actor, KnownPermission::CompanyCreate)
            .await?;

        let company = Company::new(CompanyId::new(), name, Utc::now())?;
        self.companies.insert(&company).await?;

        self.record(actor, AuditAction::CompanyCreated, &company)
            .await?;
        Ok(company)
    }

    /// Lists companies: the own company for tenant sessions, everything for
    /// platform sessions.
    pub async fn list(&self, actor: &ActorContext) -> AppResult<Vec<Company>> {
        self.authorization
            .require(actor, KnownPermission::CompanyRead)
            .await?;

        match actor.scope() {
            AccessScope::Platform => self.companies.list_all().await,
            AccessScope::Company(company_id) => {
                Ok(self.companies.find(company_id).await?.into_iter().collect())
            }
        }
    }

    /// Renames a company; tenant sessions may only rename their own.
    pub async fn update(
        &self,
        actor: &ActorContext,
        company_id: CompanyId,
        name: String,
    ) -> AppResult<Company> {
        self.authorization
            .require(actor, KnownPermission::CompanyUpdate)
            .await?;
        if let AccessScope::Company(active) = actor.scope()
            && active != company_id
        {
            return Err(AppError::NotFound(format!(
                "company '{company_id}' not found"
            )));
        }

        let mut company = self
            .companies
            .find(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' not found")))?;
        company.set_name(name)?;
        self.companies.update(&company).await?;

        self.record(actor, AuditAction::CompanyUpdated, &company)
            .await?;
        Ok(company)
    }

    /// Loads a company by id without an authorization check; used by
    /// session and invite flows that already verified membership.
    pub async fn find(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        self.companies.find(company_id).await
    }

    async fn record(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        company: &Company,
    ) -> AppResult<()> {
        self.audit
            .record(AuditEvent {
                company_id: Some(company.id()),
                actor_user_id: Some(actor.user_id()),
                action,
                resource_type: "company",
                resource_id: Some(company.id().to_string()),
                detail: serde_json::json!({ "name": company.name().as_str() }),
            })
            .await
    }
}
