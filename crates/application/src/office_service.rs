//! Office management and per-user office access.

use std::sync::Arc;

use chrono::Utc;
use crewdeck_core::{AccessScope, ActorContext, AppError, AppResult, OfficeId, UserId};
use crewdeck_domain::{AuditAction, KnownPermission, Office};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::AuthorizationService;
use crate::tenant_ports::{OfficeAccess, OfficeAccessRepository, OfficeRepository};
use crate::user_service::UserRepository;

/// Office CRUD plus the allowed-office set and current-office pointer.
pub struct OfficeService {
    offices: Arc<dyn OfficeRepository>,
    access: Arc<dyn OfficeAccessRepository>,
    users: Arc<dyn UserRepository>,
    authorization: AuthorizationService,
    audit: Arc<dyn AuditRepository>,
}

impl OfficeService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(
        offices: Arc<dyn OfficeRepository>,
        access: Arc<dyn OfficeAccessRepository>,
        users: Arc<dyn UserRepository>,
        authorization: AuthorizationService,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            offices,
            access,
            users,
            authorization,
            audit,
        }
    }

    /// Lists the offices of the actor's company.
    pub async fn list(&self, actor: &ActorContext) -> AppResult<Vec<Office>> {
        self.authorization
            .require(actor, KnownPermission::OfficeRead)
            .await?;
        let company_id = actor.require_company()?;
        self.offices.list_for_company(company_id).await
    }

    /// Creates an office in the actor's company.
    pub async fn create(&self, actor: &ActorContext, name: String) -> AppResult<Office> {
        self.authorization
            .require(actor, KnownPermission::OfficeCreate)
            .await?;
        let company_id = actor.require_company()?;

        let office = Office::new(OfficeId::new(), company_id, name)?;
        self.offices.insert(&office).await?;

        self.record(actor, AuditAction::OfficeCreated, &office).await?;
        Ok(office)
    }

    /// Renames an office in the actor's company.
    pub async fn update(
        &self,
        actor: &ActorContext,
        office_id: OfficeId,
        name: String,
    ) -> AppResult<Office> {
        self.authorization
            .require(actor, KnownPermission::OfficeUpdate)
            .await?;

        let mut office = self.find_company_office(actor, office_id).await?;
        office.set_name(name)?;
        self.offices.update(&office).await?;

        self.record(actor, AuditAction::OfficeUpdated, &office).await?;
        Ok(office)
    }

    /// Deletes an office, cascading over its access rows.
    ///
    /// Users whose current office was the deleted one end up with a cleared
    /// pointer; the cascade runs in one transaction so no dangling access
    /// row or pointer survives.
    pub async fn delete(&self, actor: &ActorContext, office_id: OfficeId) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::OfficeDelete)
            .await?;

        let office = self.find_company_office(actor, office_id).await?;
        self.offices.delete_with_access(office.id()).await?;

        self.record(actor, AuditAction::OfficeDeleted, &office).await
    }

    /// Adds an office to a user's allowed set. Idempotent.
    pub async fn grant_access(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        office_id: OfficeId,
    ) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::OfficeAssign)
            .await?;

        let office = self.find_company_office(actor, office_id).await?;
        if self.users.find(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' not found")));
        }

        self.access
            .grant(&OfficeAccess {
                user_id,
                office_id: office.id(),
                granted_by: Some(actor.user_id()),
                granted_at: Utc::now(),
            })
            .await?;

        self.record_access(actor, AuditAction::OfficeAccessGranted, user_id, &office)
            .await
    }

    /// Removes an office from a user's allowed set. Idempotent.
    ///
    /// When the revoked office is the user's current office the pointer is
    /// cleared in the same transaction, so the user never points at an
    /// office they are not allowed to work in.
    pub async fn revoke_access(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        office_id: OfficeId,
    ) -> AppResult<()> {
        self.authorization
            .require(actor, KnownPermission::OfficeAssign)
            .await?;

        let office = self.find_company_office(actor, office_id).await?;
        self.access
            .revoke_and_clear_current(user_id, office.id())
            .await?;

        self.record_access(actor, AuditAction::OfficeAccessRevoked, user_id, &office)
            .await
    }

    /// Moves a user's current-office pointer.
    ///
    /// Users may move their own pointer; moving someone else's requires
    /// `office:assign`. The target office must be in the user's allowed set
    /// or the move fails with [`AppError::OfficeNotAllowed`]. `None` clears
    /// the pointer.
    pub async fn set_current_office(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        office_id: Option<OfficeId>,
    ) -> AppResult<()> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::OfficeAssign)
                .await?;
        }

        if self.users.find(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' not found")));
        }

        let mut detail = serde_json::json!({ "user_id": user_id.to_string() });
        if let Some(office_id) = office_id {
            let office = self.find_company_office(actor, office_id).await?;
            if !self.access.has_access(user_id, office_id).await? {
                return Err(AppError::OfficeNotAllowed(
                    office.name().as_str().to_owned(),
                ));
            }
            detail = serde_json::json!({
                "user_id": user_id.to_string(),
                "office": office.name().as_str(),
            });
        }

        self.access.set_current_office(user_id, office_id).await?;

        self.audit
            .record(AuditEvent {
                company_id: actor.scope().company_id(),
                actor_user_id: Some(actor.user_id()),
                action: AuditAction::CurrentOfficeChanged,
                resource_type: "office",
                resource_id: office_id.map(|id| id.to_string()),
                detail,
            })
            .await
    }

    /// Lists the offices a user may work in, restricted to the actor's
    /// company for company sessions.
    pub async fn offices_for_user(
        &self,
        actor: &ActorContext,
        user_id: UserId,
    ) -> AppResult<Vec<Office>> {
        if user_id != actor.user_id() {
            self.authorization
                .require(actor, KnownPermission::OfficeRead)
                .await?;
        }

        let offices = self.access.list_for_user(user_id).await?;
        Ok(match actor.scope() {
            AccessScope::Company(company_id) => offices
                .into_iter()
                .filter(|office| office.company_id() == company_id)
                .collect(),
            AccessScope::Platform => offices,
        })
    }

    /// Resolves an office and hides offices of other companies.
    async fn find_company_office(
        &self,
        actor: &ActorContext,
        office_id: OfficeId,
    ) -> AppResult<Office> {
        let company_id = actor.require_company()?;
        let not_found = || AppError::NotFound(format!("office '{office_id}' not found"));
        let office = self.offices.find(office_id).await?.ok_or_else(not_found)?;
        if office.company_id() != company_id {
            return Err(not_found());
        }
        Ok(office)
    }

    async fn record(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        office: &Office,
    ) -> AppResult<()> {
        self.audit
            .record(AuditEvent {
                company_id: Some(office.company_id()),
                actor_user_id: Some(actor.user_id()),
                action,
                resource_type: "office",
                resource_id: Some(office.id().to_string()),
                detail: serde_json::json!({ "name": office.name().as_str() }),
            })
            .await
    }

    async fn record_access(
        &self,
        actor: &ActorContext,
        action: AuditAction,
        user_id: UserId,
        office: &Office,
    ) -> AppResult<()> {
        self.audit
            .record(AuditEvent {
                company_id: Some(office.company_id()),
                actor_user_id: Some(actor.user_id()),
                action,
                resource_type: "office",
                resource_id: Some(office.id().to_string()),
                detail: serde_json::json!({
                    "user_id": user_id.to_string(),
                    "name": office.name().as_str(),
                }),
            })
            .await
    }
}
