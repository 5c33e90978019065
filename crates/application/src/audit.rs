//! Audit trail port and read-side service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewdeck_core::{ActorContext, AppResult, CompanyId, UserId};
use crewdeck_domain::{AuditAction, KnownPermission};

use crate::authorization_service::AuthorizationService;

/// One recorded mutation, written by services after the change commits.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Company the mutation happened in; `None` for platform-level actions.
    pub company_id: Option<CompanyId>,
    /// User who performed the mutation, when known.
    pub actor_user_id: Option<UserId>,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Kind of resource touched (`"role"`, `"office"`, ...).
    pub resource_type: &'static str,
    /// Identifier of the touched resource, when it has one.
    pub resource_id: Option<String>,
    /// Action-specific context for display.
    pub detail: serde_json::Value,
}

/// A persisted audit event as returned from queries.
#[derive(Debug, Clone)]
pub struct AuditLogEntry {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Company the mutation happened in, when tenant-scoped.
    pub company_id: Option<CompanyId>,
    /// User who performed the mutation, when known.
    pub actor_user_id: Option<UserId>,
    /// Stable action value, e.g. `"role.created"`.
    pub action: String,
    /// Kind of resource touched.
    pub resource_type: String,
    /// Identifier of the touched resource, when it has one.
    pub resource_id: Option<String>,
    /// Action-specific context.
    pub detail: serde_json::Value,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Filters for audit log queries.
///
/// `company_id: None` means no company filter; the service only builds that
/// form for platform-scoped sessions.
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    /// Restrict to one company's events.
    pub company_id: Option<CompanyId>,
    /// Restrict to one action value.
    pub action: Option<String>,
    /// Maximum number of entries, newest first.
    pub limit: Option<i64>,
}

/// Repository port for the append-only audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event.
    async fn record(&self, event: AuditEvent) -> AppResult<()>;

    /// Lists events matching the query, newest first.
    async fn list(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;
}

/// Read-side access to the audit trail.
pub struct AuditService {
    audit: Arc<dyn AuditRepository>,
    authorization: AuthorizationService,
}

impl AuditService {
    /// Creates the service from its dependencies.
    #[must_use]
    pub fn new(audit: Arc<dyn AuditRepository>, authorization: AuthorizationService) -> Self {
        Self {
            audit,
            authorization,
        }
    }

    /// Lists audit events visible to the actor, newest first.
    ///
    /// Company sessions are pinned to their own company's events; platform
    /// sessions see everything.
    pub async fn list(
        &self,
        actor: &ActorContext,
        action: Option<String>,
        limit: Option<i64>,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.authorization
            .require(actor, KnownPermission::AuditRead)
            .await?;

        self.audit
            .list(AuditLogQuery {
                company_id: actor.scope().company_id(),
                action,
                limit,
            })
            .await
    }
}
