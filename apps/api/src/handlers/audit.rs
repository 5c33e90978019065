use axum::Json;
use axum::extract::{Extension, Query, State};
use crewdeck_core::ActorContext;
use serde::Deserialize;

use crate::dto::AuditLogEntryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub action: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/audit-log - List audit events visible to the session, newest first.
pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<AuditLogQueryParams>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let entries = state
        .audit_service
        .list(&actor, query.action, query.limit)
        .await?;

    Ok(Json(
        entries
            .into_iter()
            .map(AuditLogEntryResponse::from)
            .collect(),
    ))
}
