use crewdeck_application::AuditLogEntry;
use serde::Serialize;
use ts_rs::TS;

/// API representation of an audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub id: String,
    pub company_id: Option<String>,
    pub actor_user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub detail: String,
    pub recorded_at: String,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            company_id: entry.company_id.map(|id| id.to_string()),
            actor_user_id: entry.actor_user_id.map(|id| id.to_string()),
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            detail: entry.detail.to_string(),
            recorded_at: entry.recorded_at.to_rfc3339(),
        }
    }
}
