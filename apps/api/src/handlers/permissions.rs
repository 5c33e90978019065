use axum::Json;
use crewdeck_domain::KnownPermission;

use crate::dto::PermissionCatalogEntryResponse;

/// GET /api/permissions - The known-permission catalog for the role editor.
pub async fn permission_catalog_handler() -> Json<Vec<PermissionCatalogEntryResponse>> {
    Json(
        KnownPermission::all()
            .iter()
            .copied()
            .map(PermissionCatalogEntryResponse::from)
            .collect(),
    )
}
