use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use crewdeck_core::{ActorContext, CompanyId};
use uuid::Uuid;

use crate::dto::{CompanyResponse, CreateCompanyRequest, UpdateCompanyRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/companies - List the companies visible to the session.
pub async fn list_companies_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> ApiResult<Json<Vec<CompanyResponse>>> {
    let companies = state.company_service.list(&actor).await?;
    Ok(Json(
        companies.into_iter().map(CompanyResponse::from).collect(),
    ))
}

/// POST /api/companies - Create a company (platform operators).
pub async fn create_company_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<CompanyResponse>)> {
    let company = state.company_service.create(&actor, payload.name).await?;
    Ok((StatusCode::CREATED, Json(company.into())))
}

/// PUT /api/companies/{company_id} - Rename a company.
pub async fn update_company_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<CompanyResponse>> {
    let company = state
        .company_service
        .update(&actor, CompanyId::from_uuid(company_id), payload.name)
        .await?;
    Ok(Json(company.into()))
}
