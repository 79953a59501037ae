use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use fincontract_shared::contracts::{
    AnalysisView, ContractDetail, ContractSummary, DashboardSummary, UploadContractRequest,
};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::audit_service::record;

pub async fn list_contracts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ContractSummary>>, ApiError> {
    Ok(Json(state.contract_service.list(user.id).await?))
}

pub async fn upload_contract(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UploadContractRequest>,
) -> Result<(StatusCode, Json<ContractSummary>), ApiError> {
    let summary = state.contract_service.upload(user.id, payload).await?;
    record(state.audit.as_ref(), user.id, "upload", summary.id.to_string()).await;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractDetail>, ApiError> {
    Ok(Json(state.contract_service.get(user.id, id).await?))
}

pub async fn analyze_contract(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisView>, ApiError> {
    let view = state.contract_service.analyze(user.id, id).await?;
    record(
        state.audit.as_ref(),
        user.id,
        "analyze",
        format!("{} scored {}", id, view.report.risk_score),
    )
    .await;
    Ok(Json(view))
}

pub async fn delete_contract(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.contract_service.delete(user.id, id).await?;
    record(state.audit.as_ref(), user.id, "delete", id.to_string()).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(state.contract_service.dashboard(user.id).await?))
}
