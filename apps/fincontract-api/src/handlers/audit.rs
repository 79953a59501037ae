use axum::{Extension, Json, extract::State};
use fincontract_shared::audit::AuditEntry;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::audit_service::entries_for;

pub async fn list_audit_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let entries = entries_for(state.audit.as_ref(), user.id).await?;
    Ok(Json(entries))
}
