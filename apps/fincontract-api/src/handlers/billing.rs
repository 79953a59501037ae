use axum::{Extension, Json, extract::State};
use fincontract_shared::billing::{CheckoutRequest, CheckoutResponse, PlanOffer};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::audit_service::record;

pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<PlanOffer>> {
    Json(state.checkout_service.plans())
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let url = state
        .checkout_service
        .checkout_url(&payload.plan_id, user.id, user.email.as_deref())?;

    record(state.audit.as_ref(), user.id, "checkout", payload.plan_id).await;
    Ok(Json(CheckoutResponse { url }))
}
