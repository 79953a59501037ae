use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use fincontract_shared::promo::{RedeemRequest, RedeemResponse};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::audit_service::record;
use crate::services::promo_service::to_view;

pub async fn redeem_promo_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Malformed redeem body from {}: {}", user.id, e);
        ApiError::BadRequest("Invalid request body".to_string())
    })?;

    let redemption = state
        .promo_service
        .redeem(user.id, req.code.as_deref())
        .await
        .map_err(|e| {
            tracing::info!("Redemption by {} rejected: {}", user.id, e);
            ApiError::from(e)
        })?;

    record(
        state.audit.as_ref(),
        user.id,
        "redeem",
        format!("{} -> {}", redemption.code, redemption.plan_id),
    )
    .await;

    Ok(Json(RedeemResponse {
        success: true,
        redemption: to_view(&redemption),
    }))
}
