use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::AppState;
use crate::auth::auth_middleware;
use crate::handlers;

/// Uploads are capped at 200k characters; leave headroom for JSON escaping.
const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/functions/v1/redeem-promo-code",
            post(handlers::promo::redeem_promo_code),
        )
        .route("/api/promo/redeem", post(handlers::promo::redeem_promo_code))
        .route("/api/billing/checkout", post(handlers::billing::create_checkout))
        .route(
            "/api/contracts",
            get(handlers::contracts::list_contracts).post(handlers::contracts::upload_contract),
        )
        .route(
            "/api/contracts/{id}",
            get(handlers::contracts::get_contract).delete(handlers::contracts::delete_contract),
        )
        .route(
            "/api/contracts/{id}/analyze",
            post(handlers::contracts::analyze_contract),
        )
        .route("/api/dashboard", get(handlers::contracts::dashboard))
        .route("/api/audit", get(handlers::audit::list_audit_entries))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/billing/plans", get(handlers::billing::list_plans))
        .route("/api/format", post(handlers::format::format_text))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}
