use axum::Json;
use fincontract_shared::format::{FormatRequest, FormatResponse};

use crate::utils::format_analysis_text;

pub async fn format_text(Json(payload): Json<FormatRequest>) -> Json<FormatResponse> {
    Json(FormatResponse {
        html: format_analysis_text(&payload.text),
    })
}
