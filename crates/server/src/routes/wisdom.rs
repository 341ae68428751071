use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::flows::{self, DailyWisdom};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /api/wisdom
/// A fresh one-or-two sentence inspirational statement.
pub async fn daily_wisdom(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<DailyWisdom>>, ApiError> {
    let claude = state.claude()?;
    let wisdom = flows::generate_daily_wisdom(claude).await?;
    Ok(ResponseJson(ApiResponse::success(wisdom)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/wisdom", get(daily_wisdom))
}
