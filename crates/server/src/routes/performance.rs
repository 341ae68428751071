use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::NaiveDate;
use db::models::performance::{MonthlyUserPerformance, UserPerformanceScore};
use serde::Deserialize;
use services::services::{auth::AuthService, performance::PerformanceService};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// GET /api/performance/current-month
/// Every non-admin user's Friday-anchored weeks for the current month,
/// initialising missing weeks on the way.
pub async fn current_month(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<MonthlyUserPerformance>>>, ApiError> {
    let records = PerformanceService::current_month_overview(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub acting_user_id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month: u32,
    pub week_start_date: NaiveDate,
    /// 1-5, or null to clear the week.
    pub score: Option<i64>,
}

/// PUT /api/performance/score
/// Admin only: set or clear one user's score for one week.
pub async fn update_score(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<UpdateScoreRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    AuthService::require_admin(&state.db.pool, payload.acting_user_id).await?;
    PerformanceService::update_weekly_score(
        &state.db.pool,
        payload.user_id,
        payload.year,
        payload.month,
        payload.week_start_date,
        payload.score,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Score updated.",
    )))
}

/// GET /api/performance/leaderboard
/// Current-month ranking across non-admin users.
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<UserPerformanceScore>>>, ApiError> {
    let board = PerformanceService::monthly_leaderboard(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/performance",
        Router::new()
            .route("/current-month", get(current_month))
            .route("/score", put(update_score))
            .route("/leaderboard", get(leaderboard)),
    )
}
