use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::user::User;
use serde::Deserialize;
use services::services::auth::AuthService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

/// POST /api/auth/login
/// Exchange a 4-digit PIN for the matching user record.
pub async fn login(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = AuthService::login(&state.db.pool, &payload.pin)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPinRequest {
    pub user_id: Uuid,
    pub pin: String,
}

/// POST /api/auth/verify-pin
pub async fn verify_pin(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<VerifyPinRequest>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    let ok = AuthService::verify_pin(&state.db.pool, payload.user_id, &payload.pin).await?;
    Ok(ResponseJson(ApiResponse::success(ok)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePinRequest {
    pub user_id: Uuid,
    pub new_pin: String,
}

/// PUT /api/auth/pin
/// A user changing their own PIN.
pub async fn update_pin(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<UpdatePinRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = AuthService::update_pin(&state.db.pool, payload.user_id, &payload.new_pin).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        user,
        "PIN updated.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct GeneratePinQuery {
    pub acting_user_id: Uuid,
}

/// GET /api/auth/generate-pin
/// Admin helper: propose an unused random PIN for a new user.
pub async fn generate_pin(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<GeneratePinQuery>,
) -> Result<ResponseJson<ApiResponse<String>>, ApiError> {
    AuthService::require_admin(&state.db.pool, query.acting_user_id).await?;
    let pin = AuthService::generate_pin(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(pin)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/login", post(login))
            .route("/verify-pin", post(verify_pin))
            .route("/pin", put(update_pin))
            .route("/generate-pin", get(generate_pin)),
    )
}
