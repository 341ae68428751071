use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::user::User;
use serde::{Deserialize, Serialize};
use services::services::auth::AuthService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Public listing entry: everything about a user except the full PIN. The
/// two-digit hint is what the login screen shows.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub pin_first_two: String,
    pub is_admin: bool,
    pub avatar_url: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            pin_first_two: user.pin_first_two,
            is_admin: user.is_admin,
            avatar_url: user.avatar_url,
        }
    }
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let users = User::find_all(&state.db.pool)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(ResponseJson(ApiResponse::success(users)))
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub acting_user_id: Uuid,
    pub name: String,
    pub email: String,
    pub pin: String,
    pub avatar_url: Option<String>,
}

/// POST /api/users
/// Admin only.
pub async fn add_user(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<AddUserRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = AuthService::add_user(
        &state.db.pool,
        payload.acting_user_id,
        &payload.name,
        &payload.email,
        &payload.pin,
        payload.avatar_url.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        user,
        "User added.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub avatar_url: Option<String>,
}

/// PUT /api/users/{user_id}/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateProfileRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = AuthService::update_profile(
        &state.db.pool,
        user_id,
        &payload.name,
        payload.avatar_url.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

#[derive(Debug, Deserialize)]
pub struct ResetPinRequest {
    pub acting_user_id: Uuid,
    pub new_pin: String,
}

/// PUT /api/users/{user_id}/pin
/// Admin reset of another user's PIN.
pub async fn reset_pin(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    axum::Json(payload): axum::Json<ResetPinRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = AuthService::admin_update_pin(
        &state.db.pool,
        payload.acting_user_id,
        user_id,
        &payload.new_pin,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        user,
        "PIN reset.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct ActingUserQuery {
    pub acting_user_id: Uuid,
}

/// DELETE /api/users/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ActingUserQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    AuthService::delete_user(&state.db.pool, query.acting_user_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "User deleted.",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/users",
        Router::new()
            .route("/", get(list_users).post(add_user))
            .route("/{user_id}", axum::routing::delete(delete_user))
            .route("/{user_id}/profile", put(update_profile))
            .route("/{user_id}/pin", put(reset_pin)),
    )
}
