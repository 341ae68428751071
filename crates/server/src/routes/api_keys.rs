use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::api_key::{ApiKey, CreateApiKey};
use serde::Deserialize;
use services::services::flows;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListApiKeysQuery {
    pub user_id: Option<Uuid>,
}

/// GET /api/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    Query(query): Query<ListApiKeysQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ApiKey>>>, ApiError> {
    let keys = match query.user_id {
        Some(user_id) => ApiKey::find_by_user_id(&state.db.pool, user_id).await?,
        None => ApiKey::find_all(&state.db.pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(keys)))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub key: CreateApiKey,
}

/// POST /api/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateApiKeyRequest>,
) -> Result<ResponseJson<ApiResponse<ApiKey>>, ApiError> {
    if payload.key.key_name.trim().is_empty() || payload.key.key_value.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Key name and value are required.".to_string(),
        ));
    }
    let key = ApiKey::create(&state.db.pool, payload.user_id, &payload.key, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        key,
        "API key stored.",
    )))
}

/// DELETE /api/api-keys/{key_id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if ApiKey::delete(&state.db.pool, key_id).await? == 0 {
        return Err(ApiError::NotFound("api key"));
    }
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "API key deleted.",
    )))
}

/// POST /api/api-keys/{key_id}/suggest-integration
/// Detect the key's service and persist an AI-drafted integration guide.
pub async fn suggest_integration(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ApiKey>>, ApiError> {
    let key = ApiKey::find_by_id(&state.db.pool, key_id)
        .await?
        .ok_or(ApiError::NotFound("api key"))?;

    let claude = state.claude()?;
    let suggestion = flows::suggest_api_integrations(claude, &key.key_name, &key.key_value).await?;

    let updated = ApiKey::update_integration_suggestion(
        &state.db.pool,
        key.id,
        &suggestion.api_type,
        &suggestion.integration_guide,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api-keys",
        Router::new()
            .route("/", get(list_api_keys).post(create_api_key))
            .route("/{key_id}", axum::routing::delete(delete_api_key))
            .route("/{key_id}/suggest-integration", post(suggest_integration)),
    )
}
