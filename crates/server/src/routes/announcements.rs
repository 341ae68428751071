use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::announcement::{Announcement, AnnouncementWithReads};
use serde::Deserialize;
use services::services::auth::AuthService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListAnnouncementsQuery {
    /// When given, only announcements visible to this user (their own plus
    /// broadcasts). Without it, the full admin view.
    pub user_id: Option<Uuid>,
}

/// GET /api/announcements
pub async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<ListAnnouncementsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AnnouncementWithReads>>>, ApiError> {
    let announcements = match query.user_id {
        Some(user_id) => Announcement::find_visible_to_user(&state.db.pool, user_id).await?,
        None => Announcement::find_all(&state.db.pool).await?,
    };

    let mut with_reads = Vec::with_capacity(announcements.len());
    for announcement in announcements {
        with_reads.push(announcement.with_reads(&state.db.pool).await?);
    }
    Ok(ResponseJson(ApiResponse::success(with_reads)))
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub acting_user_id: Uuid,
    pub message: String,
    /// Omit for a broadcast to everyone.
    pub recipient_user_id: Option<Uuid>,
}

/// POST /api/announcements
/// Admin only.
pub async fn create_announcement(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateAnnouncementRequest>,
) -> Result<ResponseJson<ApiResponse<Announcement>>, ApiError> {
    let admin = AuthService::require_admin(&state.db.pool, payload.acting_user_id).await?;
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required.".to_string()));
    }
    let announcement = Announcement::create(
        &state.db.pool,
        &payload.message,
        payload.recipient_user_id,
        &admin.name,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        announcement,
        "Announcement sent.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: Uuid,
}

/// POST /api/announcements/{announcement_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    axum::Json(payload): axum::Json<MarkReadRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Announcement::find_by_id(&state.db.pool, announcement_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("announcement"));
    }
    Announcement::mark_read(&state.db.pool, announcement_id, payload.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

#[derive(Debug, Deserialize)]
pub struct ActingUserQuery {
    pub acting_user_id: Uuid,
}

/// DELETE /api/announcements/{announcement_id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    Query(query): Query<ActingUserQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    AuthService::require_admin(&state.db.pool, query.acting_user_id).await?;
    if Announcement::delete(&state.db.pool, announcement_id).await? == 0 {
        return Err(ApiError::NotFound("announcement"));
    }
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Announcement deleted.",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/announcements",
        Router::new()
            .route("/", get(list_announcements).post(create_announcement))
            .route(
                "/{announcement_id}",
                axum::routing::delete(delete_announcement),
            )
            .route("/{announcement_id}/read", post(mark_read)),
    )
}
