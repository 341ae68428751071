use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{direct_message::DirectMessage, user::User};
use serde::{Deserialize, Serialize};
use services::services::auth::AuthService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

async fn primary_admin(state: &AppState) -> Result<User, ApiError> {
    User::primary_admin(&state.db.pool)
        .await?
        .ok_or(ApiError::NotFound("admin"))
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: Uuid,
    /// Defaults to the admin; regular users only ever talk to the admin.
    pub contact_id: Option<Uuid>,
}

/// GET /api/messages/conversation
pub async fn conversation(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<DirectMessage>>>, ApiError> {
    let contact_id = match query.contact_id {
        Some(id) => id,
        None => primary_admin(&state).await?.id,
    };
    let thread = DirectMessage::conversation(&state.db.pool, query.user_id, contact_id).await?;
    Ok(ResponseJson(ApiResponse::success(thread)))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub message: String,
    /// Required when the sender is an admin; ignored otherwise.
    pub recipient_id: Option<Uuid>,
}

/// POST /api/messages
/// Admins write to a chosen user; anything a regular user sends is routed
/// to the admin as a reply.
pub async fn send_message(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<SendMessageRequest>,
) -> Result<ResponseJson<ApiResponse<DirectMessage>>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required.".to_string()));
    }
    let sender = User::find_by_id(&state.db.pool, payload.sender_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let (recipient_id, is_reply) = if sender.is_admin {
        let recipient_id = payload
            .recipient_id
            .ok_or_else(|| ApiError::BadRequest("Recipient is required.".to_string()))?;
        (recipient_id, false)
    } else {
        (primary_admin(&state).await?.id, true)
    };

    let message = DirectMessage::create(
        &state.db.pool,
        sender.id,
        recipient_id,
        &payload.message,
        is_reply,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        message,
        "Message sent.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: Uuid,
    pub contact_id: Option<Uuid>,
}

/// POST /api/messages/read
/// Mark everything the contact sent to this user as read.
pub async fn mark_read(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<MarkReadRequest>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let contact_id = match payload.contact_id {
        Some(id) => id,
        None => primary_admin(&state).await?.id,
    };
    let changed =
        DirectMessage::mark_conversation_read(&state.db.pool, payload.user_id, contact_id).await?;
    Ok(ResponseJson(ApiResponse::success(changed)))
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub acting_user_id: Uuid,
}

/// One row of the admin inbox: a user, the latest exchange with them, and
/// how many of their messages the admin has not read yet.
#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub user_id: Uuid,
    pub user_name: String,
    pub avatar_url: Option<String>,
    pub last_message: Option<DirectMessage>,
    pub unread_count: i64,
}

/// GET /api/messages/overview
/// Admin only: every user conversation, most recently active first.
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ConversationSummary>>>, ApiError> {
    let admin = AuthService::require_admin(&state.db.pool, query.acting_user_id).await?;

    let mut summaries = Vec::new();
    for user in User::find_non_admins(&state.db.pool).await? {
        let last_message = DirectMessage::last_between(&state.db.pool, admin.id, user.id).await?;
        let unread_count = DirectMessage::unread_from(&state.db.pool, admin.id, user.id).await?;
        summaries.push(ConversationSummary {
            user_id: user.id,
            user_name: user.name,
            avatar_url: user.avatar_url,
            last_message,
            unread_count,
        });
    }
    summaries.sort_by(|a, b| {
        let a_at = a.last_message.as_ref().map(|m| m.sent_at);
        let b_at = b.last_message.as_ref().map(|m| m.sent_at);
        b_at.cmp(&a_at)
    });
    Ok(ResponseJson(ApiResponse::success(summaries)))
}

#[derive(Debug, Deserialize)]
pub struct UnreadCountQuery {
    pub user_id: Uuid,
}

/// GET /api/messages/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UnreadCountQuery>,
) -> Result<ResponseJson<ApiResponse<i64>>, ApiError> {
    let count = DirectMessage::unread_count(&state.db.pool, query.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(count)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/messages",
        Router::new()
            .route("/", post(send_message))
            .route("/conversation", get(conversation))
            .route("/overview", get(overview))
            .route("/read", post(mark_read))
            .route("/unread-count", get(unread_count)),
    )
}
