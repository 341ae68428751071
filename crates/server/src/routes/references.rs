use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::reference::{CreateReference, Reference};
use serde::Deserialize;
use services::services::flows::{self, LinkTitle};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Category derived from the link host: video platforms get "Video",
/// everything else is an "Article".
fn categorize_link(link: &str) -> &'static str {
    let link = link.to_lowercase();
    if link.contains("youtube.com") || link.contains("youtu.be") || link.contains("vimeo.com") {
        "Video"
    } else {
        "Article"
    }
}

#[derive(Debug, Deserialize)]
pub struct ListReferencesQuery {
    pub user_id: Option<Uuid>,
}

/// GET /api/references
pub async fn list_references(
    State(state): State<AppState>,
    Query(query): Query<ListReferencesQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Reference>>>, ApiError> {
    let references = match query.user_id {
        Some(user_id) => Reference::find_by_user_id(&state.db.pool, user_id).await?,
        None => Reference::find_all(&state.db.pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(references)))
}

#[derive(Debug, Deserialize)]
pub struct CreateReferenceRequest {
    pub user_id: Uuid,
    pub link: String,
    /// Autocompleted from the link when omitted.
    pub title: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /api/references
pub async fn create_reference(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateReferenceRequest>,
) -> Result<ResponseJson<ApiResponse<Reference>>, ApiError> {
    if payload.link.trim().is_empty() {
        return Err(ApiError::BadRequest("Link is required.".to_string()));
    }

    let title = match payload.title.filter(|t| !t.trim().is_empty()) {
        Some(title) => title,
        // No title given: ask the model for one, falling back to the link
        // itself so a save never fails on an AI hiccup.
        None => match state.claude.as_ref() {
            Some(claude) => flows::autocomplete_link_title(claude, &payload.link)
                .await
                .map(|t| t.title)
                .unwrap_or_else(|_| payload.link.clone()),
            None => payload.link.clone(),
        },
    };

    let category = categorize_link(&payload.link);
    let reference = Reference::create(
        &state.db.pool,
        payload.user_id,
        &CreateReference {
            link: payload.link,
            title,
            notes: payload.notes,
            tags: payload.tags,
            category: Some(category.to_string()),
        },
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        reference,
        "Link saved.",
    )))
}

/// DELETE /api/references/{reference_id}
pub async fn delete_reference(
    State(state): State<AppState>,
    Path(reference_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Reference::delete(&state.db.pool, reference_id).await? == 0 {
        return Err(ApiError::NotFound("reference"));
    }
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Link deleted.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteTitleRequest {
    pub link: String,
}

/// POST /api/references/autocomplete-title
/// Ask the model for a concise title for a pasted link.
pub async fn autocomplete_title(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<AutocompleteTitleRequest>,
) -> Result<ResponseJson<ApiResponse<LinkTitle>>, ApiError> {
    let claude = state.claude()?;
    let title = flows::autocomplete_link_title(claude, &payload.link).await?;
    Ok(ResponseJson(ApiResponse::success(title)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/references",
        Router::new()
            .route("/", get(list_references).post(create_reference))
            .route("/autocomplete-title", post(autocomplete_title))
            .route("/{reference_id}", axum::routing::delete(delete_reference)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_hosts_are_categorized_as_video() {
        assert_eq!(categorize_link("https://www.youtube.com/watch?v=abc"), "Video");
        assert_eq!(categorize_link("https://youtu.be/abc"), "Video");
        assert_eq!(categorize_link("https://VIMEO.com/12345"), "Video");
    }

    #[test]
    fn everything_else_is_an_article() {
        assert_eq!(categorize_link("https://blog.rust-lang.org/post"), "Article");
        assert_eq!(categorize_link("https://example.com"), "Article");
    }
}
