use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::project::{CreateProject, Project, ProjectStarter, ProjectStatus};
use serde::Deserialize;
use services::services::{
    auth::AuthService,
    flows::{self, ProjectResourceRecommendations},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub user_id: Option<Uuid>,
}

/// GET /api/projects
/// All projects, or one user's when `user_id` is given.
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = match query.user_id {
        Some(user_id) => Project::find_by_user_id(&state.db.pool, user_id).await?,
        None => Project::find_all(&state.db.pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(projects)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub project: CreateProject,
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateProjectRequest>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.project.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required.".to_string()));
    }
    if payload.project.project_type.trim().is_empty() {
        return Err(ApiError::BadRequest("Project type is required.".to_string()));
    }
    let project = Project::create(
        &state.db.pool,
        payload.user_id,
        &payload.project,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        project,
        "Project added.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ProjectStatus,
}

/// PUT /api/projects/{project_id}/status
pub async fn update_project_status(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let previous = Project::find_by_id(&state.db.pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    let project =
        Project::update_status(&state.db.pool, project_id, payload.status, &previous).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// DELETE /api/projects/{project_id}
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if Project::delete(&state.db.pool, project_id).await? == 0 {
        return Err(ApiError::NotFound("project"));
    }
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Project deleted.",
    )))
}

/// GET /api/projects/starters
pub async fn list_starters(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectStarter>>>, ApiError> {
    let starters = ProjectStarter::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(starters)))
}

#[derive(Debug, Deserialize)]
pub struct CreateStarterRequest {
    pub acting_user_id: Uuid,
    pub title: String,
    pub description: String,
}

/// POST /api/projects/starters
/// Admin only: curate a reusable project template.
pub async fn create_starter(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateStarterRequest>,
) -> Result<ResponseJson<ApiResponse<ProjectStarter>>, ApiError> {
    let admin = AuthService::require_admin(&state.db.pool, payload.acting_user_id).await?;
    let starter = ProjectStarter::create(
        &state.db.pool,
        admin.id,
        &payload.title,
        &payload.description,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(starter)))
}

#[derive(Debug, Deserialize)]
pub struct RecommendResourcesRequest {
    pub project_type: String,
}

/// POST /api/projects/recommend-resources
/// AI recommendations for a project type: tools, case studies, links, prompts.
pub async fn recommend_resources(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<RecommendResourcesRequest>,
) -> Result<ResponseJson<ApiResponse<ProjectResourceRecommendations>>, ApiError> {
    let claude = state.claude()?;
    let recommendations =
        flows::recommend_project_resources(claude, &payload.project_type).await?;
    Ok(ResponseJson(ApiResponse::success(recommendations)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/projects",
        Router::new()
            .route("/", get(list_projects).post(create_project))
            .route("/starters", get(list_starters).post(create_starter))
            .route("/recommend-resources", post(recommend_resources))
            .route("/{project_id}", axum::routing::delete(delete_project))
            .route("/{project_id}/status", put(update_project_status)),
    )
}
