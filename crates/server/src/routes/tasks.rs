use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::task::{CreateTask, Task, TaskStatus, TaskWithDetails};
use serde::Deserialize;
use services::services::auth::AuthService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub user_id: Option<Uuid>,
}

/// GET /api/tasks
/// All tasks, or the ones assigned to `user_id`. A user's list puts open
/// work first and completed tasks last.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithDetails>>>, ApiError> {
    let tasks = match query.user_id {
        Some(user_id) => {
            let mut tasks = Task::find_assigned_to_user(&state.db.pool, user_id).await?;
            tasks.sort_by_key(|t| t.status.sort_order());
            tasks
        }
        None => Task::find_all(&state.db.pool).await?,
    };

    let mut detailed = Vec::with_capacity(tasks.len());
    for task in tasks {
        detailed.push(task.with_details(&state.db.pool).await?);
    }
    Ok(ResponseJson(ApiResponse::success(detailed)))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub assigned_by: Uuid,
    #[serde(flatten)]
    pub task: CreateTask,
}

/// POST /api/tasks
/// Admin only: assign a task to one or more users.
pub async fn create_task(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<CreateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    AuthService::require_admin(&state.db.pool, payload.assigned_by).await?;
    if payload.task.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Task title is required.".to_string()));
    }
    if payload.task.assigned_to_user_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one assignee is required.".to_string(),
        ));
    }
    let task = Task::create(&state.db.pool, payload.assigned_by, &payload.task, Uuid::new_v4())
        .await?
        .with_details(&state.db.pool)
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        task,
        "Task assigned.",
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub user_id: Uuid,
    pub status: TaskStatus,
}

/// PUT /api/tasks/{task_id}/status
/// Assignees (and admins) move a task between statuses.
pub async fn update_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateTaskStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if Task::find_by_id(&state.db.pool, task_id).await?.is_none() {
        return Err(ApiError::NotFound("task"));
    }
    let assigned = Task::is_assigned_to(&state.db.pool, task_id, payload.user_id).await?;
    if !assigned {
        AuthService::require_admin(&state.db.pool, payload.user_id).await?;
    }
    let task = Task::update_status(&state.db.pool, task_id, payload.status).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

#[derive(Debug, Deserialize)]
pub struct ActingUserQuery {
    pub acting_user_id: Uuid,
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Query(query): Query<ActingUserQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    AuthService::require_admin(&state.db.pool, query.acting_user_id).await?;
    if Task::delete(&state.db.pool, task_id).await? == 0 {
        return Err(ApiError::NotFound("task"));
    }
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Task deleted.",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/tasks",
        Router::new()
            .route("/", get(list_tasks).post(create_task))
            .route("/{task_id}", axum::routing::delete(delete_task))
            .route("/{task_id}/status", put(update_task_status)),
    )
}
