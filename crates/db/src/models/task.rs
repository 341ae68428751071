use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{project::Project, user::User};

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// Sort key for a user's task list: open work first, completed last.
    pub fn sort_order(&self) -> u8 {
        match self {
            TaskStatus::Todo => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Blocked => 3,
            TaskStatus::Completed => 4,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub assigned_by: Uuid,
    pub project_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// Task plus the display fields listings need.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub assigned_to_user_ids: Vec<Uuid>,
    pub assigned_to_user_names: Vec<String>,
    pub assigned_by_name: String,
    pub project_name: Option<String>,
}

impl std::ops::Deref for TaskWithDetails {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub assigned_to_user_ids: Vec<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub project_id: Option<Uuid>,
}

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_assigned_to_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"SELECT t.*
               FROM tasks t
               JOIN task_assignees a ON a.task_id = t.id
               WHERE a.user_id = $1
               ORDER BY t.created_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn assignee_ids(pool: &SqlitePool, task_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM task_assignees WHERE task_id = $1")
                .bind(task_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn is_assigned_to(
        pool: &SqlitePool,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM task_assignees WHERE task_id = $1 AND user_id = $2")
                .bind(task_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn create(
        pool: &SqlitePool,
        assigned_by: Uuid,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = data.status.clone().unwrap_or_default();
        let task = sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (id, title, description, reference_url, assigned_by, project_id, due_date, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(task_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.reference_url)
        .bind(assigned_by)
        .bind(data.project_id)
        .bind(data.due_date)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        for user_id in &data.assigned_to_user_ids {
            sqlx::query("INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES ($1, $2)")
                .bind(task_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        }

        Ok(task)
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>("UPDATE tasks SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Attach assignee names, assigner name and project name for display.
    pub async fn with_details(self, pool: &SqlitePool) -> Result<TaskWithDetails, sqlx::Error> {
        let assigned_to_user_ids = Self::assignee_ids(pool, self.id).await?;

        let mut assigned_to_user_names = Vec::with_capacity(assigned_to_user_ids.len());
        for user_id in &assigned_to_user_ids {
            if let Some(user) = User::find_by_id(pool, *user_id).await? {
                assigned_to_user_names.push(user.name);
            }
        }

        let assigned_by_name = User::find_by_id(pool, self.assigned_by)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| self.assigned_by.to_string());

        let project_name = match self.project_id {
            Some(project_id) => Project::find_by_id(pool, project_id).await?.map(|p| p.name),
            None => None,
        };

        Ok(TaskWithDetails {
            task: self,
            assigned_to_user_ids,
            assigned_to_user_names,
            assigned_by_name,
            project_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    #[test]
    fn status_order_puts_completed_last() {
        let mut statuses = vec![
            TaskStatus::Completed,
            TaskStatus::Blocked,
            TaskStatus::Todo,
            TaskStatus::InProgress,
        ];
        statuses.sort_by_key(|s| s.sort_order());
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Todo,
                TaskStatus::InProgress,
                TaskStatus::Blocked,
                TaskStatus::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn create_records_assignees_and_enriches_names() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = User::create(
            &db.pool,
            &CreateUser {
                name: "Admin".to_string(),
                email: None,
                pin: "0001".to_string(),
                is_admin: true,
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let worker = User::create(
            &db.pool,
            &CreateUser {
                name: "Worker".to_string(),
                email: None,
                pin: "0002".to_string(),
                is_admin: false,
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let task = Task::create(
            &db.pool,
            admin.id,
            &CreateTask {
                title: "Ship it".to_string(),
                description: None,
                reference_url: None,
                assigned_to_user_ids: vec![worker.id],
                due_date: None,
                status: None,
                project_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert!(Task::is_assigned_to(&db.pool, task.id, worker.id)
            .await
            .unwrap());
        assert!(!Task::is_assigned_to(&db.pool, task.id, admin.id)
            .await
            .unwrap());

        let detailed = task.with_details(&db.pool).await.unwrap();
        assert_eq!(detailed.assigned_to_user_names, vec!["Worker".to_string()]);
        assert_eq!(detailed.assigned_by_name, "Admin");

        let mine = Task::find_assigned_to_user(&db.pool, worker.id).await.unwrap();
        assert_eq!(mine.len(), 1);
    }
}
