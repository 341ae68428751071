use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Todo,
    InProgress,
    Testing,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub project_type: String,
    pub status: ProjectStatus,
    pub link: Option<String>,
    pub test_link: Option<String>,
    pub document_url: Option<String>,
    pub description: Option<String>,
    pub starter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub project_type: String,
    pub status: Option<ProjectStatus>,
    pub link: Option<String>,
    pub test_link: Option<String>,
    pub document_url: Option<String>,
    pub description: Option<String>,
    pub starter_id: Option<Uuid>,
}

/// Admin-curated project template shown when creating a project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ProjectStarter {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_user_id(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = data.status.clone().unwrap_or_default();
        let completed_at = (status == ProjectStatus::Completed).then(Utc::now);
        sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (id, user_id, name, project_type, status, link, test_link, document_url, description, starter_id, created_at, completed_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.project_type)
        .bind(status)
        .bind(&data.link)
        .bind(&data.test_link)
        .bind(&data.document_url)
        .bind(&data.description)
        .bind(data.starter_id)
        .bind(Utc::now())
        .bind(completed_at)
        .fetch_one(pool)
        .await
    }

    /// Entering `Completed` stamps `completed_at` (once); leaving it clears
    /// the stamp.
    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ProjectStatus,
        previous: &Project,
    ) -> Result<Self, sqlx::Error> {
        let completed_at = match status {
            ProjectStatus::Completed => previous.completed_at.or_else(|| Some(Utc::now())),
            _ => None,
        };
        sqlx::query_as::<_, Project>(
            "UPDATE projects SET status = $2, completed_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(completed_at)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl ProjectStarter {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectStarter>(
            "SELECT * FROM project_starters ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        created_by: Uuid,
        title: &str,
        description: &str,
        starter_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectStarter>(
            r#"INSERT INTO project_starters (id, title, description, created_by, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(starter_id)
        .bind(title)
        .bind(description)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    async fn setup() -> (DBService, User) {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                name: "Rae".to_string(),
                email: None,
                pin: "1234".to_string(),
                is_admin: false,
                avatar_url: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (db, user)
    }

    fn draft(name: &str) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            project_type: "web app".to_string(),
            status: None,
            link: None,
            test_link: None,
            document_url: None,
            description: None,
            starter_id: None,
        }
    }

    #[tokio::test]
    async fn completing_sets_stamp_and_reopening_clears_it() {
        let (db, user) = setup().await;
        let project = Project::create(&db.pool, user.id, &draft("site"), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Draft);
        assert!(project.completed_at.is_none());

        let done = Project::update_status(&db.pool, project.id, ProjectStatus::Completed, &project)
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let reopened = Project::update_status(&db.pool, project.id, ProjectStatus::Testing, &done)
            .await
            .unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn completing_twice_keeps_original_stamp() {
        let (db, user) = setup().await;
        let project = Project::create(&db.pool, user.id, &draft("site"), Uuid::new_v4())
            .await
            .unwrap();
        let done = Project::update_status(&db.pool, project.id, ProjectStatus::Completed, &project)
            .await
            .unwrap();
        let again = Project::update_status(&db.pool, project.id, ProjectStatus::Completed, &done)
            .await
            .unwrap();
        assert_eq!(again.completed_at, done.completed_at);
    }
}
