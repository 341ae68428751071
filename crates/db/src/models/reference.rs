use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use ts_rs::TS;
use uuid::Uuid;

/// A saved link with optional notes and tags. `category` is derived from the
/// link host at creation time (Video for youtube/vimeo, Article otherwise).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Reference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub link: String,
    pub title: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReference {
    pub link: String,
    pub title: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

// Tags are stored as a JSON array in a TEXT column, so rows are mapped by
// hand instead of via the FromRow derive.
fn from_row(row: SqliteRow) -> Result<Reference, sqlx::Error> {
    let tags_json: String = row.try_get("tags")?;
    let tags = serde_json::from_str(&tags_json).map_err(|e| sqlx::Error::ColumnDecode {
        index: "tags".to_string(),
        source: Box::new(e),
    })?;
    Ok(Reference {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        link: row.try_get("link")?,
        title: row.try_get("title")?,
        notes: row.try_get("notes")?,
        tags,
        category: row.try_get("category")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Reference {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM reference_links ORDER BY created_at DESC")
            .try_map(from_row)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("SELECT * FROM reference_links WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .try_map(from_row)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateReference,
        reference_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let tags_json = serde_json::to_string(&data.tags).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            r#"INSERT INTO reference_links (id, user_id, link, title, notes, tags, category, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(reference_id)
        .bind(user_id)
        .bind(&data.link)
        .bind(&data.title)
        .bind(&data.notes)
        .bind(tags_json)
        .bind(&data.category)
        .bind(Utc::now())
        .try_map(from_row)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reference_links WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    #[tokio::test]
    async fn tags_round_trip_through_json_column() {
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

        let created = Reference::create(
            &db.pool,
            user.id,
            &CreateReference {
                link: "https://example.com/post".to_string(),
                title: "A post".to_string(),
                notes: None,
                tags: vec!["rust".to_string(), "async".to_string()],
                category: Some("Article".to_string()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let fetched = Reference::find_by_user_id(&db.pool, user.id).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].tags, created.tags);
    }
}
