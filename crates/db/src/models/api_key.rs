use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_name: String,
    pub key_value: String,
    pub tag: Option<String>,
    pub notes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Filled in by the AI integration suggestion, if requested.
    pub api_type: Option<String>,
    pub integration_guide: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateApiKey {
    pub key_name: String,
    pub key_value: String,
    pub tag: Option<String>,
    pub notes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateApiKey,
        key_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(
            r#"INSERT INTO api_keys (id, user_id, key_name, key_value, tag, notes, expires_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(key_id)
        .bind(user_id)
        .bind(&data.key_name)
        .bind(&data.key_value)
        .bind(&data.tag)
        .bind(&data.notes)
        .bind(data.expires_at)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update_integration_suggestion(
        pool: &SqlitePool,
        id: Uuid,
        api_type: &str,
        integration_guide: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(
            "UPDATE api_keys SET api_type = $2, integration_guide = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(api_type)
        .bind(integration_guide)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
