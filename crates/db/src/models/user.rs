use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// 4-digit credential. Stored in the clear, matching the product's
    /// "shared kiosk" login model.
    pub pin: String,
    /// First two PIN digits, shown as a login hint.
    pub pin_first_two: String,
    pub is_admin: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub name: String,
    pub email: Option<String>,
    pub pin: String,
    pub is_admin: bool,
    pub avatar_url: Option<String>,
}

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_pin(pool: &SqlitePool, pin: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE pin = $1")
            .bind(pin)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_non_admins(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE is_admin = 0 ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    /// The earliest-created admin. Used as the recipient of user replies.
    pub async fn primary_admin(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_admin = 1 ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let pin_first_two: String = data.pin.chars().take(2).collect();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, pin, pin_first_two, is_admin, avatar_url, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.pin)
        .bind(pin_first_two)
        .bind(data.is_admin)
        .bind(&data.avatar_url)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update_pin(pool: &SqlitePool, id: Uuid, pin: &str) -> Result<Self, sqlx::Error> {
        let pin_first_two: String = pin.chars().take(2).collect();
        sqlx::query_as::<_, User>(
            "UPDATE users SET pin = $2, pin_first_two = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(pin)
        .bind(pin_first_two)
        .fetch_one(pool)
        .await
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        avatar_url: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2, avatar_url = COALESCE($3, avatar_url) WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(avatar_url)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn sample_user(pin: &str, is_admin: bool) -> CreateUser {
        CreateUser {
            name: "Dana".to_string(),
            email: Some("dana@example.com".to_string()),
            pin: pin.to_string(),
            is_admin,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn create_then_find_by_pin() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = User::create(&db.pool, &sample_user("4821", false), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(created.pin_first_two, "48");

        let found = User::find_by_pin(&db.pool, "4821").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(User::find_by_pin(&db.pool, "0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_pin_refreshes_hint() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(&db.pool, &sample_user("1111", false), Uuid::new_v4())
            .await
            .unwrap();
        let updated = User::update_pin(&db.pool, user.id, "9732").await.unwrap();
        assert_eq!(updated.pin, "9732");
        assert_eq!(updated.pin_first_two, "97");
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_owned_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(&db.pool, &sample_user("1111", false), Uuid::new_v4())
            .await
            .unwrap();
        crate::models::api_key::ApiKey::create(
            &db.pool,
            user.id,
            &crate::models::api_key::CreateApiKey {
                key_name: "stripe".to_string(),
                key_value: "sk_test_123".to_string(),
                tag: None,
                notes: None,
                expires_at: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert_eq!(User::delete(&db.pool, user.id).await.unwrap(), 1);
        let keys = crate::models::api_key::ApiKey::find_by_user_id(&db.pool, user.id)
            .await
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn primary_admin_is_earliest_created() {
        let db = DBService::new_in_memory().await.unwrap();
        let first = User::create(&db.pool, &sample_user("1000", true), Uuid::new_v4())
            .await
            .unwrap();
        // Second admin created later must not win.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        User::create(&db.pool, &sample_user("2000", true), Uuid::new_v4())
            .await
            .unwrap();

        let admin = User::primary_admin(&db.pool).await.unwrap().unwrap();
        assert_eq!(admin.id, first.id);
    }
}
